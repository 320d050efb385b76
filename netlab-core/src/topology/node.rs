use crate::error::GrammarError;
use crate::topology::NodeId;

/// Longest accepted node or port name, in bytes
///
/// The host side of a port's link is called `<node>-<port>`, which has to fit in the 15
/// bytes Linux allows for interface names.
pub const MAX_NAME_LEN: usize = 7;

/// A network namespace together with everything configured inside it
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) ports: Vec<Port>,
    pub(crate) routes: Vec<Vec<String>>,
    pub(crate) firewall_rules: Vec<Vec<String>>,
    pub(crate) allow_forwarding: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String) -> Self {
        Self {
            id,
            name,
            ports: Vec::new(),
            routes: Vec::new(),
            firewall_rules: Vec::new(),
            allow_forwarding: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Arguments of each `route` statement, in declaration order
    pub fn routes(&self) -> &[Vec<String>] {
        &self.routes
    }

    /// Arguments of each `iptables` statement, in declaration order
    pub fn firewall_rules(&self) -> &[Vec<String>] {
        &self.firewall_rules
    }

    pub fn allow_forwarding(&self) -> bool {
        self.allow_forwarding
    }

    pub fn find_port(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }

    /// Adds a port, rejecting names already used on this node
    pub fn add_port(&mut self, name: String, addresses: Vec<String>) -> Result<usize, GrammarError> {
        if self.find_port(&name).is_some() {
            return Err(GrammarError::PortRedefined(name));
        }

        self.ports.push(Port {
            name,
            addresses,
            owner: self.id,
            connected: false,
        });
        Ok(self.ports.len() - 1)
    }

    pub fn add_route(&mut self, args: Vec<String>) -> usize {
        self.routes.push(args);
        self.routes.len() - 1
    }

    pub fn add_firewall_rule(&mut self, args: Vec<String>) -> usize {
        self.firewall_rules.push(args);
        self.firewall_rules.len() - 1
    }

    pub fn set_allow_forwarding(&mut self) {
        self.allow_forwarding = true;
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) name: String,
    pub(crate) addresses: Vec<String>,
    pub(crate) owner: NodeId,
    pub(crate) connected: bool,
}

impl Port {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// The node this port belongs to
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Whether a cable has been plugged into this port
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
