//! The lab's domain model: nodes owning ports, and cables referencing ports by index

pub mod address;
pub mod bandwidth;
pub mod cable;
pub mod node;

use crate::error::GrammarError;
use crate::topology::bandwidth::Bandwidth;
use crate::topology::cable::{Cable, CableEnd};
use crate::topology::node::{Node, Port};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CableId(usize);

/// Non-owning reference to a port: its node and its position among the node's ports
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub index: usize,
}

/// Every node and cable declared by a configuration
#[derive(Debug, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    cables: Vec<Cable>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.cables.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Declares a new node, rejecting duplicate names
    pub fn add_node(&mut self, name: String) -> Result<NodeId, GrammarError> {
        if self.find_node(&name).is_some() {
            return Err(GrammarError::NodeRedefined(name));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name));
        Ok(id)
    }

    pub fn port(&self, port: PortRef) -> &Port {
        &self.node(port.node).ports[port.index]
    }

    pub fn cables(&self) -> &[Cable] {
        &self.cables
    }

    pub fn cable(&self, id: CableId) -> &Cable {
        &self.cables[id.0]
    }

    pub fn add_cable(&mut self) -> CableId {
        self.cables.push(Cable::default());
        CableId(self.cables.len() - 1)
    }

    /// Plugs the port `port_name` of node `node_name` into `cable`
    ///
    /// On error, neither the cable nor the port are modified.
    pub fn connect(
        &mut self,
        cable: CableId,
        node_name: &str,
        port_name: &str,
        limit: Option<Bandwidth>,
    ) -> Result<(PortRef, CableEnd), GrammarError> {
        let node = self
            .find_node(node_name)
            .ok_or_else(|| GrammarError::UnknownNode(node_name.to_string()))?;
        let index =
            self.node(node)
                .find_port(port_name)
                .ok_or_else(|| GrammarError::UnknownPort {
                    node: node_name.to_string(),
                    port: port_name.to_string(),
                })?;
        let port = PortRef { node, index };

        if self.port(port).connected {
            return Err(GrammarError::PortAlreadyConnected {
                node: node_name.to_string(),
                port: port_name.to_string(),
            });
        }

        let end = self.cables[cable.0]
            .attach(port, limit)
            .ok_or(GrammarError::TooManyCableEnds)?;
        self.nodes[node.0].ports[index].connected = true;

        Ok((port, end))
    }

    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
    }

    pub fn clear_cables(&mut self) {
        self.cables.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_nodes() -> Topology {
        let mut topology = Topology::new();
        for (node, address) in [("A", "10.0.0.1/24"), ("B", "10.0.0.2/24")] {
            let id = topology.add_node(node.to_string()).unwrap();
            topology
                .node_mut(id)
                .add_port("eth0".to_string(), vec![address.to_string()])
                .unwrap();
        }
        topology
    }

    #[test]
    fn test_duplicate_names() {
        let mut topology = two_nodes();
        assert_eq!(
            topology.add_node("A".to_string()).unwrap_err(),
            GrammarError::NodeRedefined("A".to_string())
        );
        assert_eq!(topology.nodes().len(), 2);

        let b = topology.find_node("B").unwrap();
        assert_eq!(
            topology
                .node_mut(b)
                .add_port("eth0".to_string(), Vec::new())
                .unwrap_err(),
            GrammarError::PortRedefined("eth0".to_string())
        );
        assert_eq!(topology.node(b).ports().len(), 1);
    }

    #[test]
    fn test_connect_stores_limit_in_opposite_slot() {
        let mut topology = two_nodes();
        let cable = topology.add_cable();

        let (upper, end) = topology.connect(cable, "A", "eth0", None).unwrap();
        assert_eq!(end, CableEnd::Upper);
        let (lower, end) = topology
            .connect(cable, "B", "eth0", Some("10mbit".parse().unwrap()))
            .unwrap();
        assert_eq!(end, CableEnd::Lower);

        let cable = topology.cable(cable);
        assert_eq!(cable.ends(), Some((upper, lower)));
        assert_eq!(cable.upper_downlink().unwrap().as_str(), "10mbit");
        assert!(cable.lower_downlink().is_none());
        assert!(topology.port(upper).is_connected());
        assert!(topology.port(lower).is_connected());
    }

    #[test]
    fn test_connect_errors_leave_cable_untouched() {
        let mut topology = two_nodes();
        topology
            .node_mut(NodeId(1))
            .add_port("eth1".to_string(), Vec::new())
            .unwrap();

        let cable = topology.add_cable();
        assert_eq!(
            topology.connect(cable, "C", "eth0", None).unwrap_err(),
            GrammarError::UnknownNode("C".to_string())
        );
        assert_eq!(
            topology.connect(cable, "A", "eth9", None).unwrap_err(),
            GrammarError::UnknownPort {
                node: "A".to_string(),
                port: "eth9".to_string()
            }
        );
        assert!(topology.cable(cable).upper().is_none());

        topology.connect(cable, "A", "eth0", None).unwrap();
        topology.connect(cable, "B", "eth0", None).unwrap();
        let before = topology.cable(cable).ends();

        assert_eq!(
            topology.connect(cable, "B", "eth1", None).unwrap_err(),
            GrammarError::TooManyCableEnds
        );
        assert_eq!(topology.cable(cable).ends(), before);

        // The rejected port stays free for another cable
        let b = topology.find_node("B").unwrap();
        let eth1 = topology.node(b).find_port("eth1").unwrap();
        assert!(!topology.node(b).ports()[eth1].is_connected());
    }

    #[test]
    fn test_port_connects_only_once() {
        let mut topology = two_nodes();
        let first = topology.add_cable();
        let second = topology.add_cable();

        topology.connect(first, "A", "eth0", None).unwrap();
        assert_eq!(
            topology.connect(second, "A", "eth0", None).unwrap_err(),
            GrammarError::PortAlreadyConnected {
                node: "A".to_string(),
                port: "eth0".to_string()
            }
        );
        assert!(topology.cable(first).upper().is_some());
        assert!(topology.cable(second).upper().is_none());
    }
}
