//! The `node` block: network namespaces, their ports, routes and firewall rules
//!
//! ```text
//! node A {
//!     port eth0 10.0.0.1/24
//!     route default via 10.0.0.254
//!     iptables -A FORWARD -j ACCEPT
//!     allowforward
//! }
//! ```

use crate::config::grammar::{ArgCount, BuildContext, Handle, Rule, check_address, check_name};
use crate::driver::{Driver, PRIORITY_NODE};
use crate::env::Environment;
use crate::error::{ConfigError, EnvError, GrammarError};
use crate::topology::node::{MAX_NAME_LEN, Node};
use crate::topology::{PortRef, Topology};
use std::io;
use tracing::{debug, warn};

static NODE_CHILDREN: &[Rule] = &[
    Rule {
        keyword: "port",
        args: ArgCount::AtLeast(1),
        validate: Some(check_port_arg),
        children: &[],
        build: build_port,
    },
    Rule {
        keyword: "route",
        args: ArgCount::AtLeast(1),
        validate: None,
        children: &[],
        build: build_route,
    },
    Rule {
        keyword: "allowforward",
        args: ArgCount::Exact(0),
        validate: None,
        children: &[],
        build: build_allow_forward,
    },
    Rule {
        keyword: "iptables",
        args: ArgCount::AtLeast(1),
        validate: None,
        children: &[],
        build: build_firewall_rule,
    },
];

pub static NODE_RULE: Rule = Rule {
    keyword: "node",
    args: ArgCount::Exact(1),
    validate: Some(check_name),
    children: NODE_CHILDREN,
    build: build_node,
};

/// The first argument of a port is its name, the others its addresses
fn check_port_arg(index: usize, value: &str) -> Result<(), GrammarError> {
    if index == 1 {
        check_name(index, value)
    } else {
        check_address(index, value)
    }
}

fn build_node(ctx: &mut BuildContext<'_>, parent: Option<Handle>) -> Result<Handle, ConfigError> {
    ctx.expect_top_level(parent)?;
    let name = ctx.argument(MAX_NAME_LEN)?;
    let node = ctx.topology.add_node(name).map_err(|e| ctx.error(e))?;
    Ok(Handle::Node(node))
}

fn build_port(ctx: &mut BuildContext<'_>, parent: Option<Handle>) -> Result<Handle, ConfigError> {
    let node = ctx.expect_node(parent)?;
    let name = ctx.argument(MAX_NAME_LEN)?;
    let addresses = ctx.remaining_arguments()?;
    let index = ctx
        .topology
        .node_mut(node)
        .add_port(name, addresses)
        .map_err(|e| ctx.error(e))?;
    Ok(Handle::Port(PortRef { node, index }))
}

fn build_route(ctx: &mut BuildContext<'_>, parent: Option<Handle>) -> Result<Handle, ConfigError> {
    let node = ctx.expect_node(parent)?;
    let args = ctx.remaining_arguments()?;
    let index = ctx.topology.node_mut(node).add_route(args);
    Ok(Handle::Route { node, index })
}

fn build_firewall_rule(
    ctx: &mut BuildContext<'_>,
    parent: Option<Handle>,
) -> Result<Handle, ConfigError> {
    let node = ctx.expect_node(parent)?;
    let args = ctx.remaining_arguments()?;
    let index = ctx.topology.node_mut(node).add_firewall_rule(args);
    Ok(Handle::FirewallRule { node, index })
}

fn build_allow_forward(
    ctx: &mut BuildContext<'_>,
    parent: Option<Handle>,
) -> Result<Handle, ConfigError> {
    let node = ctx.expect_node(parent)?;
    ctx.topology.node_mut(node).set_allow_forwarding();
    Ok(Handle::Node(node))
}

/// Creates one namespace per node and a veth pair per port
///
/// The pair's host side is called `<node>-<port>` and stays in the host namespace until a cable
/// claims it. The other side is moved into the node and renamed to the port's name.
pub struct NodeDriver;

impl NodeDriver {
    fn start_node(&self, node: &Node, env: &mut dyn Environment) -> Result<(), EnvError> {
        let ns = node.name();

        for port in node.ports() {
            let (port, addresses) = (port.name(), port.addresses());
            env.run(None, &format!("ip link add {ns}-{port} type veth peer name node-{port}"))?;
            env.run(None, &format!("ip link set node-{port} netns {ns}"))?;
            env.run(None, &format!("ip link set dev {ns}-{port} up"))?;
            env.run(Some(ns), &format!("ip link set node-{port} name {port}"))?;
            env.run(Some(ns), &format!("ip link set dev {port} up"))?;
            for address in addresses {
                env.run(Some(ns), &format!("ip addr add {address} dev {port}"))?;
            }
        }

        if node.allow_forwarding() {
            env.run(Some(ns), "sysctl -w net.ipv4.ip_forward=1")?;
        }

        for route in node.routes() {
            env.run_argv(ns, "ip route add", route)?;
        }

        for rule in node.firewall_rules() {
            env.run_argv(ns, "iptables", rule)?;
        }

        debug!(
            node = ns,
            ports = node.ports().len(),
            routes = node.routes().len(),
            firewall_rules = node.firewall_rules().len(),
            "node started"
        );
        Ok(())
    }
}

impl Driver for NodeDriver {
    fn name(&self) -> &'static str {
        "node"
    }

    fn priority(&self) -> u32 {
        PRIORITY_NODE
    }

    fn rule(&self) -> &'static Rule {
        &NODE_RULE
    }

    fn start(&self, topology: &Topology, env: &mut dyn Environment) -> Result<(), EnvError> {
        for node in topology.nodes() {
            env.create_namespace(node.name())?;
        }

        for node in topology.nodes() {
            self.start_node(node, env)?;
        }

        Ok(())
    }

    fn stop(&self, topology: &Topology, env: &mut dyn Environment) {
        for node in topology.nodes() {
            for port in node.ports() {
                let link = format!("{}-{}", node.name(), port.name());
                if let Err(e) = env.run(None, &format!("ip link del {link}")) {
                    // Cables consume the host side of their lower port
                    debug!(link, error = %e, "could not delete host link");
                }
            }

            if let Err(e) = env.delete_namespace(node.name()) {
                warn!(ns = node.name(), error = %e, "could not delete namespace");
            }
        }
    }

    fn export_graph(&self, topology: &Topology, out: &mut dyn io::Write) -> io::Result<()> {
        for node in topology.nodes() {
            writeln!(out, "{} [shape = circle];", node.name())?;
        }
        Ok(())
    }

    fn cleanup(&self, topology: &mut Topology) {
        topology.clear_nodes();
    }
}
