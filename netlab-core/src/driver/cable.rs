//! The `cable` block: a link between two node ports, optionally rate limited
//!
//! ```text
//! cable {
//!     port A eth0
//!     port B eth0 10mbit
//! }
//! ```
//!
//! Starting a cable throws away the host side of the lower port's veth pair and moves the host
//! side of the upper port into the lower node in its place, so the two namespaces end up
//! connected by a single pair.

use crate::config::grammar::{ArgCount, BuildContext, Handle, Rule, check_name};
use crate::driver::{Driver, PRIORITY_CONNECTION};
use crate::env::Environment;
use crate::error::{ConfigError, EnvError, GrammarError};
use crate::topology::bandwidth::{Bandwidth, MAX_BANDWIDTH_LEN};
use crate::topology::cable::Cable;
use crate::topology::node::MAX_NAME_LEN;
use crate::topology::{PortRef, Topology};
use std::io;
use tracing::{debug, warn};

static CABLE_CHILDREN: &[Rule] = &[Rule {
    keyword: "port",
    args: ArgCount::AtLeast(2),
    validate: Some(check_cable_port),
    children: &[],
    build: build_cable_port,
}];

pub static CABLE_RULE: Rule = Rule {
    keyword: "cable",
    args: ArgCount::Exact(0),
    validate: None,
    children: CABLE_CHILDREN,
    build: build_cable,
};

/// `port <node> <port> [bandwidth]`
fn check_cable_port(index: usize, value: &str) -> Result<(), GrammarError> {
    match index {
        1 | 2 => check_name(index, value),
        3 => value.parse::<Bandwidth>().map(|_| ()),
        _ => Err(GrammarError::TooManyArguments),
    }
}

fn build_cable(ctx: &mut BuildContext<'_>, parent: Option<Handle>) -> Result<Handle, ConfigError> {
    ctx.expect_top_level(parent)?;
    Ok(Handle::Cable(ctx.topology.add_cable()))
}

fn build_cable_port(
    ctx: &mut BuildContext<'_>,
    parent: Option<Handle>,
) -> Result<Handle, ConfigError> {
    let cable = ctx.expect_cable(parent)?;
    let node = ctx.argument(MAX_NAME_LEN)?;
    let port = ctx.argument(MAX_NAME_LEN)?;
    let limit = match ctx.optional_argument(MAX_BANDWIDTH_LEN)? {
        Some(limit) => Some(limit.parse::<Bandwidth>().map_err(|e| ctx.error(e))?),
        None => None,
    };

    let (port, end) = ctx
        .topology
        .connect(cable, &node, &port, limit)
        .map_err(|e| ctx.error(e))?;
    debug!(line = ctx.line, ?end, "plugged port into cable");

    Ok(Handle::CableEnd { cable, port })
}

/// Wires cables between the veth pairs created by the node driver
pub struct CableDriver;

impl CableDriver {
    fn start_cable(
        &self,
        topology: &Topology,
        upper: PortRef,
        lower: PortRef,
        cable: &Cable,
        env: &mut dyn Environment,
    ) -> Result<(), EnvError> {
        let upper_node = topology.node(upper.node).name();
        let upper_port = topology.port(upper);
        let lower_node = topology.node(lower.node).name();
        let lower_port = topology.port(lower);
        let (upper_dev, lower_dev) = (upper_port.name(), lower_port.name());

        // Remove the lower port's own link, its name gets reused below
        let teardown = [
            (Some(lower_node), format!("ip link set dev {lower_dev} down")),
            (None, format!("ip link set dev {lower_node}-{lower_dev} down")),
            (None, format!("ip link del {lower_node}-{lower_dev}")),
        ];
        for (ns, command) in teardown {
            if let Err(e) = env.run(ns, &command) {
                warn!(command, error = %e, "could not tear down lower port");
            }
        }

        env.run(
            None,
            &format!("ip link set {upper_node}-{upper_dev} netns {lower_node}"),
        )?;
        env.run(
            Some(lower_node),
            &format!("ip link set {upper_node}-{upper_dev} name {lower_dev}"),
        )?;
        env.run(Some(lower_node), &format!("ip link set dev {lower_dev} up"))?;

        if let Some(limit) = cable.upper_downlink() {
            env.run(
                Some(lower_node),
                &format!("tc qdisc add dev {lower_dev} root netem rate {limit}"),
            )?;
        }

        if let Some(limit) = cable.lower_downlink() {
            env.run(
                Some(upper_node),
                &format!("tc qdisc add dev {upper_dev} root netem rate {limit}"),
            )?;
        }

        for address in lower_port.addresses() {
            env.run(
                Some(lower_node),
                &format!("ip addr add {address} dev {lower_dev}"),
            )?;
        }

        debug!(
            upper = %format!("{upper_node}:{upper_dev}"),
            lower = %format!("{lower_node}:{lower_dev}"),
            upper_downlink_bps = cable.upper_downlink().and_then(|b| b.bits_per_second()),
            lower_downlink_bps = cable.lower_downlink().and_then(|b| b.bits_per_second()),
            "cable wired"
        );
        Ok(())
    }
}

impl Driver for CableDriver {
    fn name(&self) -> &'static str {
        "cable"
    }

    fn priority(&self) -> u32 {
        PRIORITY_CONNECTION
    }

    fn rule(&self) -> &'static Rule {
        &CABLE_RULE
    }

    fn start(&self, topology: &Topology, env: &mut dyn Environment) -> Result<(), EnvError> {
        for cable in topology.cables() {
            let Some((upper, lower)) = cable.ends() else {
                debug!(upper = ?cable.upper(), "skipping cable with a single end");
                continue;
            };

            self.start_cable(topology, upper, lower, cable, env)?;
        }

        Ok(())
    }

    fn export_graph(&self, topology: &Topology, out: &mut dyn io::Write) -> io::Result<()> {
        for cable in topology.cables() {
            let Some((upper, lower)) = cable.ends() else {
                continue;
            };
            let (upper_port, lower_port) = (topology.port(upper), topology.port(lower));

            write!(
                out,
                "{} -- {} [taillabel=\"{}",
                topology.node(lower.node).name(),
                topology.node(upper.node).name(),
                lower_port.name()
            )?;
            for address in lower_port.addresses() {
                write!(out, "\\n{address}")?;
            }

            write!(out, "\", headlabel=\"{}", upper_port.name())?;
            for address in upper_port.addresses() {
                write!(out, "\\n{address}")?;
            }

            writeln!(out, "\"];")?;
        }

        Ok(())
    }

    fn cleanup(&self, topology: &mut Topology) {
        topology.clear_cables();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;
    use crate::driver::node::NODE_RULE;
    use crate::env::RecordingEnvironment;

    const NODES: &str = "node A { port eth0 10.0.0.1/24 }\nnode B { port eth0 10.0.0.2/24 }\n";

    fn load(src: &str) -> Result<Topology, ConfigError> {
        let mut topology = Topology::new();
        parse(src, &[&NODE_RULE, &CABLE_RULE], &mut topology)?;
        Ok(topology)
    }

    #[test]
    fn test_check_cable_port() {
        assert!(check_cable_port(1, "A").is_ok());
        assert!(check_cable_port(2, "eth0").is_ok());
        assert!(check_cable_port(3, "100KiBps").is_ok());
        assert_eq!(
            check_cable_port(3, "fast"),
            Err(GrammarError::BandwidthNotInteger)
        );
        assert_eq!(
            check_cable_port(4, "10mbit"),
            Err(GrammarError::TooManyArguments)
        );
    }

    #[test]
    fn test_cable_errors() {
        let cases = [
            ("cable {\n port \"A B\" eth0\n}", "3: invalid name 'A B'"),
            ("cable {\n port A \"\"\n}", "3: invalid name ''"),
            (
                "cable {\n port A eth0\n port C eth0\n}",
                "4: node 'C' does not exist",
            ),
            (
                "cable {\n port A eth1\n}",
                "3: node 'A' has no port named 'eth1'",
            ),
            (
                "cable {\n port A eth0 10mbit 20mbit\n}",
                "3: too many arguments",
            ),
            ("cable {\n port A\n}", "3: too few arguments"),
            ("cable X {\n port A eth0\n}", "3: too many arguments"),
            (
                "cable {\n port A eth0 10zbit\n}",
                "3: unknown suffix 'zbit'",
            ),
            (
                "cable {\n port A eth0 1000000000000000000000000000000bit\n}",
                "3: bandwidth argument too big",
            ),
        ];

        for (cable, expected) in cases {
            let src = format!("{NODES}{cable}");
            let err = load(&src).unwrap_err();
            assert_eq!(err.to_string(), expected, "{cable:?}");
        }
    }

    #[test]
    fn test_third_end_keeps_first_two() {
        let src = format!(
            "{NODES}node C {{ port eth0 }}\ncable {{\n port A eth0\n port B eth0\n port C eth0\n}}"
        );
        let mut topology = Topology::new();
        let err = parse(&src, &[&NODE_RULE, &CABLE_RULE], &mut topology).unwrap_err();
        assert_eq!(err.to_string(), "7: cable cannot have more than two ends");

        let (upper, lower) = topology.cables()[0].ends().unwrap();
        assert_eq!(topology.node(upper.node).name(), "A");
        assert_eq!(topology.node(lower.node).name(), "B");

        let c = topology.find_node("C").unwrap();
        assert!(!topology.node(c).ports()[0].is_connected());
    }

    #[test]
    fn test_port_already_connected() {
        let src = format!(
            "{NODES}node C {{ port eth0 }}\ncable {{ port A eth0; port B eth0 }}\ncable {{ port A eth0; port C eth0 }}"
        );
        let mut topology = Topology::new();
        let err = parse(&src, &[&NODE_RULE, &CABLE_RULE], &mut topology).unwrap_err();
        assert_eq!(
            err.to_string(),
            "5: port 'eth0' on node 'A' is already connected"
        );

        let (upper, lower) = topology.cables()[0].ends().unwrap();
        assert_eq!(topology.node(upper.node).name(), "A");
        assert_eq!(topology.node(lower.node).name(), "B");
        assert!(topology.cables()[1].upper().is_none());
    }

    #[test]
    fn test_start_commands() {
        let topology = load(&format!(
            "{NODES}cable {{\n port A eth0 1mbit\n port B eth0 10mbit\n}}"
        ))
        .unwrap();

        let mut env = RecordingEnvironment::new();
        CableDriver.start(&topology, &mut env).unwrap();

        assert_eq!(
            env.commands(),
            [
                "ip netns exec B ip link set dev eth0 down",
                "ip link set dev B-eth0 down",
                "ip link del B-eth0",
                "ip link set A-eth0 netns B",
                "ip netns exec B ip link set A-eth0 name eth0",
                "ip netns exec B ip link set dev eth0 up",
                "ip netns exec B tc qdisc add dev eth0 root netem rate 10mbit",
                "ip netns exec A tc qdisc add dev eth0 root netem rate 1mbit",
                "ip netns exec B ip addr add 10.0.0.2/24 dev eth0",
            ]
        );
    }

    #[test]
    fn test_teardown_failures_are_tolerated() {
        let topology = load(&format!("{NODES}cable {{ port A eth0; port B eth0 }}")).unwrap();

        let mut env = RecordingEnvironment::new().fail_on("ip link del");
        CableDriver.start(&topology, &mut env).unwrap();
        assert_eq!(env.commands().len(), 7);

        let mut env = RecordingEnvironment::new().fail_on("ip link set A-eth0 netns B");
        assert!(CableDriver.start(&topology, &mut env).is_err());
        assert_eq!(env.commands().last().unwrap(), "ip link set A-eth0 netns B");
    }

    #[test]
    fn test_single_ended_cable_is_inert() {
        let topology = load(&format!("{NODES}cable {{ port A eth0 }}")).unwrap();

        let mut env = RecordingEnvironment::new();
        CableDriver.start(&topology, &mut env).unwrap();
        assert!(env.commands().is_empty());

        let mut out = Vec::new();
        CableDriver.export_graph(&topology, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_graph_labels() {
        let topology = load(
            "node A { port eth0 10.0.0.1/24 fd00::1/64 }\nnode B { port eth1 10.0.0.2/24 }\ncable { port A eth0; port B eth1 }",
        )
        .unwrap();

        let mut out = Vec::new();
        CableDriver.export_graph(&topology, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "B -- A [taillabel=\"eth1\\n10.0.0.2/24\", headlabel=\"eth0\\n10.0.0.1/24\\nfd00::1/64\"];\n"
        );
    }
}
