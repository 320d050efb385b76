//! Pluggable components owning a slice of the topology
//!
//! Each driver contributes the grammar rule for its configuration block and takes part in the
//! lab's lifecycle. Drivers are started in ascending [`Driver::priority`] order, so that e.g.
//! every namespace exists before cables are moved between them.

pub mod cable;
pub mod node;

use crate::config::grammar::Rule;
use crate::env::Environment;
use crate::error::EnvError;
use crate::topology::Topology;
use std::io;

pub const PRIORITY_NODE: u32 = 10;
pub const PRIORITY_CONNECTION: u32 = 20;

pub trait Driver {
    /// A short name used in logs and errors
    fn name(&self) -> &'static str;

    fn priority(&self) -> u32;

    /// The top-level block this driver parses
    fn rule(&self) -> &'static Rule;

    /// Realizes the driver's part of `topology`
    fn start(&self, topology: &Topology, env: &mut dyn Environment) -> Result<(), EnvError> {
        let _ = (topology, env);
        Ok(())
    }

    /// Tears down what [`Driver::start`] created
    ///
    /// Must tolerate a lab that was only partially started, so failures are logged rather than
    /// returned.
    fn stop(&self, topology: &Topology, env: &mut dyn Environment) {
        let _ = (topology, env);
    }

    /// Writes the driver's part of the lab as DOT statements
    fn export_graph(&self, topology: &Topology, out: &mut dyn io::Write) -> io::Result<()> {
        let _ = (topology, out);
        Ok(())
    }

    /// Forgets the driver's objects, leaving its part of `topology` empty
    fn cleanup(&self, topology: &mut Topology) {
        let _ = topology;
    }
}

/// The drivers known to a lab, in registration order
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Box<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the node and cable drivers
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(node::NodeDriver));
        registry.register(Box::new(cable::CableDriver));
        registry
    }

    pub fn register(&mut self, driver: Box<dyn Driver>) {
        tracing::debug!(
            driver = driver.name(),
            priority = driver.priority(),
            "registered driver"
        );
        self.drivers.push(driver);
    }

    /// Drivers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Driver> {
        self.drivers.iter().map(|d| d.as_ref())
    }

    /// Drivers in ascending priority order, ties kept in registration order
    pub fn by_priority(&self) -> Vec<&dyn Driver> {
        let mut drivers: Vec<&dyn Driver> = self.iter().collect();
        drivers.sort_by_key(|d| d.priority());
        drivers
    }

    /// The top-level rules of every registered driver
    pub fn grammar(&self) -> Vec<&'static Rule> {
        self.drivers.iter().map(|d| d.rule()).collect()
    }
}
