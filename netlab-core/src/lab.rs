use crate::config;
use crate::driver::DriverRegistry;
use crate::env::Environment;
use crate::error::{ConfigError, LabError};
use crate::topology::Topology;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// A lab: the registered drivers together with the topology they manage
pub struct Lab {
    drivers: DriverRegistry,
    topology: Topology,
}

impl Lab {
    pub fn new(drivers: DriverRegistry) -> Self {
        Self {
            drivers,
            topology: Topology::new(),
        }
    }

    pub fn with_builtin_drivers() -> Self {
        Self::new(DriverRegistry::with_builtin())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    /// Reads and parses the configuration file at `path`
    pub fn load_configuration(&mut self, path: &Path) -> Result<(), ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), bytes = src.len(), "read configuration");
        self.load_str(&src)
    }

    /// Parses `src` into the lab's topology
    ///
    /// If the configuration turns out to be invalid, the lab is left empty.
    pub fn load_str(&mut self, src: &str) -> Result<(), ConfigError> {
        let grammar = self.drivers.grammar();
        if let Err(e) = config::parse(src, &grammar, &mut self.topology) {
            warn!(error = %e, "failed to load configuration");
            self.cleanup_all();
            return Err(e);
        }

        info!(
            nodes = self.topology.nodes().len(),
            cables = self.topology.cables().len(),
            "configuration loaded"
        );
        Ok(())
    }

    /// Starts every driver in priority order, stopping at the first failure
    ///
    /// Nothing is rolled back on failure, use [`Lab::stop_all`] for that.
    pub fn start_all(&self, env: &mut dyn Environment) -> Result<(), LabError> {
        for driver in self.drivers.by_priority() {
            info!(driver = driver.name(), "starting");
            driver
                .start(&self.topology, env)
                .map_err(|source| LabError::Start {
                    driver: driver.name(),
                    source,
                })?;
        }

        Ok(())
    }

    /// Stops every driver, ignoring (but logging) failures
    pub fn stop_all(&self, env: &mut dyn Environment) {
        for driver in self.drivers.iter() {
            info!(driver = driver.name(), "stopping");
            driver.stop(&self.topology, env);
        }
    }

    /// Writes the lab as an undirected DOT graph
    pub fn export_graph(&self, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(out, "graph lab {{")?;
        for driver in self.drivers.iter() {
            driver.export_graph(&self.topology, out)?;
        }
        writeln!(out, "}}")
    }

    /// Drops everything the drivers hold, leaving an empty topology
    pub fn cleanup_all(&mut self) {
        for driver in self.drivers.iter() {
            debug!(driver = driver.name(), "cleaning up");
            driver.cleanup(&mut self.topology);
        }
    }
}
