//! Executors for the commands drivers issue while realizing a lab

mod recording;
mod system;

pub use recording::RecordingEnvironment;
pub use system::SystemEnvironment;

use crate::error::EnvError;

/// Creates namespaces and runs commands on behalf of the drivers
///
/// Every method fails if the underlying operation does not succeed. Command lines passed to
/// [`Environment::run`] are split on whitespace; arguments that may contain whitespace go
/// through [`Environment::run_argv`] instead.
pub trait Environment {
    fn create_namespace(&mut self, name: &str) -> Result<(), EnvError>;

    fn delete_namespace(&mut self, name: &str) -> Result<(), EnvError>;

    /// Runs `command` inside `namespace`, or in the host namespace if `None`
    fn run(&mut self, namespace: Option<&str>, command: &str) -> Result<(), EnvError>;

    /// Runs `prefix` followed by the verbatim `args` inside `namespace`
    fn run_argv(&mut self, namespace: &str, prefix: &str, args: &[String]) -> Result<(), EnvError>;
}
