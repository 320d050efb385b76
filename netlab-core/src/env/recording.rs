use crate::env::Environment;
use crate::error::EnvError;

/// Records the commands it is asked to run instead of running them
///
/// Each entry is the command line [`super::SystemEnvironment`] would have executed (without
/// `sudo`). Used for dry runs and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingEnvironment {
    commands: Vec<String>,
    fail_on: Vec<String>,
}

impl RecordingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every command starting with `prefix` fail (after being recorded)
    pub fn fail_on(mut self, prefix: impl Into<String>) -> Self {
        self.fail_on.push(prefix.into());
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<String> {
        self.commands
    }

    fn record(&mut self, command: String) -> Result<(), EnvError> {
        let fails = self.fail_on.iter().any(|p| command.starts_with(p.as_str()));
        self.commands.push(command.clone());

        if fails {
            return Err(EnvError::Failed {
                command,
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }

        Ok(())
    }
}

impl Environment for RecordingEnvironment {
    fn create_namespace(&mut self, name: &str) -> Result<(), EnvError> {
        self.record(format!("ip netns add {name}"))
    }

    fn delete_namespace(&mut self, name: &str) -> Result<(), EnvError> {
        self.record(format!("ip netns del {name}"))
    }

    fn run(&mut self, namespace: Option<&str>, command: &str) -> Result<(), EnvError> {
        match namespace {
            Some(ns) => self.record(format!("ip netns exec {ns} {command}")),
            None => self.record(command.to_string()),
        }
    }

    fn run_argv(
        &mut self,
        namespace: &str,
        prefix: &str,
        args: &[String],
    ) -> Result<(), EnvError> {
        let mut line = format!("ip netns exec {namespace} {prefix}");
        for arg in args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("{arg:?}"));
            } else {
                line.push_str(arg);
            }
        }

        self.record(line)
    }
}
