use crate::env::Environment;
use crate::error::EnvError;
use std::process::Command;
use tracing::debug;

/// Runs everything through `ip netns` on the local host
#[derive(Debug, Default, Clone)]
pub struct SystemEnvironment {
    use_sudo: bool,
}

impl SystemEnvironment {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }

    fn exec(&self, mut args: Vec<&str>) -> Result<(), EnvError> {
        if self.use_sudo {
            args.insert(0, "sudo");
        }

        let command = args.join(" ");
        let Some((program, rest)) = args.split_first() else {
            return Ok(());
        };

        debug!(command, "running");
        let output = Command::new(program)
            .args(rest)
            .output()
            .map_err(|source| EnvError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EnvError::Failed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Environment for SystemEnvironment {
    fn create_namespace(&mut self, name: &str) -> Result<(), EnvError> {
        self.exec(vec!["ip", "netns", "add", name])?;
        debug!(ns = name, "created network namespace");
        Ok(())
    }

    fn delete_namespace(&mut self, name: &str) -> Result<(), EnvError> {
        self.exec(vec!["ip", "netns", "del", name])?;
        debug!(ns = name, "deleted network namespace");
        Ok(())
    }

    fn run(&mut self, namespace: Option<&str>, command: &str) -> Result<(), EnvError> {
        let mut args = match namespace {
            Some(ns) => vec!["ip", "netns", "exec", ns],
            None => Vec::new(),
        };
        args.extend(command.split_whitespace());
        self.exec(args)
    }

    fn run_argv(
        &mut self,
        namespace: &str,
        prefix: &str,
        args: &[String],
    ) -> Result<(), EnvError> {
        let mut full_args = vec!["ip", "netns", "exec", namespace];
        full_args.extend(prefix.split_whitespace());
        full_args.extend(args.iter().map(String::as_str));
        self.exec(full_args)
    }
}
