use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Builds virtual network labs out of network namespaces")]
pub struct CliOpt {
    /// Print the commands that would be executed instead of executing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Run every command through `sudo`
    #[arg(long, global = true)]
    pub sudo: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate a lab configuration without touching the system
    Check(LabOpt),
    /// Create the namespaces and links described by a lab configuration
    Start(LabOpt),
    /// Tear down a lab previously created with `start`
    Stop(LabOpt),
    /// Print the lab as a Graphviz graph
    Graph(LabOpt),
}

#[derive(Parser, Debug, Clone)]
pub struct LabOpt {
    /// Path to the lab configuration file
    pub config: PathBuf,
}

impl Command {
    pub fn lab(&self) -> &LabOpt {
        match self {
            Command::Check(opt) | Command::Start(opt) | Command::Stop(opt) | Command::Graph(opt) => {
                opt
            }
        }
    }
}
