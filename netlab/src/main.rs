mod config;

use crate::config::cli::{CliOpt, Command};
use anyhow::Context;
use clap::Parser;
use netlab_core::Lab;
use netlab_core::env::{Environment, RecordingEnvironment, SystemEnvironment};
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = CliOpt::parse();
    let path = &cli.command.lab().config;

    let mut lab = Lab::with_builtin_drivers();
    lab.load_configuration(path)
        .with_context(|| format!("failed to load lab from `{}`", path.display()))?;

    let result = execute(&cli, &lab);
    lab.cleanup_all();
    result
}

fn execute(cli: &CliOpt, lab: &Lab) -> anyhow::Result<()> {
    match &cli.command {
        Command::Check(_) => {
            let topology = lab.topology();
            println!(
                "{} nodes, {} cables",
                topology.nodes().len(),
                topology.cables().len()
            );
        }
        Command::Graph(_) => {
            let mut stdout = std::io::stdout().lock();
            lab.export_graph(&mut stdout)
                .and_then(|_| stdout.flush())
                .context("failed to write graph")?;
        }
        Command::Start(_) | Command::Stop(_) => {
            let start = matches!(cli.command, Command::Start(_));
            if cli.dry_run {
                let mut env = RecordingEnvironment::new();
                let result = run(lab, start, &mut env);
                for command in env.commands() {
                    println!("{command}");
                }
                result?;
            } else {
                let mut env = SystemEnvironment::new(cli.sudo);
                run(lab, start, &mut env)?;
            }
        }
    }

    Ok(())
}

fn run(lab: &Lab, start: bool, env: &mut dyn Environment) -> anyhow::Result<()> {
    if start {
        lab.start_all(env).context("failed to start lab")?;
    } else {
        lab.stop_all(env);
    }

    Ok(())
}
