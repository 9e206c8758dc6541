//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;

/// Build Ubuntu cloud-image templates and VMs on Proxmox VE
#[derive(Debug, Parser)]
#[command(
    name = "proxbox",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format (status)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log every step, including debug detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Settings file (default: $PROXMOX_CONFIG or ~/.proxbox/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download an Ubuntu cloud image and turn it into a VM template
    CreateTemplate(commands::create_template::CreateTemplateArgs),

    /// Clone a template into a new VM
    CreateVm(commands::create_vm::CreateVmArgs),

    /// Start a VM
    Start(commands::VmIdArg),

    /// Stop a VM
    Stop(commands::stop::StopArgs),

    /// Show VM status
    Status(commands::VmIdArg),

    /// Destroy a VM
    Delete(commands::delete::DeleteArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
            command,
            ..
        } = self;

        if let Command::Version = command {
            commands::version::run(json);
            return Ok(());
        }

        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        });

        match command {
            Command::CreateTemplate(args) => commands::create_template::run(&app, &args).await,
            Command::CreateVm(args) => commands::create_vm::run(&app, &args).await,
            Command::Start(args) => commands::start::run(&app, &args).await,
            Command::Stop(args) => commands::stop::run(&app, &args).await,
            Command::Status(args) => commands::status::run(&app, &args).await,
            Command::Delete(args) => commands::delete::run(&app, &args).await,
            Command::Version => Ok(()),
        }
    }
}
