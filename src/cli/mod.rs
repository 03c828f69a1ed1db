pub mod api_client;
pub mod commands;
pub mod config;
pub mod csv;
pub mod notifications;
pub mod observers;
pub mod render;
pub mod store;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "invoicer")]
#[command(about = "Invoicer CLI - clients, invoices and notifications from the terminal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Log in and remember the session")]
    Login {
        #[arg(help = "Account email")]
        email: String,
        #[arg(long, env = "INVOICER_PASSWORD", hide_env_values = true, help = "Account password")]
        password: String,
        #[arg(long, help = "API base URL (defaults to the saved one)")]
        server: Option<String>,
    },

    #[command(about = "Forget the saved session")]
    Logout,

    #[command(about = "Show the logged-in user")]
    Whoami,

    #[command(about = "Create the system admin and sample tenant in the configured database")]
    Seed,

    #[command(about = "Client management")]
    Clients {
        #[command(subcommand)]
        cmd: commands::clients::ClientCommands,
    },

    #[command(about = "Invoice management")]
    Invoices {
        #[command(subcommand)]
        cmd: commands::invoices::InvoiceCommands,
    },

    #[command(about = "Local notification log")]
    Notifications {
        #[command(subcommand)]
        cmd: commands::notifications::NotificationCommands,
    },
}

/// `--json` switches every command to machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };

    match cli.command {
        Commands::Login { email, password, server } => {
            commands::auth::login(email, password, server, output_format).await
        }
        Commands::Logout => commands::auth::logout(output_format).await,
        Commands::Whoami => commands::auth::whoami(output_format).await,
        Commands::Seed => commands::seed::handle(output_format).await,
        Commands::Clients { cmd } => commands::clients::handle(cmd, output_format).await,
        Commands::Invoices { cmd } => commands::invoices::handle(cmd, output_format).await,
        Commands::Notifications { cmd } => commands::notifications::handle(cmd, output_format).await,
    }
}
