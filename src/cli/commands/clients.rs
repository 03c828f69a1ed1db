use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use super::{open_store, session_client};
use crate::cli::api_client::{ClientRequest, RemoteApi};
use crate::cli::csv::parse_csv_clients;
use crate::cli::store::{ClientStore, SyncState};
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ClientCommands {
    #[command(about = "List clients, newest first")]
    List {
        #[arg(long, help = "Only clients whose name, email or company contains this text")]
        search: Option<String>,
    },

    #[command(about = "Add a client")]
    Add {
        #[arg(help = "Client name")]
        name: String,
        #[arg(help = "Client email")]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        company: Option<String>,
    },

    #[command(about = "Import clients from CSV (name,email,phone,address)")]
    Import {
        #[arg(help = "CSV file, or - for stdin")]
        file: PathBuf,
    },

    #[command(about = "Delete a client")]
    Delete {
        #[arg(help = "Client ID (or its first characters)")]
        id: String,
    },
}

pub async fn handle(cmd: ClientCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ClientCommands::List { search } => {
            let store = open_store().await?;
            let needle = search.map(|s| s.to_lowercase());
            let rows: Vec<_> = store
                .clients()
                .iter()
                .filter(|t| match &needle {
                    Some(needle) => [Some(&t.record.name), Some(&t.record.email), t.record.company.as_ref()]
                        .into_iter()
                        .flatten()
                        .any(|field| field.to_lowercase().contains(needle.as_str())),
                    None => true,
                })
                .collect();

            if rows.is_empty() {
                return output_empty_collection(&output_format, "clients", "No clients found");
            }

            match output_format {
                OutputFormat::Json => print_json(&json!({ "clients": rows }))?,
                OutputFormat::Text => {
                    println!(" {:<9} {:<24} {:<30} {}", "ID", "NAME", "EMAIL", "COMPANY");
                    println!("{}", "-".repeat(80));
                    for row in rows {
                        let client = &row.record;
                        println!(
                            "{}{:<9} {:<24} {:<30} {}",
                            sync_marker(row.state),
                            short_id(&client.id),
                            client.name,
                            client.email,
                            client.company.as_deref().unwrap_or("")
                        );
                    }
                }
            }
            Ok(())
        }
        ClientCommands::Add { name, email, phone, address, company } => {
            let mut store = open_store().await?;
            let added = store
                .add_client(ClientRequest { name, email, phone, address, company })
                .await?;

            match added.state {
                SyncState::Failed => output_sync_failure(
                    &output_format,
                    &format!("Client '{}' saved locally but not on the server", added.record.name),
                    added.error.as_deref(),
                ),
                _ => output_success(
                    &output_format,
                    &format!("Client '{}' added", added.record.name),
                    Some(json!({ "client": added.record })),
                ),
            }
        }
        ClientCommands::Import { file } => {
            let text = read_input(&file)?;
            let rows = parse_csv_clients(&text);
            if rows.is_empty() {
                anyhow::bail!("Nothing to import: no rows with both a name and an email");
            }

            let (session, client) = session_client()?;
            if !session.is_logged_in() {
                anyhow::bail!("Login to import clients");
            }
            let count = client.bulk_create_clients(&rows).await.context("Import failed")?;
            output_success(
                &output_format,
                &format!("Imported {} client(s)", count),
                Some(json!({ "count": count })),
            )
        }
        ClientCommands::Delete { id } => {
            let mut store = open_store().await?;
            let id = resolve_client(&store, &id)?;
            match store.delete_client(id).await? {
                SyncState::Failed => output_sync_failure(
                    &output_format,
                    "Client removed locally but the server refused the deletion",
                    store.notifications().entries().first().map(|n| n.message.as_str()),
                ),
                _ => output_success(&output_format, "Client deleted", Some(json!({ "id": id }))),
            }
        }
    }
}

fn read_input(file: &Path) -> anyhow::Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

/// A full UUID, or a unique prefix of one shown by `clients list`.
fn resolve_client(store: &ClientStore, key: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }

    let key = key.to_lowercase();
    let mut matches = store
        .clients()
        .iter()
        .map(|t| t.record.id)
        .filter(|id| id.simple().to_string().starts_with(&key));

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => anyhow::bail!("Client id '{}' is ambiguous", key),
        (None, _) => anyhow::bail!("Client '{}' not found", key),
    }
}
