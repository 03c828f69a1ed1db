use clap::Subcommand;
use serde_json::json;

use crate::cli::config::get_config_dir;
use crate::cli::notifications::NotificationLog;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum NotificationCommands {
    #[command(about = "List notifications, newest first")]
    List {
        #[arg(long, help = "Only unread notifications")]
        unread: bool,
    },

    #[command(about = "Mark one notification as read")]
    Read {
        #[arg(help = "Notification ID")]
        id: String,
    },

    #[command(about = "Mark every notification as read")]
    ReadAll,

    #[command(about = "Delete a notification")]
    Delete {
        #[arg(help = "Notification ID")]
        id: String,
    },
}

pub async fn handle(cmd: NotificationCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut log = NotificationLog::open(get_config_dir()?)?;

    match cmd {
        NotificationCommands::List { unread } => {
            let rows: Vec<_> = log.entries().iter().filter(|n| !unread || !n.read).collect();
            if rows.is_empty() {
                return output_empty_collection(&output_format, "notifications", "No notifications");
            }

            match output_format {
                OutputFormat::Json => print_json(&json!({
                    "notifications": rows,
                    "unread": log.unread_count()
                })),
                OutputFormat::Text => {
                    for n in rows {
                        let marker = if n.read { " " } else { "*" };
                        println!(
                            "{} {}  {}  {}",
                            marker,
                            n.timestamp.format("%Y-%m-%d %H:%M"),
                            n.id,
                            n.title
                        );
                        println!("    {}", n.message);
                    }
                    println!("{} unread", log.unread_count());
                    Ok(())
                }
            }
        }
        NotificationCommands::Read { id } => {
            if !log.mark_read(&id)? {
                anyhow::bail!("Notification '{}' not found", id);
            }
            output_success(&output_format, "Marked as read", Some(json!({ "id": id })))
        }
        NotificationCommands::ReadAll => {
            log.mark_all_read()?;
            output_success(&output_format, "All notifications marked as read", None)
        }
        NotificationCommands::Delete { id } => {
            if !log.delete(&id)? {
                anyhow::bail!("Notification '{}' not found", id);
            }
            output_success(&output_format, "Notification deleted", Some(json!({ "id": id })))
        }
    }
}
