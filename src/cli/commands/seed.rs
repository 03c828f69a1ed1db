use anyhow::Context;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{seed::seed, PgStore};

/// Seed the database named by `DATABASE_URL` using the `SYSTEM_ADMIN_*` and
/// `SAMPLE_*` settings.
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    if config.database.url.is_none() {
        anyhow::bail!("DATABASE_URL must be set to seed a database");
    }

    let store = PgStore::connect(&config.database)
        .await
        .context("connecting to DATABASE_URL")?;
    let report = seed(&store, &config.seed).await?;

    let mut accounts = vec![report.system_admin.email.clone()];
    accounts.extend(report.sample_users.iter().map(|u| u.email.clone()));

    output_success(
        &output_format,
        &format!("Seeded {}", accounts.join(", ")),
        Some(json!({
            "accounts": accounts,
            "sampleTenant": report.sample_tenant.as_ref().map(|t| &t.name),
        })),
    )
}
