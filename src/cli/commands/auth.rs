use serde_json::json;

use crate::cli::api_client::ApiClient;
use crate::cli::config::{clear_session, get_config_dir, load_session, save_session, Session};
use crate::cli::utils::{output_success, print_json};
use crate::cli::OutputFormat;
use crate::database::models::UserProfile;

const DEFAULT_COOKIE_NAME: &str = "token";

pub async fn login(email: String, password: String, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let dir = get_config_dir()?;
    let server = server.unwrap_or(load_session(&dir)?.server);
    let cookie_name = std::env::var("SECURITY_COOKIE_NAME").unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string());

    let (token, user) = ApiClient::new(&server, None).login(&email, &password, &cookie_name).await?;
    save_session(&dir, &Session::new(server.clone(), token, user.email.clone()))?;

    output_success(
        &output_format,
        &format!("Logged in as {} ({}) on {}", user.email, user.role, server),
        Some(json!({ "user": user, "server": server })),
    )
}

/// The server only clears its cookie; the token is dropped locally either way.
pub async fn logout(output_format: OutputFormat) -> anyhow::Result<()> {
    let dir = get_config_dir()?;
    let session = load_session(&dir)?;
    if session.is_logged_in() {
        if let Err(e) = ApiClient::new(&session.server, session.token.clone()).logout().await {
            tracing::warn!("Server logout failed: {}", e);
        }
    }
    clear_session(&dir)?;
    output_success(&output_format, "Logged out", None)
}

pub async fn whoami(output_format: OutputFormat) -> anyhow::Result<()> {
    let (session, client) = super::session_client()?;
    if !session.is_logged_in() {
        anyhow::bail!("Not logged in. Run `invoicer login <email>`");
    }

    let user = client.me().await?;
    match output_format {
        OutputFormat::Json => print_json(&json!({ "user": user, "server": session.server })),
        OutputFormat::Text => {
            print_profile(&user, &session.server);
            Ok(())
        }
    }
}

fn print_profile(user: &UserProfile, server: &str) {
    println!("Email:  {}", user.email);
    println!("Role:   {}", user.role);
    match &user.tenant {
        Some(tenant) => println!("Tenant: {} (#{})", tenant.name, tenant.id),
        None => println!("Tenant: -"),
    }
    println!("Server: {}", server);
}
