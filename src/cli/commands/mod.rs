pub mod auth;
pub mod clients;
pub mod invoices;
pub mod notifications;
pub mod seed;

use crate::cli::api_client::ApiClient;
use crate::cli::config::{get_config_dir, load_session, Session};
use crate::cli::store::ClientStore;

/// API client for the saved session.
pub fn session_client() -> anyhow::Result<(Session, ApiClient)> {
    let session = load_session(&get_config_dir()?)?;
    let client = ApiClient::new(&session.server, session.token.clone());
    Ok((session, client))
}

/// Local store backed by the saved session's server.
pub async fn open_store() -> anyhow::Result<ClientStore> {
    let (_, client) = session_client()?;
    ClientStore::open(get_config_dir()?, Box::new(client)).await
}
