use std::collections::HashMap;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::payloads::ClientPayload;
use crate::api::ListQuery;
use crate::database::models::Client;
use crate::database::store::by_id;
use crate::database::Store;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::tenancy::{scope, write_tenant};
use crate::validation::{FieldProblem, Validator};

const NOT_FOUND: &str = "Client not found";

pub struct ClientService<'a> {
    store: &'a dyn Store,
    caller: &'a AuthUser,
}

impl<'a> ClientService<'a> {
    pub fn new(store: &'a dyn Store, caller: &'a AuthUser) -> Self {
        Self { store, caller }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Client>, ApiError> {
        let filter = scope(query.client_filter()?, self.caller, query.tenant_id, true)?;
        Ok(self.store.list_clients(&filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Client, ApiError> {
        let filter = scope(by_id(id), self.caller, None, true)?;
        self.store
            .find_client(&filter)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn create(&self, payload: ClientPayload) -> Result<Client, ApiError> {
        let requested_tenant = payload.tenant_id;
        let new_client = payload.into_new()?;
        let tenant_id = write_tenant(self.store, self.caller, requested_tenant).await?;

        let client = new_client.into_client(tenant_id);
        self.store.insert_clients(vec![client.clone()]).await?;
        info!("Client {} created in tenant {}", client.id, tenant_id);
        Ok(client)
    }

    /// Every row is validated before anything is written; one bad row
    /// rejects the whole batch.
    pub async fn bulk_create(&self, rows: Vec<ClientPayload>, max_rows: usize) -> Result<u64, ApiError> {
        if rows.is_empty() || rows.len() > max_rows {
            return Err(ApiError::validation_failed(vec![FieldProblem::new(
                "clients",
                format!("Expected between 1 and {} clients", max_rows),
            )]));
        }

        let mut v = Validator::new();
        let mut drafts = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let requested_tenant = row.tenant_id;
            if let Some(draft) = row.check_new(&mut v, &format!("[{index}]")) {
                drafts.push((requested_tenant, draft));
            }
        }
        v.finish()?;

        let mut tenants: HashMap<Option<i64>, i64> = HashMap::new();
        let mut clients = Vec::with_capacity(drafts.len());
        for (requested_tenant, draft) in drafts {
            let tenant_id = match tenants.get(&requested_tenant) {
                Some(id) => *id,
                None => {
                    let id = write_tenant(self.store, self.caller, requested_tenant).await?;
                    tenants.insert(requested_tenant, id);
                    id
                }
            };
            clients.push(draft.into_client(tenant_id));
        }

        let count = self.store.insert_clients(clients).await?;
        info!("Bulk imported {} clients", count);
        Ok(count)
    }

    pub async fn update(&self, id: Uuid, payload: ClientPayload) -> Result<Client, ApiError> {
        let changes = payload.into_changes()?;
        let mut client = self.get(id).await?;
        client.apply(changes);
        Ok(self.store.update_client(&client).await?)
    }

    /// Refused while any invoice still points at the client.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let client = self.get(id).await?;

        let referencing = FilterData {
            where_clause: Some(json!({ "client_id": client.id.to_string() })),
            ..Default::default()
        };
        if self.store.count_invoices(&referencing).await? > 0 {
            return Err(ApiError::conflict("Client has invoices and cannot be deleted"));
        }

        if !self.store.delete_client(client.id).await? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        info!("Client {} deleted", client.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::types::Role;
    use axum::http::StatusCode;

    fn member(tenant_id: i64) -> AuthUser {
        AuthUser {
            user_id: 10,
            email: "member@example.com".into(),
            role: Role::Accountant,
            tenant_id: Some(tenant_id),
        }
    }

    fn payload(name: &str, email: &str) -> ClientPayload {
        ClientPayload {
            name: Some(name.into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn other_tenants_clients_are_invisible() {
        let store = MemoryStore::new();
        let a = store.create_tenant("A").await.unwrap();
        let b = store.create_tenant("B").await.unwrap();
        let (alice, bob) = (member(a.id), member(b.id));

        let mine = ClientService::new(&store, &alice)
            .create(payload("Mine", "mine@a.com"))
            .await
            .unwrap();
        let theirs = ClientService::new(&store, &bob);

        assert!(theirs.list(&ListQuery::default()).await.unwrap().is_empty());
        let err = theirs.get(mine.id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(theirs.delete(mine.id).await.is_err());
        assert_eq!(store.count_clients(&FilterData::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn bulk_is_all_or_nothing() {
        let store = MemoryStore::new();
        let tenant = store.create_tenant("A").await.unwrap();
        let caller = member(tenant.id);
        let service = ClientService::new(&store, &caller);

        let rows = vec![payload("One", "one@a.com"), payload("Two", "not-an-email")];
        let err = service.bulk_create(rows, 1000).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(store.count_clients(&FilterData::default()).await.unwrap(), 0);

        let rows = vec![payload("One", "one@a.com"), payload("Two", "two@a.com"), payload("Three", "three@a.com")];
        assert_eq!(service.bulk_create(rows, 1000).await.unwrap(), 3);
        assert!(service.bulk_create(Vec::new(), 1000).await.is_err());
    }

    #[tokio::test]
    async fn update_is_partial() {
        let store = MemoryStore::new();
        let tenant = store.create_tenant("A").await.unwrap();
        let caller = member(tenant.id);
        let service = ClientService::new(&store, &caller);
        let client = service.create(payload("Old", "old@a.com")).await.unwrap();

        let updated = service
            .update(client.id, ClientPayload { name: Some("New".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.email, "old@a.com");
    }
}
