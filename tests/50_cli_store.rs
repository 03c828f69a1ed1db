mod common;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use invoicer_api::cli::api_client::{ApiClient, ClientRequest, InvoiceRequest, LineRequest, RemoteApi};
use invoicer_api::cli::csv::parse_csv_clients;
use invoicer_api::cli::notifications::NotificationKind;
use invoicer_api::cli::store::{ClientStore, LoadSource, SyncState};
use invoicer_api::types::InvoiceStatus;

use common::{TestServer, ACCOUNTANT_EMAIL, ACCOUNTANT_PASSWORD};

async fn logged_in(server: &TestServer) -> Result<ApiClient> {
    let (token, user) = ApiClient::new(&server.base_url, None)
        .login(ACCOUNTANT_EMAIL, ACCOUNTANT_PASSWORD, "token")
        .await?;
    assert_eq!(user.email, ACCOUNTANT_EMAIL);
    Ok(ApiClient::new(&server.base_url, Some(token)))
}

#[tokio::test]
async fn store_round_trip_against_the_server() -> Result<()> {
    let server = TestServer::start().await?;
    let dir = tempfile::tempdir()?;

    let mut store = ClientStore::open(dir.path(), Box::new(logged_in(&server).await?)).await?;
    assert_eq!(store.source(), LoadSource::Server);

    let client = store
        .add_client(ClientRequest {
            name: "Acme".into(),
            email: "billing@acme.test".into(),
            ..Default::default()
        })
        .await?;
    assert_eq!(client.state, SyncState::Confirmed);

    let request = InvoiceRequest {
        invoice_number: "INV-001".into(),
        client_id: client.record.id,
        date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        due_date: None,
        tax_rate: Decimal::from(10),
        discount: Decimal::from(5),
        notes: None,
        line_items: vec![
            LineRequest { description: "Design".into(), quantity: 2, unit_price: Decimal::from(50) },
            LineRequest { description: "Hosting".into(), quantity: 1, unit_price: Decimal::from(30) },
        ],
    };
    let invoice = store.create_invoice(request.clone()).await?;
    assert_eq!(invoice.state, SyncState::Confirmed);
    assert_eq!(invoice.record.total, Decimal::from(138));

    let marked = store.mark_invoice(invoice.record.id, InvoiceStatus::Paid).await?.unwrap();
    assert_eq!(marked.state, SyncState::Confirmed);
    assert_eq!(marked.record.status, InvoiceStatus::Paid);

    // Same number again: kept locally as failed, reported as a notification
    let duplicate = store.create_invoice(request).await?;
    assert_eq!(duplicate.state, SyncState::Failed);
    assert!(duplicate.error.unwrap_or_default().contains("Invoice number already exists"));

    let kinds: Vec<NotificationKind> = store.notifications().entries().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        [
            NotificationKind::SyncFailed,
            NotificationKind::InvoicePaid,
            NotificationKind::InvoiceCreated,
            NotificationKind::ClientAdded,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn csv_rows_go_through_bulk_import() -> Result<()> {
    let server = TestServer::start().await?;
    let api = logged_in(&server).await?;

    let rows = parse_csv_clients("name,email,phone\nOne,one@x.test,555\n\"Two, Inc\",two@x.test\nbroken-row\n");
    assert_eq!(rows.len(), 2);
    assert_eq!(api.bulk_create_clients(&rows).await?, 2);

    let names: Vec<String> = api.list_clients().await?.into_iter().map(|c| c.name).collect();
    assert!(names.contains(&"Two, Inc".to_string()));
    Ok(())
}

#[tokio::test]
async fn bad_password_is_an_error() -> Result<()> {
    let server = TestServer::start().await?;
    let err = ApiClient::new(&server.base_url, None)
        .login(ACCOUNTANT_EMAIL, "wrong", "token")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid credentials"));
    Ok(())
}
