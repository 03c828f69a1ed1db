use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::cli::store::SyncState;
use crate::cli::OutputFormat;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `{"success": true, "message": ...}` merged with `data`'s fields, or a
/// check-marked line in text mode.
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    if let OutputFormat::Text = output_format {
        println!("✓ {}", message);
        return Ok(());
    }

    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("message".into(), message.into());
    if let Some(Value::Object(fields)) = data {
        body.extend(fields);
    }
    print_json(&body)
}

/// The local change stands but the server refused it. Text goes to stderr.
pub fn output_sync_failure(output_format: &OutputFormat, message: &str, error: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => print_json(&json!({ "success": false, "message": message, "error": error })),
        OutputFormat::Text => {
            eprintln!("! {}", message);
            if let Some(detail) = error {
                eprintln!("  {}", detail);
            }
            Ok(())
        }
    }
}

pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut body = Map::new();
            body.insert(collection_name.to_string(), Value::Array(Vec::new()));
            print_json(&body)
        }
        OutputFormat::Text => {
            println!("{}", message);
            Ok(())
        }
    }
}

/// First block of a UUID, enough to tell rows apart in a table.
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// One-character column for list views.
pub fn sync_marker(state: SyncState) -> &'static str {
    match state {
        SyncState::Confirmed => " ",
        SyncState::Pending => "~",
        SyncState::Failed => "!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_the_leading_hex() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(short_id(&id), "67e55044");
    }
}
