use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::filter::FilterData;
use crate::types::InvoiceStatus;

/// Query string accepted by the list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Only honoured for system admins
    pub tenant_id: Option<i64>,
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    fn paged(&self, where_clause: Map<String, Value>) -> Result<FilterData, ApiError> {
        if matches!(self.limit, Some(l) if l < 0) {
            return Err(ApiError::bad_request("limit must be non-negative"));
        }
        if matches!(self.offset, Some(o) if o < 0) {
            return Err(ApiError::bad_request("offset must be non-negative"));
        }
        Ok(FilterData {
            where_clause: (!where_clause.is_empty()).then_some(Value::Object(where_clause)),
            order: Some(json!({ "created_at": "desc" })),
            limit: self.limit,
            offset: self.offset,
        })
    }

    /// `search` matches name, email or company, case-insensitively.
    pub fn client_filter(&self) -> Result<FilterData, ApiError> {
        let mut where_clause = Map::new();
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            where_clause.insert(
                "$or".to_string(),
                json!([
                    { "name": { "$ilike": pattern } },
                    { "email": { "$ilike": pattern } },
                    { "company": { "$ilike": pattern } },
                ]),
            );
        }
        self.paged(where_clause)
    }

    pub fn invoice_filter(&self) -> Result<FilterData, ApiError> {
        let mut where_clause = Map::new();
        if let Some(status) = &self.status {
            let status: InvoiceStatus = status
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Unknown status '{}'", status)))?;
            where_clause.insert("status".to_string(), json!(status.as_str()));
        }
        if let Some(client_id) = &self.client_id {
            let client_id =
                Uuid::parse_str(client_id).map_err(|_| ApiError::bad_request("clientId must be a UUID"))?;
            where_clause.insert("client_id".to_string(), json!(client_id.to_string()));
        }
        self.paged(where_clause)
    }
}

/// Makes `%`, `_` and `\` match themselves inside a LIKE pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_becomes_ilike_or() {
        let query = ListQuery {
            search: Some(" acme ".into()),
            ..Default::default()
        };
        let filter = query.client_filter().unwrap();
        let or = &filter.where_clause.unwrap()["$or"];
        assert_eq!(or[0]["name"]["$ilike"], "%acme%");
        assert_eq!(or.as_array().unwrap().len(), 3);
    }

    #[test]
    fn search_wildcards_are_escaped() {
        let query = ListQuery {
            search: Some("a_b%".into()),
            ..Default::default()
        };
        let filter = query.client_filter().unwrap();
        assert_eq!(filter.where_clause.unwrap()["$or"][1]["email"]["$ilike"], "%a\\_b\\%%");
        assert_eq!(escape_like(r"c:\tmp"), r"c:\\tmp");
    }

    #[test]
    fn empty_query_has_no_where() {
        let filter = ListQuery::default().invoice_filter().unwrap();
        assert!(filter.where_clause.is_none());
        assert_eq!(filter.order, Some(json!({ "created_at": "desc" })));
    }

    #[test]
    fn bad_status_is_rejected() {
        let query = ListQuery {
            status: Some("void".into()),
            ..Default::default()
        };
        assert!(query.invoice_filter().is_err());
    }
}
