use serde_json::Value;

use super::error::FilterError;
use super::filter_match::{self, FilterTarget};
use super::filter_order::{order_by, parse_order};
use super::filter_where::SqlWriter;
use super::types::{identifier, ColumnCasts, FilterData, SortKey, SqlFragment};

/// A validated list query against one table. Renders to SQL for the
/// Postgres store and evaluates directly against rows for the memory store.
#[derive(Debug, Clone)]
pub struct Filter {
    table: String,
    conditions: Value,
    order: Vec<SortKey>,
    limit: Option<i64>,
    offset: Option<i64>,
    casts: ColumnCasts,
}

impl Filter {
    pub fn from_data(table: &str, data: &FilterData) -> Result<Self, FilterError> {
        let table = identifier(table)?.to_string();

        let conditions = data.where_clause.clone().unwrap_or(Value::Null);
        if !(conditions.is_null() || conditions.is_object()) {
            return Err(FilterError::NotAnObject);
        }
        let order = match &data.order {
            Some(order) => parse_order(order)?,
            None => Vec::new(),
        };

        if data.limit.is_some_and(|l| l < 0) {
            return Err(FilterError::NegativeWindow("limit"));
        }
        if data.offset.is_some_and(|o| o < 0) {
            return Err(FilterError::NegativeWindow("offset"));
        }
        let max = crate::config::CONFIG.api.max_list_limit;
        let limit = data.limit.map(|l| {
            if l > max {
                tracing::debug!("capping list limit {} to {}", l, max);
            }
            l.min(max)
        });

        Ok(Self {
            table,
            conditions,
            order,
            limit,
            offset: data.offset,
            casts: ColumnCasts::default(),
        })
    }

    pub fn with_casts(mut self, casts: ColumnCasts) -> Self {
        self.casts = casts;
        self
    }

    pub fn select_sql(&self) -> Result<SqlFragment, FilterError> {
        let predicate = SqlWriter::new(&self.casts).predicate(&self.conditions)?;
        let mut sql = format!("SELECT * FROM \"{}\" WHERE {}", self.table, predicate.sql);
        for clause in [order_by(&self.order), self.window()] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(&clause);
            }
        }
        Ok(SqlFragment { sql, params: predicate.params })
    }

    /// Ignores order and paging, like the stores' count operations.
    pub fn count_sql(&self) -> Result<SqlFragment, FilterError> {
        let predicate = SqlWriter::new(&self.casts).predicate(&self.conditions)?;
        Ok(SqlFragment {
            sql: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table, predicate.sql),
            params: predicate.params,
        })
    }

    pub fn matches<T: FilterTarget>(&self, row: &T) -> Result<bool, FilterError> {
        filter_match::matches(&self.conditions, row)
    }

    /// Where, order, offset and limit applied to in-memory rows.
    pub fn apply<T: FilterTarget + Clone>(&self, rows: &[T]) -> Result<Vec<T>, FilterError> {
        let mut kept = Vec::new();
        for row in rows {
            if self.matches(row)? {
                kept.push(row.clone());
            }
        }
        filter_match::sort(&mut kept, &self.order);

        let skip = self.offset.unwrap_or(0) as usize;
        let take = self.limit.map_or(usize::MAX, |l| l as usize);
        Ok(kept.into_iter().skip(skip).take(take).collect())
    }

    fn window(&self) -> String {
        let mut parts = Vec::new();
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("OFFSET {}", offset));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_with_order_and_window() {
        let data = FilterData {
            where_clause: Some(json!({ "tenant_id": 3 })),
            order: Some(json!("created_at desc")),
            limit: Some(10),
            offset: Some(20),
        };
        let out = Filter::from_data("clients", &data).unwrap().select_sql().unwrap();
        assert_eq!(
            out.sql,
            "SELECT * FROM \"clients\" WHERE \"tenant_id\" = $1 ORDER BY \"created_at\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(out.params, vec![json!(3)]);
    }

    #[test]
    fn count_without_conditions() {
        let out = Filter::from_data("tenants", &FilterData::default()).unwrap().count_sql().unwrap();
        assert_eq!(out.sql, "SELECT COUNT(*) AS count FROM \"tenants\" WHERE TRUE");
        assert!(out.params.is_empty());
    }

    #[test]
    fn negative_window_and_bad_table_fail() {
        let data = FilterData { limit: Some(-1), ..Default::default() };
        assert_eq!(
            Filter::from_data("clients", &data).unwrap_err(),
            FilterError::NegativeWindow("limit")
        );
        assert!(Filter::from_data("clients;", &FilterData::default()).is_err());
        let data = FilterData { where_clause: Some(json!([1])), ..Default::default() };
        assert_eq!(Filter::from_data("clients", &data).unwrap_err(), FilterError::NotAnObject);
    }
}
