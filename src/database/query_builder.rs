use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, FromRow, PgExecutor, Row};

use crate::database::manager::DatabaseError;
use crate::filter::{ColumnCasts, Filter, FilterData};

/// Runs a [`Filter`] against one table and decodes rows into `T`.
pub struct QueryBuilder<T> {
    filter: Filter,
    _row: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table: &str, data: &FilterData, casts: ColumnCasts) -> Result<Self, DatabaseError> {
        Ok(Self {
            filter: Filter::from_data(table, data)?.with_casts(casts),
            _row: std::marker::PhantomData,
        })
    }

    pub async fn select_all<'e, E: PgExecutor<'e>>(self, executor: E) -> Result<Vec<T>, DatabaseError> {
        let query = self.filter.select_sql()?;
        let rows = sqlx::query_as_with::<_, T, _>(&query.sql, arguments(&query.params))
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn count<'e, E: PgExecutor<'e>>(self, executor: E) -> Result<i64, DatabaseError> {
        let query = self.filter.count_sql()?;
        let row = sqlx::query_with(&query.sql, arguments(&query.params))
            .fetch_one(executor)
            .await?;
        Ok(row.try_get("count")?)
    }
}

/// Filter parameters in placeholder order. Whole numbers go as BIGINT,
/// other numbers as DOUBLE; the SQL side casts where a column needs it.
fn arguments(params: &[Value]) -> PgArguments {
    let mut args = PgArguments::default();
    for param in params {
        match param {
            Value::Null => args.add(None::<String>),
            Value::Bool(flag) => args.add(*flag),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(whole), _) => args.add(whole),
                (None, Some(float)) => args.add(float),
                (None, None) => args.add(n.to_string()),
            },
            Value::String(text) => args.add(text.clone()),
            Value::Array(_) | Value::Object(_) => args.add(param.clone()),
        }
    }
    args
}
