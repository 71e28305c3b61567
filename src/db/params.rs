//! Bound parameters for parameterized statements.
//!
//! Report filters reach the database only as bound values; `bind_params`
//! attaches a whole parameter list to a query for any of the three drivers.

use crate::models::QueryParam;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

/// Bind `params` in order to `query`.
pub(crate) fn bind_params<'q, DB>(
    query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    params: &'q [QueryParam],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    Option<&'q str>: Encode<'q, DB> + Type<DB>,
{
    params.iter().fold(query, |query, param| match param {
        QueryParam::Null => query.bind(None::<&'q str>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_bind_params_in_order() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let params = vec![
            QueryParam::Int(7),
            QueryParam::String("press".into()),
            QueryParam::Bool(true),
            QueryParam::Null,
        ];
        let row = bind_params(sqlx::query("SELECT ? AS a, ? AS b, ? AS c, ? IS NULL AS d"), &params)
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(row.get::<i64, _>("a"), 7);
        assert_eq!(row.get::<String, _>("b"), "press");
        assert!(row.get::<bool, _>("c"));
        assert!(row.get::<bool, _>("d"));
    }
}
