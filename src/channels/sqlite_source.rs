//! [`PageSource`] over a SQLite table

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use super::traits::{EntityRow, Page, PageRequest, PageSource};
use crate::error::{Error, Result};

/// Pages through a table ordered by a key column
///
/// Page `n` is `LIMIT size OFFSET n * size`; the total page count comes from a
/// `COUNT(*)` issued with every page so that it follows the table while a run is
/// in progress.
#[derive(Clone, Debug)]
pub struct SqliteTableSource {
    pool: SqlitePool,
    table: String,
    order_by: String,
    label: String,
}

impl SqliteTableSource {
    /// Page through `table` ordered by `order_by`
    ///
    /// Both identifiers must be plain SQL identifiers (letters, digits, underscores,
    /// not starting with a digit).
    pub fn new(pool: SqlitePool, table: &str, order_by: &str) -> Result<Self> {
        validate_identifier(table, "table")?;
        validate_identifier(order_by, "order_by")?;

        Ok(Self {
            pool,
            table: table.to_string(),
            order_by: order_by.to_string(),
            label: format!("sqlite:{}", table),
        })
    }

    async fn count_rows(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{}""#, self.table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl PageSource for SqliteTableSource {
    async fn find_page(&self, request: PageRequest) -> Result<Page> {
        let total_rows = self.count_rows().await?;
        if total_rows == 0 {
            return Ok(Page::empty());
        }

        let sql = format!(
            r#"SELECT * FROM "{}" ORDER BY "{}" LIMIT ? OFFSET ?"#,
            self.table, self.order_by
        );
        let rows = sqlx::query(&sql)
            .bind(request.size as i64)
            .bind(request.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let rows = rows
            .iter()
            .map(row_to_entity)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            table = %self.table,
            page = request.index,
            rows = rows.len(),
            total_rows,
            "Fetched table page"
        );

        Ok(Page::from_total(rows, request, total_rows))
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn validate_identifier(identifier: &str, what: &str) -> Result<()> {
    let mut chars = identifier.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(Error::Config {
            message: format!("'{}' is not a valid {} identifier", identifier, what),
            key: Some(format!("source.{}", what)),
        })
    }
}

/// Convert a row into a JSON object using each value's storage class
fn row_to_entity(row: &SqliteRow) -> Result<EntityRow> {
    let mut entity = EntityRow::new();

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => serde_json::Number::from_f64(row.try_get::<f64, _>(index)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(index)?),
                _ => Value::from(row.try_get::<String, _>(index)?),
            }
        };

        entity.insert(column.name().to_string(), value);
    }

    Ok(entity)
}
