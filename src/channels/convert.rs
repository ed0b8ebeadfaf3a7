//! Stock converters and key extractors

use serde_json::Value;

use super::traits::{Converter, DataObject, EntityRow, KeyExtractor};
use crate::error::{Result, UpstreamError};

/// Publishes every row as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl Converter for IdentityConverter {
    fn convert(&self, rows: Vec<EntityRow>) -> Result<Vec<DataObject>> {
        Ok(rows.into_iter().map(Value::Object).collect())
    }
}

/// Publishes a selection of columns, optionally renamed
///
/// A missing source column becomes `null` unless the projection is strict, in which
/// case the whole page fails.
#[derive(Debug, Clone, Default)]
pub struct FieldProjection {
    fields: Vec<(String, String)>,
    strict: bool,
}

impl FieldProjection {
    /// Empty projection; add fields with [`field`](Self::field) or [`rename`](Self::rename)
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `name` under the same name
    pub fn field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.fields.push((name.clone(), name));
        self
    }

    /// Keep `source` and publish it as `target`
    pub fn rename(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.fields.push((source.into(), target.into()));
        self
    }

    /// Fail the page when a projected column is missing from a row
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl Converter for FieldProjection {
    fn convert(&self, rows: Vec<EntityRow>) -> Result<Vec<DataObject>> {
        rows.into_iter()
            .map(|mut row| {
                let mut object = serde_json::Map::with_capacity(self.fields.len());
                for (source, target) in &self.fields {
                    let value = match row.remove(source) {
                        Some(value) => value,
                        None if self.strict => {
                            return Err(crate::Error::Other(format!(
                                "row has no column '{}'",
                                source
                            )));
                        }
                        None => Value::Null,
                    };
                    object.insert(target.clone(), value);
                }
                Ok(Value::Object(object))
            })
            .collect()
    }
}

/// Adapts a closure into a [`Converter`]
pub struct FnConverter<F>(pub F);

impl<F> Converter for FnConverter<F>
where
    F: Fn(Vec<EntityRow>) -> Result<Vec<DataObject>> + Send + Sync,
{
    fn convert(&self, rows: Vec<EntityRow>) -> Result<Vec<DataObject>> {
        (self.0)(rows)
    }
}

/// Keys objects by one of their top-level fields
///
/// Strings are used verbatim, numbers and booleans by their JSON text. Any other
/// value (or a missing field) cannot be keyed.
#[derive(Debug, Clone)]
pub struct FieldKeyExtractor {
    field: String,
}

impl FieldKeyExtractor {
    /// Key by `field`
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl KeyExtractor for FieldKeyExtractor {
    fn extract_key(&self, object: &DataObject) -> Result<String> {
        match object.get(&self.field) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(other) => Err(UpstreamError::KeyExtraction(format!(
                "field '{}' holds {} which cannot be used as a key",
                self.field,
                value_kind(other)
            ))
            .into()),
            None => Err(UpstreamError::KeyExtraction(format!(
                "object has no field '{}'",
                self.field
            ))
            .into()),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "an empty string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
