//! Typed capability input schemas.
//!
//! A schema validates the arguments a model proposes before any handler
//! runs, and renders itself as JSON Schema for the model's tool list.

use adrelay_core::validation::{is_fetchable_url, parse_date};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Shape of one argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// String with at least `min_len` non-whitespace characters.
    Text { min_len: usize, max_len: Option<usize> },
    /// Number strictly greater than zero.
    PositiveNumber,
    /// `YYYY-MM-DD` calendar date.
    Date,
    /// Absolute http(s) URL.
    Url,
    /// Array of strings.
    TextList {
        min_items: usize,
        max_items: Option<usize>,
    },
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

/// First argument that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid argument `{field}`: {message}")]
pub struct SchemaViolation {
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Ordered set of fields; unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: true,
            description,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: false,
            description,
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate `args`, reporting the first violation.
    pub fn validate(&self, args: &Value) -> Result<(), SchemaViolation> {
        let object = args
            .as_object()
            .ok_or_else(|| SchemaViolation::new("arguments", "expected a JSON object"))?;

        if let Some(unknown) = object
            .keys()
            .find(|k| !self.fields.iter().any(|f| f.name == k.as_str()))
        {
            return Err(SchemaViolation::new(unknown.as_str(), "unknown argument"));
        }

        for field in &self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(SchemaViolation::new(field.name, "is required"));
                }
                None | Some(Value::Null) => {}
                Some(value) => check(field, value)?,
            }
        }
        Ok(())
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = kind_schema(&field.kind);
            property["description"] = json!(field.description);
            properties.insert(field.name.to_string(), property);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn check(field: &FieldSpec, value: &Value) -> Result<(), SchemaViolation> {
    let fail = |message: String| Err(SchemaViolation::new(field.name, message));

    match &field.kind {
        FieldKind::Text { min_len, max_len } => {
            let Some(text) = value.as_str() else {
                return fail("expected a string".to_string());
            };
            let len = text.trim().chars().count();
            if len < *min_len {
                return fail(if *min_len <= 1 {
                    "must not be empty".to_string()
                } else {
                    format!("must be at least {} characters", min_len)
                });
            }
            if let Some(max) = max_len {
                if len > *max {
                    return fail(format!("must be at most {} characters", max));
                }
            }
        }
        FieldKind::PositiveNumber => match value.as_f64() {
            Some(n) if n > 0.0 && n.is_finite() => {}
            Some(_) => return fail("must be a positive number".to_string()),
            None => return fail("expected a number".to_string()),
        },
        FieldKind::Date => match value.as_str() {
            Some(text) if parse_date(text).is_some() => {}
            _ => return fail("expected a YYYY-MM-DD date".to_string()),
        },
        FieldKind::Url => match value.as_str() {
            Some(text) if is_fetchable_url(text) => {}
            _ => return fail("expected an http(s) URL".to_string()),
        },
        FieldKind::TextList {
            min_items,
            max_items,
        } => {
            let Some(items) = value.as_array() else {
                return fail("expected an array of strings".to_string());
            };
            if items.iter().any(|i| !i.is_string()) {
                return fail("expected an array of strings".to_string());
            }
            if items.len() < *min_items {
                return fail(format!("needs at least {} items", min_items));
            }
            if let Some(max) = max_items {
                if items.len() > *max {
                    return fail(format!("allows at most {} items", max));
                }
            }
        }
        FieldKind::Choice(options) => match value.as_str() {
            Some(text) if options.contains(&text) => {}
            _ => return fail(format!("must be one of {}", options.join(", "))),
        },
    }
    Ok(())
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text { min_len, max_len } => {
            let mut schema = json!({ "type": "string", "minLength": min_len });
            if let Some(max) = max_len {
                schema["maxLength"] = json!(max);
            }
            schema
        }
        FieldKind::PositiveNumber => json!({ "type": "number", "exclusiveMinimum": 0 }),
        FieldKind::Date => json!({
            "type": "string",
            "format": "date",
            "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
        }),
        FieldKind::Url => json!({ "type": "string", "format": "uri" }),
        FieldKind::TextList {
            min_items,
            max_items,
        } => {
            let mut schema = json!({
                "type": "array",
                "items": { "type": "string" },
                "minItems": min_items,
            });
            if let Some(max) = max_items {
                schema["maxItems"] = json!(max);
            }
            schema
        }
        FieldKind::Choice(options) => json!({ "type": "string", "enum": options }),
    }
}
