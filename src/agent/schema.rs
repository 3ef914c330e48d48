//! Expected output shapes for agents.
//!
//! Schema-on-output is a soft contract enforced by the model, so every
//! response is checked against its [`OutputSchema`] before it is trusted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of a top-level output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text.
    String,
    /// Integer in 0..=100.
    Score,
    /// Any JSON number.
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    fn hint(&self) -> &'static str {
        match self {
            Self::String => "<string>",
            Self::Score => "<integer 0-100>",
            Self::Number => "<number>",
            Self::Boolean => "<true|false>",
            Self::Object => "<object>",
            Self::Array => "<array>",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Score => parse_score(value).is_some(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Score => "score",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        };
        f.write_str(s)
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "text" => Ok(Self::String),
            "score" => Ok(Self::Score),
            "number" => Ok(Self::Number),
            "boolean" | "bool" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "array" | "list" => Ok(Self::Array),
            other => Err(format!(
                "Invalid field kind '{}'. Valid values: string, score, number, boolean, object, array",
                other
            )),
        }
    }
}

/// One required top-level field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
}

/// Required top-level fields of an agent's JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    fields: Vec<SchemaField>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push(SchemaField {
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// JSON skeleton sent to the model as the expected response shape.
    ///
    /// ```
    /// use site_audit::agent::{FieldKind, OutputSchema};
    ///
    /// let schema = OutputSchema::new().field("score", FieldKind::Score);
    /// assert_eq!(schema.hint(), "{\n  \"score\": \"<integer 0-100>\"\n}");
    /// ```
    pub fn hint(&self) -> String {
        let mut lines = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            lines.push(format!("  \"{}\": \"{}\"", field.name, field.kind.hint()));
        }
        if lines.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n}}", lines.join(",\n"))
        }
    }

    /// Check a parsed response against the schema.
    ///
    /// The response must be a JSON object holding every declared field with
    /// the declared kind. Extra fields are allowed.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(object) = value.as_object() else {
            return Err(format!("expected a JSON object, got {}", json_type(value)));
        };
        let problems = self.problems(object);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    fn problems(&self, object: &Map<String, Value>) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|field| match object.get(&field.name) {
                None => Some(format!("missing field '{}'", field.name)),
                Some(v) if !field.kind.matches(v) => Some(format!(
                    "field '{}' should be {}, got {}",
                    field.name,
                    field.kind,
                    json_type(v)
                )),
                Some(_) => None,
            })
            .collect()
    }
}

/// Read a 0..=100 score from a JSON value.
///
/// Accepts integers and integral floats (models sometimes emit `72.0`), and
/// numeric strings. Anything outside the range is rejected, not clamped.
pub fn parse_score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.fract() != 0.0 || !(0.0..=100.0).contains(&n) {
        return None;
    }
    Some(n as u8)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
