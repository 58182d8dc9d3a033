// GSD MCP Server - Input Schemas
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Field descriptor tree used for two things: validating untrusted tool
// arguments and projecting the JSON Schema advertised in tools/list.
// Both walks are exhaustive matches over FieldKind, so a new kind cannot
// be added without teaching both of them about it.

use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array(Box<Field>),
    Enum(&'static [&'static str]),
    Object(ObjectSchema),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    /// Optional for the caller, filled in before the handler runs
    Default(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub kind: FieldKind,
    pub presence: Presence,
    pub description: Option<&'static str>,
}

impl Field {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            presence: Presence::Required,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn array(item: Field) -> Self {
        Self::of(FieldKind::Array(Box::new(item)))
    }

    pub fn one_of(values: &'static [&'static str]) -> Self {
        Self::of(FieldKind::Enum(values))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(FieldKind::Object(schema))
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.presence = Presence::Default(value.into());
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }

    /// JSON Schema for this field.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            FieldKind::String => json!({"type": "string"}),
            FieldKind::Number => json!({"type": "number"}),
            FieldKind::Boolean => json!({"type": "boolean"}),
            FieldKind::Array(item) => json!({"type": "array", "items": item.to_json_schema()}),
            FieldKind::Enum(values) => json!({"type": "string", "enum": values}),
            FieldKind::Object(inner) => inner.to_json_schema(),
        };
        if let Some(obj) = schema.as_object_mut() {
            if let Some(description) = self.description {
                obj.insert("description".into(), json!(description));
            }
            if let Presence::Default(value) = &self.presence {
                obj.insert("default".into(), value.clone());
            }
        }
        schema
    }

    fn check(&self, value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Option<Value> {
        match &self.kind {
            FieldKind::String => expect(value.is_string(), "string", value, path, errors),
            FieldKind::Number => expect(value.is_number(), "number", value, path, errors),
            FieldKind::Boolean => expect(value.is_boolean(), "boolean", value, path, errors),
            FieldKind::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Some(value.clone()),
                Some(s) => {
                    let expected = allowed
                        .iter()
                        .map(|v| format!("'{}'", v))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    errors.push(FieldError::new(
                        path,
                        format!("Invalid enum value. Expected {}, received '{}'", expected, s),
                    ));
                    None
                }
                None => expect(false, "string", value, path, errors),
            },
            FieldKind::Array(item) => {
                let Some(items) = value.as_array() else {
                    return expect(false, "array", value, path, errors);
                };
                let before = errors.len();
                let checked: Vec<Value> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| item.check(v, &join_path(path, &i.to_string()), errors))
                    .collect();
                (errors.len() == before).then(|| Value::Array(checked))
            }
            FieldKind::Object(inner) => inner.check(value, path, errors),
        }
    }
}

/// Ordered name → field mapping; the shape of every tool's arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<(&'static str, Field)>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, field: Field) -> Self {
        debug_assert!(
            self.fields.iter().all(|(n, _)| *n != name),
            "duplicate field {}",
            name
        );
        self.fields.push((name, field));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Field)> {
        self.fields.iter().map(|(n, f)| (*n, f))
    }

    /// Names of fields that are neither optional nor defaulted.
    pub fn required(&self) -> Vec<&'static str> {
        self.fields()
            .filter(|(_, f)| f.is_required())
            .map(|(n, _)| n)
            .collect()
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields()
            .map(|(name, field)| (name.to_string(), field.to_json_schema()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
        })
    }

    /// Validate raw arguments. On success returns a cleaned object: unknown
    /// keys dropped, defaults filled in. On failure returns every problem
    /// found, not just the first.
    pub fn validate(&self, raw: &Value) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        match self.check(raw, "", &mut errors) {
            Some(value) if errors.is_empty() => Ok(value),
            _ => Err(errors),
        }
    }

    fn check(&self, value: &Value, path: &str, errors: &mut Vec<FieldError>) -> Option<Value> {
        let Some(input) = value.as_object() else {
            return expect(false, "object", value, path, errors);
        };
        let before = errors.len();
        let mut out = Map::new();
        for (name, field) in self.fields() {
            let field_path = join_path(path, name);
            match input.get(name).filter(|v| !v.is_null()) {
                Some(v) => {
                    if let Some(checked) = field.check(v, &field_path, errors) {
                        out.insert(name.to_string(), checked);
                    }
                }
                None => match &field.presence {
                    Presence::Required => errors.push(FieldError::new(&field_path, "Required")),
                    Presence::Optional => {}
                    Presence::Default(default) => {
                        out.insert(name.to_string(), default.clone());
                    }
                },
            }
        }
        (errors.len() == before).then(|| Value::Object(out))
    }
}

fn expect(
    ok: bool,
    expected: &str,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    if ok {
        return Some(value.clone());
    }
    errors.push(FieldError::new(
        path,
        format!("Expected {}, received {}", expected, type_name(value)),
    ));
    None
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

/// One failing field: dotted path plus reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "(arguments)" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}
