// Schemas as data: descriptions, literals and the reverse rendering

use crate::schema::{keyed_object, Kind};
use crate::{Presence, Schema, SchemaError};
use regex::Regex;
use serde_json::{Map, Value};

/// Key marking an object literal as a schema description.
pub const SCHEMA_KEY: &str = "$schema";

impl Schema {
    /// Build a schema from a literal.
    ///
    /// Objects become keyed object schemas whose values are literals in turn,
    /// arrays and scalars become exact-value schemas. A `type` key is an
    /// ordinary key like any other, so `{"type": "signup"}` only accepts
    /// objects whose `type` is `"signup"`.
    ///
    /// An object holding only [`SCHEMA_KEY`] is read as a description instead,
    /// see [`from_description`](Self::from_description):
    /// `{"$schema": {"type": "number", "integer": true}}` or `{"$schema": "number"}`.
    pub fn from_literal(literal: &Value) -> Result<Schema, SchemaError> {
        match literal {
            Value::Object(map) if map.contains_key(SCHEMA_KEY) => {
                if map.len() != 1 {
                    return Err(invalid(SCHEMA_KEY, "must be the only key of its object"));
                }
                Self::from_description(&map[SCHEMA_KEY])
            }
            Value::Object(map) => {
                let keys = map
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), Self::from_literal(value)?)))
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                Ok(keyed_object(keys))
            }
            Value::Array(values) => Ok(Schema::valid(values.iter().cloned())),
            scalar => Ok(Schema::valid([scalar.clone()])),
        }
    }

    /// Build a schema from a description such as
    /// `{"type": "string", "min": 3, "required": true}`, or from a bare type
    /// name like `"string"`.
    ///
    /// `min`/`max` mean length for strings, value for numbers and item count
    /// for arrays. The schemas under `keys` and `items` are descriptions too.
    pub fn from_description(description: &Value) -> Result<Schema, SchemaError> {
        if let Value::String(type_name) = description {
            return Self::from_description(&Value::Object(Map::from_iter([(
                "type".to_string(),
                Value::String(type_name.clone()),
            )])));
        }
        let Some(map) = description.as_object() else {
            return Err(SchemaError::InvalidRule {
                key: "type".to_string(),
                reason: "a schema description must be an object or a type name".to_string(),
            });
        };
        let type_name = map.get("type").and_then(Value::as_str).unwrap_or("any");

        let mut schema = match type_name {
            "any" => Schema::any(),
            "string" => Schema::string(),
            "number" => Schema::number(),
            "boolean" => Schema::boolean(),
            "object" => Schema::object(),
            "array" => Schema::array(),
            "valid" => Schema::valid(array_rule(map, "valid")?.unwrap_or_default()),
            other => return Err(SchemaError::UnknownType(other.to_string())),
        };

        for (key, value) in map {
            schema = match key.as_str() {
                "type" | "valid" => schema,
                "required" => toggle(schema, key, value, Schema::required)?,
                "optional" => toggle(schema, key, value, Schema::optional)?,
                "forbidden" => toggle(schema, key, value, Schema::forbidden)?,
                "presence" => {
                    let presence = value
                        .as_str()
                        .and_then(Presence::from_name)
                        .ok_or_else(|| invalid(key, "expected required, optional or forbidden"))?;
                    Schema {
                        presence: Some(presence),
                        ..schema
                    }
                }
                "allow" => match value {
                    Value::Array(values) => values.iter().cloned().fold(schema, |schema, v| schema.allow(v)),
                    single => schema.allow(single.clone()),
                },
                "min" => match schema.kind {
                    Kind::Number(_) => schema.min(float(key, value)?),
                    Kind::Array(_) => schema.min_items(count(key, value)?),
                    _ => schema.min_length(count(key, value)?),
                },
                "max" => match schema.kind {
                    Kind::Number(_) => schema.max(float(key, value)?),
                    Kind::Array(_) => schema.max_items(count(key, value)?),
                    _ => schema.max_length(count(key, value)?),
                },
                "pattern" => {
                    let source = value.as_str().ok_or_else(|| invalid(key, "expected a string"))?;
                    let regex = Regex::new(source).map_err(|e| SchemaError::InvalidPattern {
                        pattern: source.to_string(),
                        reason: e.to_string(),
                    })?;
                    schema.pattern(regex)
                }
                "email" => toggle(schema, key, value, Schema::email)?,
                "alphanum" => toggle(schema, key, value, Schema::alphanum)?,
                "uuid" => toggle(schema, key, value, Schema::uuid)?,
                "integer" => toggle(schema, key, value, Schema::integer)?,
                "single" => toggle(schema, key, value, Schema::single)?,
                "unknown" => {
                    let allow = value.as_bool().ok_or_else(|| invalid(key, "expected a boolean"))?;
                    schema.unknown(allow)
                }
                "keys" => {
                    let keys = value.as_object().ok_or_else(|| invalid(key, "expected an object"))?;
                    let mut schema = schema.no_keys();
                    for (name, description) in keys {
                        schema = schema.key(name.clone(), Self::from_description(description)?);
                    }
                    schema
                }
                "items" => schema.items(Self::from_description(value)?),
                _ => return Err(invalid(key, "unsupported rule")),
            };
        }

        Ok(schema)
    }

    /// Render the schema as a description accepted by
    /// [`from_description`](Self::from_description).
    pub fn describe(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), self.type_name().into());

        match &self.kind {
            Kind::Any | Kind::Boolean => {}
            Kind::Valid(values) => {
                map.insert("valid".into(), Value::Array(values.clone()));
            }
            Kind::String(rules) => {
                insert_some(&mut map, "min", rules.min);
                insert_some(&mut map, "max", rules.max);
                if let Some(pattern) = &rules.pattern {
                    map.insert("pattern".into(), pattern.as_str().into());
                }
                insert_flag(&mut map, "email", rules.email);
                insert_flag(&mut map, "alphanum", rules.alphanum);
                insert_flag(&mut map, "uuid", rules.uuid);
            }
            Kind::Number(rules) => {
                insert_some(&mut map, "min", rules.min);
                insert_some(&mut map, "max", rules.max);
                insert_flag(&mut map, "integer", rules.integer);
            }
            Kind::Object(rules) => {
                if let Some(keys) = &rules.keys {
                    let keys = keys
                        .iter()
                        .map(|(name, schema)| (name.clone(), schema.describe()))
                        .collect();
                    map.insert("keys".into(), Value::Object(keys));
                }
                insert_some(&mut map, "unknown", rules.unknown);
            }
            Kind::Array(rules) => {
                if let Some(items) = &rules.items {
                    map.insert("items".into(), items.describe());
                }
                insert_some(&mut map, "min", rules.min);
                insert_some(&mut map, "max", rules.max);
                insert_flag(&mut map, "single", rules.single);
            }
        }

        if let Some(presence) = self.presence {
            let name = match presence {
                Presence::Optional => "optional",
                Presence::Required => "required",
                Presence::Forbidden => "forbidden",
            };
            map.insert("presence".into(), name.into());
        }
        if !self.allowed.is_empty() {
            map.insert("allow".into(), Value::Array(self.allowed.clone()));
        }

        Value::Object(map)
    }

    /// Render the schema as a literal that [`from_literal`](Self::from_literal)
    /// reads back as this schema.
    pub fn to_literal(&self) -> Value {
        Value::Object(Map::from_iter([(SCHEMA_KEY.to_string(), self.describe())]))
    }
}

fn invalid(key: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidRule {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn toggle(schema: Schema, key: &str, value: &Value, apply: fn(Schema) -> Schema) -> Result<Schema, SchemaError> {
    match value.as_bool() {
        Some(true) => Ok(apply(schema)),
        Some(false) => Ok(schema),
        None => Err(invalid(key, "expected a boolean")),
    }
}

fn count(key: &str, value: &Value) -> Result<usize, SchemaError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

fn float(key: &str, value: &Value) -> Result<f64, SchemaError> {
    value.as_f64().ok_or_else(|| invalid(key, "expected a number"))
}

fn array_rule(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<Value>>, SchemaError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::Array(values)) => Ok(Some(values.clone())),
        Some(_) => Err(invalid(key, "expected an array")),
    }
}

fn insert_some<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

fn insert_flag(map: &mut Map<String, Value>, key: &str, enabled: bool) {
    if enabled {
        map.insert(key.to_string(), Value::Bool(true));
    }
}
