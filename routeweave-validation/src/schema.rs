// Schema types, builders and the validation walker

use crate::{Presence, ValidationError, ValidationErrors, ValidationOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use routeweave_log::trace;
use serde_json::Value;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static ALPHANUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

#[derive(Debug, Clone, Default)]
pub(crate) struct StringRules {
    pub(crate) min: Option<usize>,
    pub(crate) max: Option<usize>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) email: bool,
    pub(crate) alphanum: bool,
    pub(crate) uuid: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct NumberRules {
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
    pub(crate) integer: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectRules {
    /// `None` accepts any keys; `Some` declares the known keys in check order.
    pub(crate) keys: Option<Vec<(String, Schema)>>,
    pub(crate) unknown: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ArrayRules {
    pub(crate) items: Option<Box<Schema>>,
    pub(crate) min: Option<usize>,
    pub(crate) max: Option<usize>,
    pub(crate) single: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Any,
    Valid(Vec<Value>),
    String(StringRules),
    Number(NumberRules),
    Boolean,
    Object(ObjectRules),
    Array(ArrayRules),
}

/// A schema for one JSON value.
///
/// Schemas are immutable once built and cheap to clone. Rule methods that do
/// not apply to the schema's type are ignored, so `Schema::boolean().min(1.0)`
/// is simply a boolean schema.
///
/// ```
/// use routeweave_validation::{Schema, ValidationOptions};
/// use serde_json::json;
///
/// let schema = Schema::object()
///     .key("name", Schema::string().min_length(2).required())
///     .key("age", Schema::number().integer().min(0.0));
///
/// let options = ValidationOptions::default();
/// assert!(schema.validate(Some(&json!({"name": "Ada", "age": 36})), &options).is_ok());
///
/// let err = schema.validate(Some(&json!({"age": 36})), &options).unwrap_err();
/// assert_eq!(err.to_string(), "\"name\" is required");
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) kind: Kind,
    pub(crate) presence: Option<Presence>,
    pub(crate) allowed: Vec<Value>,
}

impl Schema {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            presence: None,
            allowed: Vec::new(),
        }
    }

    /// Accepts any value.
    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    pub fn string() -> Self {
        Self::of(Kind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::of(Kind::Number(NumberRules::default()))
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// An object accepting any keys until [`key`](Self::key) declares some.
    pub fn object() -> Self {
        Self::of(Kind::Object(ObjectRules::default()))
    }

    pub fn array() -> Self {
        Self::of(Kind::Array(ArrayRules::default()))
    }

    /// Accepts exactly the given values.
    pub fn valid<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::of(Kind::Valid(values.into_iter().map(Into::into).collect()))
    }

    pub fn required(mut self) -> Self {
        self.presence = Some(Presence::Required);
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Some(Presence::Optional);
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.presence = Some(Presence::Forbidden);
        self
    }

    /// Accept `value` in addition to whatever the type accepts.
    pub fn allow(mut self, value: impl Into<Value>) -> Self {
        self.allowed.push(value.into());
        self
    }

    /// Minimum string length in characters.
    pub fn min_length(mut self, min: usize) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.min = Some(min);
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.max = Some(max);
        }
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.pattern = Some(pattern);
        }
        self
    }

    pub fn email(mut self) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.email = true;
        }
        self
    }

    pub fn alphanum(mut self) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.alphanum = true;
        }
        self
    }

    pub fn uuid(mut self) -> Self {
        if let Kind::String(rules) = &mut self.kind {
            rules.uuid = true;
        }
        self
    }

    /// Minimum numeric value (inclusive).
    pub fn min(mut self, min: f64) -> Self {
        if let Kind::Number(rules) = &mut self.kind {
            rules.min = Some(min);
        }
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        if let Kind::Number(rules) = &mut self.kind {
            rules.max = Some(max);
        }
        self
    }

    pub fn integer(mut self) -> Self {
        if let Kind::Number(rules) = &mut self.kind {
            rules.integer = true;
        }
        self
    }

    /// Declare an object key. Declaring any key makes undeclared keys
    /// unknown.
    pub fn key(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let Kind::Object(rules) = &mut self.kind {
            let name = name.into();
            let keys = rules.keys.get_or_insert_with(Vec::new);
            match keys.iter_mut().find(|(key, _)| *key == name) {
                Some(slot) => slot.1 = schema,
                None => keys.push((name, schema)),
            }
        }
        self
    }

    /// Declare that the object has no keys besides those added later.
    pub fn no_keys(mut self) -> Self {
        if let Kind::Object(rules) = &mut self.kind {
            rules.keys.get_or_insert_with(Vec::new);
        }
        self
    }

    /// Override the `allow_unknown` option for this object.
    pub fn unknown(mut self, allow: bool) -> Self {
        if let Kind::Object(rules) = &mut self.kind {
            rules.unknown = Some(allow);
        }
        self
    }

    pub fn items(mut self, schema: Schema) -> Self {
        if let Kind::Array(rules) = &mut self.kind {
            rules.items = Some(Box::new(schema));
        }
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        if let Kind::Array(rules) = &mut self.kind {
            rules.min = Some(min);
        }
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        if let Kind::Array(rules) = &mut self.kind {
            rules.max = Some(max);
        }
        self
    }

    /// Treat a non-array value as a one-element array. Useful for query
    /// parameters, which only become arrays when repeated.
    pub fn single(mut self) -> Self {
        if let Kind::Array(rules) = &mut self.kind {
            rules.single = true;
        }
        self
    }

    /// Name of the schema type, as used in descriptions.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            Kind::Any => "any",
            Kind::Valid(_) => "valid",
            Kind::String(_) => "string",
            Kind::Number(_) => "number",
            Kind::Boolean => "boolean",
            Kind::Object(_) => "object",
            Kind::Array(_) => "array",
        }
    }

    pub fn presence(&self) -> Option<Presence> {
        self.presence
    }

    /// Check `value` against the schema. `None` stands for an absent value.
    pub fn validate(
        &self,
        value: Option<&Value>,
        options: &ValidationOptions,
    ) -> Result<(), ValidationErrors> {
        let mut walker = Walker {
            options,
            errors: Vec::new(),
        };
        // Abort only stops the walk; the errors are already recorded.
        let _ = walker.check(self, value, &mut Vec::new());

        if walker.errors.is_empty() {
            Ok(())
        } else {
            trace!(
                "{} schema rejected value with {} error(s)",
                self.type_name(),
                walker.errors.len()
            );
            Err(ValidationErrors::new(walker.errors))
        }
    }
}

/// Stops the walk when `abort_early` is set.
struct Abort;

type Step = Result<(), Abort>;

struct Walker<'a> {
    options: &'a ValidationOptions,
    errors: Vec<ValidationError>,
}

fn label(path: &[String]) -> String {
    if path.is_empty() {
        "value".to_string()
    } else {
        path.join(".")
    }
}

fn render_list(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A string equal to the text form of an allowed number or boolean.
fn converted_match(values: &[Value], value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    values.iter().any(|allowed| match allowed {
        Value::Number(n) => s.trim().parse::<f64>().ok() == n.as_f64(),
        Value::Bool(b) => s.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        _ => false,
    })
}

impl Walker<'_> {
    fn fail(&mut self, path: &[String], constraint: &str, problem: String, value: Option<&Value>) -> Step {
        let label = label(path);
        let mut error = ValidationError::new(label.clone(), format!("\"{}\" {}", label, problem))
            .with_constraint(constraint);
        if let Some(value) = value {
            error = error.with_value(value.to_string());
        }
        self.errors.push(error);

        if self.options.abort_early {
            Err(Abort)
        } else {
            Ok(())
        }
    }

    fn check(&mut self, schema: &Schema, value: Option<&Value>, path: &mut Vec<String>) -> Step {
        let presence = schema.presence.unwrap_or(self.options.presence);

        let Some(value) = value else {
            return match presence {
                Presence::Required => self.fail(path, "any.required", "is required".into(), None),
                Presence::Optional | Presence::Forbidden => Ok(()),
            };
        };

        if presence == Presence::Forbidden {
            return self.fail(path, "any.unknown", "is not allowed".into(), Some(value));
        }

        if schema.allowed.contains(value) {
            return Ok(());
        }

        match &schema.kind {
            Kind::Any => Ok(()),
            Kind::Valid(values) => {
                if values.contains(value) || (self.options.convert && converted_match(values, value)) {
                    Ok(())
                } else {
                    let problem = format!("must be one of [{}]", render_list(values));
                    self.fail(path, "any.only", problem, Some(value))
                }
            }
            Kind::String(rules) => self.check_string(rules, value, path),
            Kind::Number(rules) => self.check_number(rules, value, path),
            Kind::Boolean => self.check_boolean(value, path),
            Kind::Object(rules) => self.check_object(rules, value, path),
            Kind::Array(rules) => self.check_array(rules, value, path),
        }
    }

    fn check_string(&mut self, rules: &StringRules, value: &Value, path: &[String]) -> Step {
        let Some(s) = value.as_str() else {
            return self.fail(path, "string.base", "must be a string".into(), Some(value));
        };
        if s.is_empty() {
            return self.fail(path, "string.empty", "is not allowed to be empty".into(), Some(value));
        }

        let len = s.chars().count();
        if let Some(min) = rules.min.filter(|&min| len < min) {
            let problem = format!("length must be at least {} characters long", min);
            self.fail(path, "string.min", problem, Some(value))?;
        }
        if let Some(max) = rules.max.filter(|&max| len > max) {
            let problem = format!("length must be less than or equal to {} characters long", max);
            self.fail(path, "string.max", problem, Some(value))?;
        }
        if let Some(pattern) = rules.pattern.as_ref().filter(|p| !p.is_match(s)) {
            let problem = format!(
                "with value \"{}\" fails to match the required pattern: /{}/",
                s,
                pattern.as_str()
            );
            self.fail(path, "string.pattern.base", problem, Some(value))?;
        }
        if rules.email && !EMAIL_REGEX.is_match(s) {
            self.fail(path, "string.email", "must be a valid email".into(), Some(value))?;
        }
        if rules.alphanum && !ALPHANUMERIC_REGEX.is_match(s) {
            let problem = "must only contain alpha-numeric characters".to_string();
            self.fail(path, "string.alphanum", problem, Some(value))?;
        }
        if rules.uuid && !UUID_REGEX.is_match(s) {
            self.fail(path, "string.guid", "must be a valid GUID".into(), Some(value))?;
        }
        Ok(())
    }

    fn check_number(&mut self, rules: &NumberRules, value: &Value, path: &[String]) -> Step {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if self.options.convert => {
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite() && !s.trim().is_empty())
            }
            _ => None,
        };
        let Some(number) = number else {
            return self.fail(path, "number.base", "must be a number".into(), Some(value));
        };

        if rules.integer && number.fract() != 0.0 {
            self.fail(path, "number.integer", "must be an integer".into(), Some(value))?;
        }
        if let Some(min) = rules.min.filter(|&min| number < min) {
            let problem = format!("must be greater than or equal to {}", min);
            self.fail(path, "number.min", problem, Some(value))?;
        }
        if let Some(max) = rules.max.filter(|&max| number > max) {
            let problem = format!("must be less than or equal to {}", max);
            self.fail(path, "number.max", problem, Some(value))?;
        }
        Ok(())
    }

    fn check_boolean(&mut self, value: &Value, path: &[String]) -> Step {
        let ok = match value {
            Value::Bool(_) => true,
            Value::String(s) if self.options.convert => {
                s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            self.fail(path, "boolean.base", "must be a boolean".into(), Some(value))
        }
    }

    fn check_object(&mut self, rules: &ObjectRules, value: &Value, path: &mut Vec<String>) -> Step {
        let Some(map) = value.as_object() else {
            return self.fail(path, "object.base", "must be of type object".into(), Some(value));
        };
        let Some(keys) = &rules.keys else {
            return Ok(());
        };

        for (key, schema) in keys {
            path.push(key.clone());
            let step = self.check(schema, map.get(key), path);
            path.pop();
            step?;
        }

        if !rules.unknown.unwrap_or(self.options.allow_unknown) {
            for (key, child) in map {
                if keys.iter().any(|(known, _)| known == key) {
                    continue;
                }
                path.push(key.clone());
                let step = self.fail(path, "object.unknown", "is not allowed".into(), Some(child));
                path.pop();
                step?;
            }
        }
        Ok(())
    }

    fn check_array(&mut self, rules: &ArrayRules, value: &Value, path: &mut Vec<String>) -> Step {
        let items: &[Value] = match value {
            Value::Array(items) => items.as_slice(),
            other if rules.single => std::slice::from_ref(other),
            other => {
                return self.fail(path, "array.base", "must be an array".into(), Some(other));
            }
        };

        if let Some(min) = rules.min.filter(|&min| items.len() < min) {
            let problem = format!("must contain at least {} items", min);
            self.fail(path, "array.min", problem, Some(value))?;
        }
        if let Some(max) = rules.max.filter(|&max| items.len() > max) {
            let problem = format!("must contain less than or equal to {} items", max);
            self.fail(path, "array.max", problem, Some(value))?;
        }

        if let Some(schema) = &rules.items {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                let step = self.check(schema, Some(item), path);
                path.pop();
                step?;
            }
        }
        Ok(())
    }
}

/// Object schema with exactly `keys` declared.
pub(crate) fn keyed_object(keys: Vec<(String, Schema)>) -> Schema {
    Schema::of(Kind::Object(ObjectRules {
        keys: Some(keys),
        unknown: None,
    }))
}
