// Validation options shared by every schema check

use serde::{Deserialize, Serialize};

/// Default presence of values whose schema does not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Optional,
    Required,
    Forbidden,
}

impl Presence {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "optional" => Some(Presence::Optional),
            "required" => Some(Presence::Required),
            "forbidden" => Some(Presence::Forbidden),
            _ => None,
        }
    }
}

/// Options applied to every validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Stop at the first mismatch
    pub abort_early: bool,
    /// Accept object keys the schema does not declare
    pub allow_unknown: bool,
    /// Coerce strings to numbers and booleans where the schema asks for them
    pub convert: bool,
    pub presence: Presence,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            allow_unknown: false,
            convert: true,
            presence: Presence::Optional,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort_early(mut self, enabled: bool) -> Self {
        self.abort_early = enabled;
        self
    }

    pub fn allow_unknown(mut self, enabled: bool) -> Self {
        self.allow_unknown = enabled;
        self
    }

    pub fn convert(mut self, enabled: bool) -> Self {
        self.convert = enabled;
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }
}
