//! Setting definitions and their type-specific constraints
//!
//! # Overview
//!
//! A [`Setting`] is a typed value plus the declarative information that comes
//! from the configuration source: a description used in error messages and
//! optional constraints that depend on the type.
//!
//! | type       | constraint   | meaning                                  |
//! |------------|--------------|------------------------------------------|
//! | `text`     | `maxLength`  | inclusive upper bound on character count |
//! | `longtext` | `maxLength`  | inclusive upper bound on character count |
//! | `number`   | `min`, `max` | inclusive numeric bounds                 |
//! | `enum`     | `options`    | allowed value -> display label           |
//!
//! Any other keys found in a definition (labels, categories, ordering hints)
//! are preserved in [`Setting::metadata`] and travel through export/import
//! untouched.
//!
//! ```rust
//! use extman::{Setting, settings};
//!
//! let defaults = settings! {
//!     "theme" => Setting::select("Theme", "dark", [("light", "Light"), ("dark", "Dark")]),
//!     "volume" => Setting::number("Volume", 5.0).min(0.0).max(10.0),
//!     "nickname" => Setting::text("Nickname", "").max_length(32),
//! };
//! assert_eq!(defaults.len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping of setting key to its definition (or current record)
pub type SettingDefinitions = BTreeMap<String, Setting>;

// =============================================================================
// Setting Types
// =============================================================================

/// Type of a setting, fixed at definition time
///
/// Unrecognized type names survive deserialization as [`SettingType::Unknown`]
/// so that validation can reject them with a precise message instead of the
/// whole definition file failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SettingType {
    /// Strict boolean
    Boolean,
    /// Single-line string
    #[default]
    Text,
    /// Multi-line string
    LongText,
    /// Finite number
    Number,
    /// Structured JSON object or array
    Json,
    /// One of a fixed set of string options
    Enum,
    /// Anything else found in a definition
    Unknown(String),
}

impl SettingType {
    /// Wire name of this type
    pub fn as_str(&self) -> &str {
        match self {
            SettingType::Boolean => "boolean",
            SettingType::Text => "text",
            SettingType::LongText => "longtext",
            SettingType::Number => "number",
            SettingType::Json => "json",
            SettingType::Enum => "enum",
            SettingType::Unknown(name) => name,
        }
    }

    /// Whether this type is one the validator knows about
    pub fn is_known(&self) -> bool {
        !matches!(self, SettingType::Unknown(_))
    }
}

impl From<String> for SettingType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "boolean" => SettingType::Boolean,
            "text" => SettingType::Text,
            "longtext" => SettingType::LongText,
            "number" => SettingType::Number,
            "json" => SettingType::Json,
            "enum" => SettingType::Enum,
            _ => SettingType::Unknown(name),
        }
    }
}

impl From<SettingType> for String {
    fn from(setting_type: SettingType) -> Self {
        match setting_type {
            SettingType::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Type-Specific Constraints
// =============================================================================

/// Constraints attached to a setting definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SettingConstraints {
    /// Maximum character count for text/longtext
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    /// Inclusive lower bound for number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive upper bound for number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Allowed values for enum, mapped to their display labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
}

// =============================================================================
// Setting
// =============================================================================

/// A typed, constrained configuration value
///
/// The key is not part of the record; it is the key of the map the record
/// lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Type of the setting
    #[serde(rename = "type")]
    pub setting_type: SettingType,

    /// Current value (the default, when read from a configuration source)
    pub value: Value,

    /// Human-readable label, interpolated into validation messages
    #[serde(default)]
    pub description: String,

    /// Type-specific constraints
    #[serde(flatten)]
    pub constraints: SettingConstraints,

    /// Any other fields of the definition
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl Setting {
    fn with(setting_type: SettingType, description: impl Into<String>, value: Value) -> Self {
        Self {
            setting_type,
            value,
            description: description.into(),
            constraints: SettingConstraints::default(),
            metadata: BTreeMap::new(),
        }
    }

    // =========================================================================
    // Type-specific constructors
    // =========================================================================

    /// Create a boolean setting
    pub fn boolean(description: impl Into<String>, default: bool) -> Self {
        Self::with(SettingType::Boolean, description, Value::Bool(default))
    }

    /// Create a single-line text setting
    pub fn text(description: impl Into<String>, default: impl Into<String>) -> Self {
        Self::with(SettingType::Text, description, Value::String(default.into()))
    }

    /// Create a multi-line text setting
    pub fn longtext(description: impl Into<String>, default: impl Into<String>) -> Self {
        Self::with(
            SettingType::LongText,
            description,
            Value::String(default.into()),
        )
    }

    /// Create a number setting
    pub fn number(description: impl Into<String>, default: impl Into<f64>) -> Self {
        Self::with(SettingType::Number, description, json!(default.into()))
    }

    /// Create a structured JSON setting (object or array)
    pub fn json(description: impl Into<String>, default: Value) -> Self {
        Self::with(SettingType::Json, description, default)
    }

    /// Create an enum setting
    ///
    /// **Options are required** and given as `(value, label)` pairs.
    pub fn select<I, V, L>(description: impl Into<String>, default: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        let mut setting = Self::with(SettingType::Enum, description, Value::String(default.into()));
        setting.constraints.options = Some(
            options
                .into_iter()
                .map(|(value, label)| (value.into(), label.into()))
                .collect(),
        );
        setting
    }

    // =========================================================================
    // Constraint setters (builder pattern)
    // =========================================================================

    /// Set maximum length for text/longtext
    #[must_use]
    pub fn max_length(mut self, len: u64) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    /// Set inclusive minimum for number
    #[must_use]
    pub fn min(mut self, val: f64) -> Self {
        self.constraints.min = Some(val);
        self
    }

    /// Set inclusive maximum for number
    #[must_use]
    pub fn max(mut self, val: f64) -> Self {
        self.constraints.max = Some(val);
        self
    }

    /// Attach extra metadata (label, category, ...)
    #[must_use]
    pub fn meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Get metadata value as string
    pub fn get_meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Copy of this record carrying a different value
    #[must_use]
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    // =========================================================================
    // Definition checks
    // =========================================================================

    /// Validate the definition itself
    ///
    /// Checks:
    /// - the type is supported
    /// - number range has min <= max
    /// - the default value satisfies the definition's own rules
    pub fn validate_definition(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.constraints.min, self.constraints.max) {
            if min > max {
                return Err(format!("min ({min}) cannot be greater than max ({max})"));
            }
        }

        crate::validation::validate(self, &self.value)
            .map_err(|e| format!("Default value is invalid: {e}"))
    }
}

/// Macro for building a [`SettingDefinitions`] map
///
/// # Example
/// ```rust
/// use extman::{settings, Setting};
///
/// let defaults = settings! {
///     "enabled" => Setting::boolean("Enabled", true),
///     "greeting" => Setting::text("Greeting", "hello").max_length(64),
/// };
/// assert!(defaults.contains_key("enabled"));
/// ```
#[macro_export]
macro_rules! settings {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::SettingDefinitions::new();
        $(
            map.insert($key.to_string(), $value);
        )*
        map
    }};
}

// =============================================================================
// Tests
// =============================================================================
