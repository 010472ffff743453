//! Type-dispatched value validation
//!
//! [`validate`] is the gate every write goes through: it checks a candidate
//! value against a [`Setting`]'s type and constraints and returns a
//! human-readable reason on failure. Messages interpolate the setting's
//! description and the violated bound, so they are stable for a given
//! setting and value.
//!
//! [`validate_text_secure`] is a separate, opt-in scanner for injection-style
//! payloads in free text. It is never applied automatically.

use crate::config::{Setting, SettingType};
use regex::RegexSet;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Why a value was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// The value breaks the type or a constraint
    #[error("{0}")]
    Invalid(String),

    /// The setting's type is not one the validator supports
    #[error("Unknown setting type: {0}")]
    UnknownType(String),
}

/// Validate `value` against the type and constraints of `setting`
///
/// | type              | rule                                              |
/// |-------------------|---------------------------------------------------|
/// | `boolean`         | strictly `true` or `false`                        |
/// | `text`/`longtext` | a string, at most `maxLength` characters          |
/// | `number`          | a finite number within inclusive `min`/`max`      |
/// | `json`            | an object or array that serializes and re-parses  |
/// | `enum`            | a string naming one of the non-empty `options`    |
///
/// # Errors
///
/// Returns [`RuleViolation::Invalid`] with the reason, or
/// [`RuleViolation::UnknownType`] for unsupported types.
pub fn validate(setting: &Setting, value: &Value) -> Result<(), RuleViolation> {
    let label = label(setting);

    match &setting.setting_type {
        SettingType::Boolean => {
            if !value.is_boolean() {
                return invalid(format!("{label} must be a boolean (true or false)"));
            }
        }
        SettingType::Text | SettingType::LongText => {
            let Some(text) = value.as_str() else {
                return invalid(format!("{label} must be a string"));
            };
            if let Some(max_length) = setting.constraints.max_length {
                let length = text.chars().count() as u64;
                if length > max_length {
                    return invalid(format!(
                        "{label} must not exceed {max_length} characters (got {length})"
                    ));
                }
            }
        }
        SettingType::Number => {
            let Some(num) = value.as_f64().filter(|n| n.is_finite()) else {
                return invalid(format!("{label} must be a valid number"));
            };
            if let Some(min) = setting.constraints.min {
                if num < min {
                    return invalid(format!("{label} must be at least {min}"));
                }
            }
            if let Some(max) = setting.constraints.max {
                if num > max {
                    return invalid(format!("{label} must be at most {max}"));
                }
            }
        }
        SettingType::Json => {
            if !(value.is_object() || value.is_array()) {
                return invalid(format!("{label} must be a JSON object or array"));
            }
            // Float text is not bit-exact on re-parse, so only success counts
            let round_trip = serde_json::to_string(value)
                .and_then(|text| serde_json::from_str::<Value>(&text));
            if let Err(e) = round_trip {
                return invalid(format!("{label} must be valid JSON: {e}"));
            }
        }
        SettingType::Enum => {
            let options = match &setting.constraints.options {
                Some(options) if !options.is_empty() => options,
                _ => return invalid(format!("{label} has no options defined")),
            };
            let allowed = value.as_str().is_some_and(|v| options.contains_key(v));
            if !allowed {
                let names: Vec<&str> = options.keys().map(String::as_str).collect();
                return invalid(format!("{label} must be one of: {}", names.join(", ")));
            }
        }
        SettingType::Unknown(name) => return Err(RuleViolation::UnknownType(name.clone())),
    }

    Ok(())
}

fn label(setting: &Setting) -> &str {
    if setting.description.is_empty() {
        "Value"
    } else {
        &setting.description
    }
}

fn invalid(reason: String) -> Result<(), RuleViolation> {
    Err(RuleViolation::Invalid(reason))
}

// =============================================================================
// Text Security Scan
// =============================================================================

static INJECTION_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        // script blocks
        r"(?i)<\s*script\b",
        // inline event handlers (onclick=, onload=, ...)
        r"(?i)\bon[a-z]+\s*=",
        // SQL keywords
        r"(?i)\b(select|insert|update|delete|drop|create|alter|exec|union)\b",
        // dangerous URL schemes
        r"(?i)\b(javascript|vbscript|data)\s*:",
        // any HTML tag
        r"<[^>]*>",
    ])
    .expect("injection patterns are valid regexes")
});

/// Scan free text for injection-style payloads
///
/// Returns `true` when none of the patterns (script tags, event-handler
/// attributes, SQL keywords, `javascript:`/`vbscript:`/`data:` schemes, any
/// HTML tag) match. This is deliberately aggressive and will reject
/// legitimate content such as `a <b> c`; call it only where that is wanted.
pub fn validate_text_secure(text: &str) -> bool {
    let safe = !INJECTION_PATTERNS.is_match(text);
    if !safe {
        log::debug!("Text rejected by security scan");
    }
    safe
}

// =============================================================================
// Tests
// =============================================================================
