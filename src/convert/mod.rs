//! Type Coercion & Validation
//!
//! Primitive conversion driven by the *current* property value,
//! pattern/enum validation with an LRU of compiled patterns, union-type
//! resolution, and converter hook dispatch. Nested-object coercion is
//! the mapping engine's job, not this unit's.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::fragment::Value;
use crate::meta::Converter;

/// Compiled validation patterns, keyed by source text
///
/// Invalid patterns are cached as None so they fail fast on reuse.
static PATTERNS: Lazy<Mutex<LruCache<String, Option<Regex>>>> = Lazy::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(128).expect("non-zero cache size"),
    ))
});

/// Primitive shapes a union-typed field may resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionCandidate {
    Number,
    Boolean,
    Text,
}

/// Which converter hook to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Serialize,
    Deserialize,
}

/// Coerce a raw value to the primitive shape of the current property
///
/// The target type is inferred from the value the property already
/// holds. Bool accepts the literals `"true"`/`"false"`, the numbers
/// `1`/`0` and their string forms; number coercion is a straight parse
/// falling back to `0`; string coercion stringifies. Any other current
/// shape passes the raw value through unchanged.
pub fn coerce_to_property(value: Value, current: Option<&Value>) -> Value {
    if value.is_null() {
        return value;
    }
    match current {
        Some(Value::Bool(_)) => coerce_bool(value),
        Some(Value::Number(_)) => coerce_number(value),
        Some(Value::Text(_)) => Value::Text(value.stringify()),
        _ => value,
    }
}

fn coerce_bool(value: Value) -> Value {
    match &value {
        Value::Bool(_) => value,
        Value::Number(n) if *n == 1.0 => Value::Bool(true),
        Value::Number(n) if *n == 0.0 => Value::Bool(false),
        Value::Text(s) => match s.as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => value,
        },
        _ => value,
    }
}

fn coerce_number(value: Value) -> Value {
    match &value {
        Value::Number(_) => value,
        Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => Value::Number(s.trim().parse().unwrap_or(0.0)),
        _ => value,
    }
}

/// Validate a value against an optional pattern and enum set
///
/// Textual values must match the pattern when present; non-text values
/// are exempt from the pattern check. Enum membership compares the
/// stringified value. Returns false on failure.
pub fn validate_value(
    value: &Value,
    pattern: Option<&str>,
    enum_values: Option<&[String]>,
) -> bool {
    if let (Some(pattern), Value::Text(text)) = (pattern, value) {
        if !pattern_matches(pattern, text) {
            return false;
        }
    }
    if let Some(allowed) = enum_values {
        let text = value.stringify();
        if !allowed.iter().any(|v| *v == text) {
            return false;
        }
    }
    true
}

fn pattern_matches(pattern: &str, text: &str) -> bool {
    let mut cache = PATTERNS.lock().expect("pattern cache poisoned");
    let compiled = cache.get_or_insert(pattern.to_string(), || Regex::new(pattern).ok());
    match compiled {
        Some(re) => re.is_match(text),
        // An uncompilable pattern can never match
        None => false,
    }
}

/// Resolve a raw value against a union of candidate primitive types
///
/// Structured values pass through. Otherwise the candidates are tried
/// in fixed priority order: numeric parse, boolean literal
/// (`"true"/"1"`, `"false"/"0"`), then string. Falls back to the
/// original value when nothing applies.
pub fn to_union_type(value: Value, candidates: &[UnionCandidate]) -> Value {
    match &value {
        Value::Map(_) | Value::Instance(_) | Value::Dynamic(_) | Value::List(_) => return value,
        Value::Null => return value,
        _ => {}
    }
    let text = value.stringify();

    if candidates.contains(&UnionCandidate::Number) {
        if let Ok(n) = text.trim().parse::<f64>() {
            if !text.trim().is_empty() {
                return Value::Number(n);
            }
        }
    }
    if candidates.contains(&UnionCandidate::Boolean) {
        match text.as_str() {
            "true" | "1" => return Value::Bool(true),
            "false" | "0" => return Value::Bool(false),
            _ => {}
        }
    }
    if candidates.contains(&UnionCandidate::Text) {
        return Value::Text(text);
    }
    value
}

/// Run the matching converter hook, or pass the value through
pub fn apply_converter(value: Value, converter: Option<&Converter>, direction: Direction) -> Value {
    let hook = converter.and_then(|c| match direction {
        Direction::Serialize => c.serialize.as_ref(),
        Direction::Deserialize => c.deserialize.as_ref(),
    });
    match hook {
        Some(f) => f(&value),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_coercion_literals() {
        let current = Value::Bool(false);
        assert_eq!(
            coerce_to_property(Value::Text("true".into()), Some(&current)),
            Value::Bool(true)
        );
        assert_eq!(
            coerce_to_property(Value::Text("0".into()), Some(&current)),
            Value::Bool(false)
        );
        assert_eq!(
            coerce_to_property(Value::Number(1.0), Some(&current)),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_number_coercion_falls_back_to_zero() {
        let current = Value::Number(0.0);
        assert_eq!(
            coerce_to_property(Value::Text("12.5".into()), Some(&current)),
            Value::Number(12.5)
        );
        assert_eq!(
            coerce_to_property(Value::Text("not a number".into()), Some(&current)),
            Value::Number(0.0)
        );
    }

    #[test]
    fn test_structured_current_passes_through() {
        let current = Value::Map(crate::fragment::Fragment::new());
        let raw = Value::Text("kept".into());
        assert_eq!(coerce_to_property(raw.clone(), Some(&current)), raw);
    }

    #[test]
    fn test_pattern_validation() {
        let value = Value::Text("AB-12".into());
        assert!(validate_value(&value, Some(r"^[A-Z]{2}-\d{2}$"), None));
        assert!(!validate_value(&value, Some(r"^\d+$"), None));
        // Non-text values are exempt from pattern checks
        assert!(validate_value(&Value::Number(5.0), Some(r"^\d$"), None));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        assert!(!validate_value(
            &Value::Text("x".into()),
            Some(r"([unclosed"),
            None
        ));
    }

    #[test]
    fn test_enum_validation() {
        let allowed = vec!["red".to_string(), "green".to_string()];
        assert!(validate_value(&Value::Text("red".into()), None, Some(&allowed)));
        assert!(!validate_value(&Value::Text("blue".into()), None, Some(&allowed)));
    }

    #[test]
    fn test_union_priority_number_first() {
        let all = [
            UnionCandidate::Number,
            UnionCandidate::Boolean,
            UnionCandidate::Text,
        ];
        assert_eq!(to_union_type(Value::Text("1".into()), &all), Value::Number(1.0));
        assert_eq!(
            to_union_type(Value::Text("true".into()), &all),
            Value::Bool(true)
        );
        assert_eq!(
            to_union_type(Value::Text("word".into()), &all),
            Value::Text("word".into())
        );
    }

    #[test]
    fn test_union_without_text_candidate_keeps_original() {
        let numeric_only = [UnionCandidate::Number];
        assert_eq!(
            to_union_type(Value::Text("word".into()), &numeric_only),
            Value::Text("word".into())
        );
    }

    #[test]
    fn test_converter_dispatch() {
        let conv = Converter::pair(
            |v| Value::Text(format!("ser:{}", v.stringify())),
            |v| Value::Text(format!("de:{}", v.stringify())),
        );
        assert_eq!(
            apply_converter(Value::Text("x".into()), Some(&conv), Direction::Serialize),
            Value::Text("ser:x".into())
        );
        assert_eq!(
            apply_converter(Value::Text("x".into()), Some(&conv), Direction::Deserialize),
            Value::Text("de:x".into())
        );
        assert_eq!(
            apply_converter(Value::Text("x".into()), None, Direction::Serialize),
            Value::Text("x".into())
        );
    }
}
