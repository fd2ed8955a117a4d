//! Field-by-field reading of JSON request bodies.
//!
//! Bodies arrive as a loose `serde_json::Value` so that a missing or
//! mistyped field becomes a message under that field's key instead of one
//! opaque deserialize error for the whole document.
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::FieldErrors;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";

/// Short type name of a JSON value, as used in error messages.
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn decimal_from(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)).ok()
        }
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
        }
        _ => None,
    }
}

fn integer_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let float = n.as_f64()?;
            (float.fract() == 0.0 && float.abs() < i64::MAX as f64).then_some(float as i64)
        }),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

/// Reads typed fields out of a JSON object, collecting one message per bad
/// field. Each reader returns `None` when the field is absent or invalid;
/// [`Payload::finish`] reports whatever went wrong.
pub struct Payload<'a> {
    fields: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> Payload<'a> {
    pub fn new(body: &'a Value) -> Result<Self, FieldErrors> {
        match body {
            Value::Object(fields) => Ok(Payload {
                fields,
                errors: FieldErrors::new(),
            }),
            other => Err(FieldErrors::single(
                FieldErrors::NON_FIELD,
                format!("Invalid data. Expected a dictionary, but got {}.", kind(other)),
            )),
        }
    }

    /// The raw value of a required field, or `None` after recording why it
    /// is unusable.
    fn required(&mut self, field: &str) -> Option<&'a Value> {
        match self.fields.get(field) {
            None => {
                self.errors.add(field, REQUIRED);
                None
            }
            Some(Value::Null) => {
                self.errors.add(field, NOT_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    /// The raw value of an optional field. Explicit `null` counts as absent.
    fn optional(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    pub fn decimal(&mut self, field: &str) -> Option<Decimal> {
        let value = self.required(field)?;
        let parsed = decimal_from(value);
        if parsed.is_none() {
            self.errors.add(field, "A valid number is required.");
        }
        parsed
    }

    pub fn integer(&mut self, field: &str) -> Option<i64> {
        let value = self.required(field)?;
        let parsed = integer_from(value);
        if parsed.is_none() {
            self.errors.add(field, "A valid integer is required.");
        }
        parsed
    }

    /// A required primary-key reference.
    pub fn pk(&mut self, field: &str) -> Option<i64> {
        let value = self.required(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(raw) => raw.trim().parse().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(
                field,
                format!("Incorrect type. Expected pk value, received {}.", kind(value)),
            );
        }
        parsed
    }

    fn string_from(&mut self, field: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.errors.add(field, "Not a valid string.");
                None
            }
        }
    }

    pub fn string(&mut self, field: &str) -> Option<String> {
        let value = self.required(field)?;
        self.string_from(field, value)
    }

    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        let value = self.optional(field)?;
        self.string_from(field, value)
    }

    /// An optional choice field parsed through the enum's `FromStr`.
    pub fn optional_choice<T: FromStr>(&mut self, field: &str) -> Option<T> {
        let value = self.optional(field)?;
        let parsed = value.as_str().and_then(|raw| raw.parse().ok());
        if parsed.is_none() {
            let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            self.errors.add(field, format!("\"{}\" is not a valid choice.", shown));
        }
        parsed
    }

    pub fn errors_mut(&mut self) -> &mut FieldErrors {
        &mut self.errors
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_null_and_malformed_fields() {
        let body = json!({
            "principal_amount": "abc",
            "down_payment": null,
            "tenure_months": "twelve",
            "bike": "x"
        });
        let mut payload = Payload::new(&body).unwrap();
        assert_eq!(payload.decimal("principal_amount"), None);
        assert_eq!(payload.decimal("down_payment"), None);
        assert_eq!(payload.decimal("interest_rate"), None);
        assert_eq!(payload.integer("tenure_months"), None);
        assert_eq!(payload.pk("bike"), None);

        let errors = payload.finish().unwrap_err();
        assert_eq!(
            errors.get("principal_amount"),
            Some(&["A valid number is required.".to_string()][..])
        );
        assert_eq!(
            errors.get("down_payment"),
            Some(&["This field may not be null.".to_string()][..])
        );
        assert_eq!(
            errors.get("interest_rate"),
            Some(&["This field is required.".to_string()][..])
        );
        assert_eq!(
            errors.get("tenure_months"),
            Some(&["A valid integer is required.".to_string()][..])
        );
        assert_eq!(
            errors.get("bike"),
            Some(&["Incorrect type. Expected pk value, received str.".to_string()][..])
        );
    }

    #[test]
    fn test_numbers_and_numeric_strings_are_accepted() {
        let body = json!({
            "price": 84999.5,
            "rate": " 9.25 ",
            "months": 12.0,
            "count": "7",
            "id": 3
        });
        let mut payload = Payload::new(&body).unwrap();
        assert_eq!(payload.decimal("price"), Decimal::from_str("84999.5").ok());
        assert_eq!(payload.decimal("rate"), Decimal::from_str("9.25").ok());
        assert_eq!(payload.integer("months"), Some(12));
        assert_eq!(payload.integer("count"), Some(7));
        assert_eq!(payload.pk("id"), Some(3));
        assert!(payload.finish().is_ok());
    }

    #[test]
    fn test_optional_fields_and_choices() {
        let body = json!({ "notes": null, "status": "archived" });
        let mut payload = Payload::new(&body).unwrap();
        assert_eq!(payload.optional_string("notes"), None);
        assert_eq!(payload.optional_string("missing"), None);
        assert_eq!(payload.optional_choice::<i64>("status"), None);
        let errors = payload.finish().unwrap_err();
        assert!(errors.get("notes").is_none());
        assert_eq!(
            errors.get("status"),
            Some(&["\"archived\" is not a valid choice.".to_string()][..])
        );
    }

    #[test]
    fn test_non_object_body() {
        let errors = Payload::new(&json!([1, 2])).err().unwrap();
        assert_eq!(
            errors.get(FieldErrors::NON_FIELD),
            Some(&["Invalid data. Expected a dictionary, but got list.".to_string()][..])
        );
    }
}
