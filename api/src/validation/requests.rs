//! Parsing stage for the registration payload
//!
//! `RequiredFieldsValidator` is the only stage that looks at the raw bytes.
//! It checks presence, type and length bounds of every field, and on success
//! deposits the typed [`RegistrationRequest`] into the run's context.

use serde_json::{Map, Value};
use shared::RegistrationRequest;

use super::chain::{StageOutcome, Validator};
use super::context::ValidationContext;
use super::extractors::ValidationBuilder;
use super::validators::{validate_length, MIN_PASSWORD_LENGTH};

// ─────────────────────────────────────────────────────────────────────────────
// Constants for validation rules
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum length for names, city, state and country
const MAX_NAME_LENGTH: usize = 100;
/// Maximum length for email and street address
const MAX_LONG_TEXT_LENGTH: usize = 255;
const MIN_USERNAME_LENGTH: usize = 6;
const MAX_USERNAME_LENGTH: usize = 50;
const MIN_PHONE_LENGTH: usize = 10;
const MAX_PHONE_LENGTH: usize = 20;

const REQUIRED: &str = "This field is required";

/// Presence, type and length checks over the raw JSON body
pub struct RequiredFieldsValidator;

impl Validator for RequiredFieldsValidator {
    fn name(&self) -> &'static str {
        "required_fields"
    }

    fn validate(&self, raw: &[u8], _ctx: &ValidationContext) -> StageOutcome {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return StageOutcome::single("body", "Request body is required");
        }

        let value: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "registration body is not valid JSON");
                return StageOutcome::single("body", format!("Invalid JSON payload: {}", err));
            }
        };
        let Some(object) = value.as_object() else {
            return StageOutcome::single("body", "Request body must be a JSON object");
        };

        // Every field is checked so the caller sees all offending fields at once.
        let mut builder = ValidationBuilder::new();

        let first_name = required_string(object, "firstName", 1, Some(MAX_NAME_LENGTH), &mut builder);
        let last_name = required_string(object, "lastName", 1, Some(MAX_NAME_LENGTH), &mut builder);
        let email = required_string(object, "email", 1, Some(MAX_LONG_TEXT_LENGTH), &mut builder);
        let phone_number = optional_phone(object, &mut builder);
        let street_address = required_string(
            object,
            "streetAddress",
            1,
            Some(MAX_LONG_TEXT_LENGTH),
            &mut builder,
        );
        let city = required_string(object, "city", 1, Some(MAX_NAME_LENGTH), &mut builder);
        let state = required_string(object, "state", 1, Some(MAX_NAME_LENGTH), &mut builder);
        let country = required_string(object, "country", 1, Some(MAX_NAME_LENGTH), &mut builder);
        let username = required_string(
            object,
            "username",
            MIN_USERNAME_LENGTH,
            Some(MAX_USERNAME_LENGTH),
            &mut builder,
        );
        let password = required_string(object, "password", MIN_PASSWORD_LENGTH, None, &mut builder);
        let confirm_password = required_string(object, "confirmPassword", 1, None, &mut builder);
        let accept_terms = required_bool(object, "acceptTerms", &mut builder);
        let newsletter = optional_bool(object, "newsletter", &mut builder);

        if let Err(errors) = builder.build() {
            return StageOutcome::fail(errors);
        }

        let (
            Some(first_name),
            Some(last_name),
            Some(email),
            Some(street_address),
            Some(city),
            Some(state),
            Some(country),
            Some(username),
            Some(password),
            Some(confirm_password),
            Some(accept_terms),
        ) = (
            first_name,
            last_name,
            email,
            street_address,
            city,
            state,
            country,
            username,
            password,
            confirm_password,
            accept_terms,
        )
        else {
            return StageOutcome::single("body", "Invalid request data");
        };

        StageOutcome::parsed(RegistrationRequest {
            first_name,
            last_name,
            email,
            phone_number,
            street_address,
            city,
            state,
            country,
            username,
            password,
            confirm_password,
            accept_terms,
            newsletter: newsletter.unwrap_or(false),
        })
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    min: usize,
    max: Option<usize>,
    builder: &mut ValidationBuilder,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            builder.add_error(field, REQUIRED);
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            builder.add_error(field, REQUIRED);
            None
        }
        Some(Value::String(s)) => match validate_length(s, min, max) {
            Ok(()) => Some(s.clone()),
            Err(message) => {
                builder.add_error(field, message);
                None
            }
        },
        Some(_) => {
            builder.add_error(field, "Must be a string");
            None
        }
    }
}

/// Absent, null and empty are all accepted; anything else must fit the bounds.
/// Format is left to the phone stage.
fn optional_phone(object: &Map<String, Value>, builder: &mut ValidationBuilder) -> Option<String> {
    match object.get("phoneNumber") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => Some(String::new()),
        Some(Value::String(s)) => {
            builder.check("phoneNumber", || {
                validate_length(s, MIN_PHONE_LENGTH, Some(MAX_PHONE_LENGTH))
            });
            Some(s.clone())
        }
        Some(_) => {
            builder.add_error("phoneNumber", "Must be a string");
            None
        }
    }
}

fn required_bool(
    object: &Map<String, Value>,
    field: &str,
    builder: &mut ValidationBuilder,
) -> Option<bool> {
    match object.get(field) {
        None | Some(Value::Null) => {
            builder.add_error(field, REQUIRED);
            None
        }
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            builder.add_error(field, "Must be a boolean");
            None
        }
    }
}

fn optional_bool(
    object: &Map<String, Value>,
    field: &str,
    builder: &mut ValidationBuilder,
) -> Option<bool> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            builder.add_error(field, "Must be a boolean");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::chain::RunPolicy;
    use crate::validation::extractors::FieldError;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "streetAddress": "12 Analytical Row",
            "city": "London",
            "state": "Greater London",
            "country": "GB",
            "username": "adalovelace",
            "password": "Engine1843!",
            "confirmPassword": "Engine1843!",
            "acceptTerms": true
        })
    }

    fn parse(raw: &[u8]) -> StageOutcome {
        let ctx = ValidationContext::new(RunPolicy::ShortCircuit);
        RequiredFieldsValidator.validate(raw, &ctx)
    }

    fn parse_value(value: &Value) -> StageOutcome {
        parse(value.to_string().as_bytes())
    }

    fn fields(outcome: &StageOutcome) -> Vec<&str> {
        outcome.errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn valid_body_is_parsed() {
        let outcome = parse_value(&body());

        assert!(!outcome.is_failure());
        let request = outcome.parsed.unwrap();
        assert_eq!(request.first_name, "Ada");
        assert_eq!(request.phone_number, None);
        assert!(!request.newsletter);
        assert!(request.accept_terms);
    }

    #[test]
    fn empty_body_is_rejected() {
        let outcome = parse(b"");
        assert_eq!(
            outcome.errors,
            vec![FieldError::new("body", "Request body is required")]
        );
    }

    #[test]
    fn malformed_json_is_a_body_error() {
        let outcome = parse(b"{\"firstName\": ");
        assert_eq!(fields(&outcome), vec!["body"]);
        assert!(outcome.parsed.is_none());
    }

    #[test]
    fn non_object_json_is_a_body_error() {
        let outcome = parse(b"[1, 2, 3]");
        assert_eq!(
            outcome.errors,
            vec![FieldError::new("body", "Request body must be a JSON object")]
        );
    }

    #[test]
    fn every_missing_field_is_reported() {
        let mut value = body();
        let object = value.as_object_mut().unwrap();
        object.remove("firstName");
        object.remove("city");
        object.remove("acceptTerms");

        let outcome = parse_value(&value);
        assert_eq!(fields(&outcome), vec!["firstName", "city", "acceptTerms"]);
        assert!(outcome.errors.iter().all(|e| e.message == REQUIRED));
        assert!(outcome.parsed.is_none());
    }

    #[test]
    fn each_required_field_is_enforced() {
        let required = [
            "firstName",
            "lastName",
            "email",
            "streetAddress",
            "city",
            "state",
            "country",
            "username",
            "password",
            "confirmPassword",
            "acceptTerms",
        ];
        for field in required {
            let mut value = body();
            value.as_object_mut().unwrap().remove(field);

            let outcome = parse_value(&value);
            assert_eq!(fields(&outcome), vec![field], "removing {}", field);
        }
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let mut value = body();
        value["lastName"] = json!("");

        let outcome = parse_value(&value);
        assert_eq!(outcome.errors, vec![FieldError::new("lastName", REQUIRED)]);
    }

    #[test]
    fn length_bounds_are_enforced() {
        let mut value = body();
        value["firstName"] = json!("x".repeat(101));
        value["username"] = json!("short");
        value["password"] = json!("Ab1!");

        let outcome = parse_value(&value);
        assert_eq!(
            outcome.errors,
            vec![
                FieldError::new("firstName", "Maximum length is 100"),
                FieldError::new("username", "Minimum length is 6"),
                FieldError::new("password", "Minimum length is 8"),
            ]
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let mut value = body();
        value["city"] = json!("é".repeat(100));

        assert!(!parse_value(&value).is_failure());
    }

    #[test]
    fn wrong_types_are_reported() {
        let mut value = body();
        value["email"] = json!(42);
        value["acceptTerms"] = json!("yes");
        value["newsletter"] = json!(1);

        let outcome = parse_value(&value);
        assert_eq!(fields(&outcome), vec!["email", "acceptTerms", "newsletter"]);
    }

    #[test]
    fn phone_number_is_optional_but_bounded() {
        let mut value = body();
        value["phoneNumber"] = json!("");
        let outcome = parse_value(&value);
        assert_eq!(outcome.parsed.unwrap().phone_number, Some(String::new()));

        value["phoneNumber"] = Value::Null;
        assert!(parse_value(&value).parsed.unwrap().phone_number.is_none());

        value["phoneNumber"] = json!("12345");
        assert_eq!(
            parse_value(&value).errors,
            vec![FieldError::new("phoneNumber", "Minimum length is 10")]
        );
    }

    #[test]
    fn declined_terms_still_parse() {
        let mut value = body();
        value["acceptTerms"] = json!(false);
        value["newsletter"] = json!(true);

        let request = parse_value(&value).parsed.unwrap();
        assert!(!request.accept_terms);
        assert!(request.newsletter);
    }
}
