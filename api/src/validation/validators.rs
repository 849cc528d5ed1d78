//! Field validators for registration input
//!
//! The free functions are reusable predicates returning `Result<(), String>`;
//! the unit structs wrap them as chain stages that read the parsed request
//! from the run's context.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::chain::{RunPolicy, StageOutcome, Validator};
use super::context::ValidationContext;
use super::extractors::{FieldError, ValidationBuilder};

lazy_static! {
    /// local@domain.tld with a letters-only TLD of two or more characters
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap();

    /// 6 to 50 ASCII letters or digits
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9]{6,50}$").unwrap();

    /// Optional +, optional parenthesized area code, 3-3-(4..6) digit groups.
    /// Separators are a dash, a dot or ASCII whitespace only.
    static ref PHONE_REGEX: Regex =
        Regex::new(r"^[\+]?[(]?[0-9]{3}[)]?[- \t\n\r\x0C\.]?[0-9]{3}[- \t\n\r\x0C\.]?[0-9]{4,6}$")
            .unwrap();
}

/// Characters that satisfy the special-character password rule
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate string length within bounds
pub fn validate_length(value: &str, min: usize, max: Option<usize>) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("Minimum length is {}", min));
    }
    if let Some(max) = max {
        if len > max {
            return Err(format!("Maximum length is {}", max));
        }
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 6-50 characters and contain only letters and numbers".to_string(),
        );
    }
    Ok(())
}

/// Empty or absent phone numbers are accepted
pub fn validate_phone_optional(phone: &Option<String>) -> Result<(), String> {
    match phone.as_deref() {
        None | Some("") => Ok(()),
        Some(number) if PHONE_REGEX.is_match(number) => Ok(()),
        Some(_) => Err("Invalid phone number format".to_string()),
    }
}

/// Checks the password rules in a fixed order: length, then uppercase,
/// lowercase, digit and special character.
///
/// A short password reports only the length rule. Under the short-circuit
/// policy only the first missing character class is reported.
pub fn validate_password_strength(password: &str, policy: RunPolicy) -> Result<(), Vec<FieldError>> {
    let mut builder = ValidationBuilder::for_policy(policy);

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        builder.add_error(
            "password",
            format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
        );
        return builder.build();
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c));

    builder
        .check_condition(
            !has_upper,
            "password",
            "Password must contain at least one uppercase letter",
        )
        .check_condition(
            !has_lower,
            "password",
            "Password must contain at least one lowercase letter",
        )
        .check_condition(!has_digit, "password", "Password must contain at least one number")
        .check_condition(
            !has_special,
            "password",
            "Password must contain at least one special character",
        );

    builder.build()
}

// ─────────────────────────────────────────────────────────────────────────────
// Chain stages
// ─────────────────────────────────────────────────────────────────────────────

pub struct EmailFormatValidator;

impl Validator for EmailFormatValidator {
    fn name(&self) -> &'static str {
        "email_format"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        match validate_email(&req.email) {
            Ok(()) => StageOutcome::pass(),
            Err(message) => StageOutcome::single("email", message),
        }
    }
}

pub struct PasswordStrengthValidator;

impl Validator for PasswordStrengthValidator {
    fn name(&self) -> &'static str {
        "password_strength"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        validate_password_strength(&req.password, ctx.policy()).into()
    }
}

pub struct PasswordMatchValidator;

impl Validator for PasswordMatchValidator {
    fn name(&self) -> &'static str {
        "password_match"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        if req.password != req.confirm_password {
            return StageOutcome::single("confirmPassword", "Passwords do not match");
        }
        StageOutcome::pass()
    }
}

pub struct UsernameFormatValidator;

impl Validator for UsernameFormatValidator {
    fn name(&self) -> &'static str {
        "username_format"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        match validate_username(&req.username) {
            Ok(()) => StageOutcome::pass(),
            Err(message) => StageOutcome::single("username", message),
        }
    }
}

pub struct TermsAcceptanceValidator;

impl Validator for TermsAcceptanceValidator {
    fn name(&self) -> &'static str {
        "terms_acceptance"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        if !req.accept_terms {
            return StageOutcome::single("acceptTerms", "You must accept the terms and conditions");
        }
        StageOutcome::pass()
    }
}

pub struct PhoneNumberValidator;

impl Validator for PhoneNumberValidator {
    fn name(&self) -> &'static str {
        "phone_number"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        match validate_phone_optional(&req.phone_number) {
            Ok(()) => StageOutcome::pass(),
            Err(message) => StageOutcome::single("phoneNumber", message),
        }
    }
}

/// Restricts the email domain suffix per country.
///
/// Countries without a rule are not checked. Country codes and suffixes are
/// compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CountryEmailDomainValidator {
    rules: HashMap<String, Vec<String>>,
}

impl CountryEmailDomainValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, country: &str, suffixes: &[&str]) -> Self {
        self.rules.insert(
            country.trim().to_ascii_uppercase(),
            suffixes.iter().map(|s| s.to_ascii_lowercase()).collect(),
        );
        self
    }
}

impl Validator for CountryEmailDomainValidator {
    fn name(&self) -> &'static str {
        "country_email_domain"
    }

    fn validate(&self, _raw: &[u8], ctx: &ValidationContext) -> StageOutcome {
        let Some(req) = ctx.request() else {
            return StageOutcome::pass();
        };
        let country = req.country.trim().to_ascii_uppercase();
        let Some(suffixes) = self.rules.get(&country) else {
            return StageOutcome::pass();
        };

        let email = req.email.to_ascii_lowercase();
        if suffixes.iter().any(|suffix| email.ends_with(suffix.as_str())) {
            return StageOutcome::pass();
        }

        StageOutcome::single(
            "email",
            format!(
                "Email for country {} must end with one of: {}",
                country,
                suffixes.join(", ")
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::chain::ValidationChain;
    use serde_json::{json, Value};

    fn body() -> Value {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "phoneNumber": "555-123-4567",
            "streetAddress": "12 Analytical Row",
            "city": "London",
            "state": "Greater London",
            "country": "US",
            "username": "adalovelace",
            "password": "Engine1843!",
            "confirmPassword": "Engine1843!",
            "acceptTerms": true,
            "newsletter": true
        })
    }

    fn run(policy: RunPolicy, body: &Value) -> Vec<FieldError> {
        ValidationChain::registration(policy)
            .run(body.to_string().as_bytes())
            .errors
    }

    fn with(field: &str, value: Value) -> Value {
        let mut body = body();
        body[field] = value;
        body
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co").is_ok());

        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("ada@example.c").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada example@example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("abc123").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());

        assert!(validate_username("abc12").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("ada_lovelace").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn test_validate_phone_optional() {
        assert!(validate_phone_optional(&None).is_ok());
        assert!(validate_phone_optional(&Some(String::new())).is_ok());
        assert!(validate_phone_optional(&Some("(555) 123-4567".to_string())).is_ok());
        assert!(validate_phone_optional(&Some("(555)123-4567".to_string())).is_ok());
        assert!(validate_phone_optional(&Some("+5551234567".to_string())).is_ok());
        assert!(validate_phone_optional(&Some("555.123.456789".to_string())).is_ok());

        assert!(validate_phone_optional(&Some("555-123-45".to_string())).is_err());
        assert!(validate_phone_optional(&Some("phone-number".to_string())).is_err());
        assert!(validate_phone_optional(&Some("555\t123\t4567".to_string())).is_ok());
        assert!(validate_phone_optional(&Some("555\u{a0}123\u{a0}4567".to_string())).is_err());
        assert!(validate_phone_optional(&Some("555\u{2003}123-4567".to_string())).is_err());
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length("hello", 1, Some(10)).is_ok());
        assert_eq!(validate_length("", 1, Some(10)).unwrap_err(), "Minimum length is 1");
        assert_eq!(
            validate_length("hello world!", 1, Some(5)).unwrap_err(),
            "Maximum length is 5"
        );
        assert!(validate_length(&"x".repeat(500), 8, None).is_ok());
    }

    #[test]
    fn short_password_reports_only_length() {
        for policy in [RunPolicy::ShortCircuit, RunPolicy::Accumulate] {
            let errors = validate_password_strength("abc", policy).unwrap_err();
            assert_eq!(
                errors,
                vec![FieldError::new(
                    "password",
                    "Password must be at least 8 characters long"
                )]
            );
        }
    }

    #[test]
    fn password_strength_follows_run_policy() {
        let errors = validate_password_strength("abcdefg1", RunPolicy::ShortCircuit).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("uppercase"));

        let errors = validate_password_strength("abcdefg1", RunPolicy::Accumulate).unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Password must contain at least one uppercase letter",
                "Password must contain at least one special character",
            ]
        );
    }

    #[test]
    fn password_with_every_class_passes() {
        assert!(validate_password_strength("Abcdefg1!", RunPolicy::Accumulate).is_ok());
        assert!(validate_password_strength("Zz9{xxxx", RunPolicy::ShortCircuit).is_ok());
    }

    #[test]
    fn username_bounds() {
        assert!(validate_username("ab12").is_err());
        assert!(validate_username("abcdef").is_ok());
    }

    #[test]
    fn confirmation_mismatch_yields_one_error() {
        let mut body = with("password", json!("Secret1!"));
        body["confirmPassword"] = json!("Secret2!");

        let errors = run(RunPolicy::Accumulate, &body);
        assert_eq!(
            errors,
            vec![FieldError::new("confirmPassword", "Passwords do not match")]
        );
    }

    #[test]
    fn omitted_phone_is_fine_and_garbage_phone_is_not() {
        let mut body = body();
        body.as_object_mut().unwrap().remove("phoneNumber");
        assert!(run(RunPolicy::Accumulate, &body).is_empty());

        let errors = run(RunPolicy::Accumulate, &with("phoneNumber", json!("notaphone1")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "phoneNumber");
    }

    #[test]
    fn short_garbage_phone_reports_one_error_under_either_policy() {
        for policy in [RunPolicy::ShortCircuit, RunPolicy::Accumulate] {
            let errors = run(policy, &with("phoneNumber", json!("notaphone")));
            assert_eq!(errors.len(), 1, "policy {}", policy);
            assert_eq!(errors[0].field, "phoneNumber");
        }
    }

    #[test]
    fn full_valid_body_passes() {
        assert!(run(RunPolicy::ShortCircuit, &body()).is_empty());
        assert!(run(RunPolicy::Accumulate, &body()).is_empty());
    }

    #[test]
    fn invalid_email_reported() {
        let errors = run(RunPolicy::ShortCircuit, &with("email", json!("not-an-email")));
        assert_eq!(errors, vec![FieldError::new("email", "Invalid email format")]);
    }

    #[test]
    fn mismatched_confirmation_reported() {
        let errors = run(RunPolicy::ShortCircuit, &with("confirmPassword", json!("Engine1844!")));
        assert_eq!(
            errors,
            vec![FieldError::new("confirmPassword", "Passwords do not match")]
        );
    }

    #[test]
    fn declined_terms_reported() {
        let errors = run(RunPolicy::ShortCircuit, &with("acceptTerms", json!(false)));
        assert_eq!(
            errors,
            vec![FieldError::new(
                "acceptTerms",
                "You must accept the terms and conditions"
            )]
        );
    }

    #[test]
    fn username_with_symbols_reported() {
        let errors = run(RunPolicy::ShortCircuit, &with("username", json!("ada.lovelace")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn bad_phone_reported_and_empty_phone_accepted() {
        let errors = run(RunPolicy::ShortCircuit, &with("phoneNumber", json!("12345abcdef")));
        assert_eq!(
            errors,
            vec![FieldError::new("phoneNumber", "Invalid phone number format")]
        );

        assert!(run(RunPolicy::ShortCircuit, &with("phoneNumber", json!(""))).is_empty());
    }

    #[test]
    fn short_circuit_reports_only_earliest_stage() {
        let mut body = with("email", json!("broken"));
        body["acceptTerms"] = json!(false);
        body["username"] = json!("bad!");

        let errors = run(RunPolicy::ShortCircuit, &body);
        assert_eq!(errors, vec![FieldError::new("email", "Invalid email format")]);
    }

    #[test]
    fn accumulate_reports_every_failing_stage_in_order() {
        let mut body = with("email", json!("broken"));
        body["acceptTerms"] = json!(false);
        body["username"] = json!("bad!user");

        let errors = run(RunPolicy::Accumulate, &body);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "username", "acceptTerms"]);
    }

    #[test]
    fn country_rule_applies_only_to_configured_country() {
        let stage = CountryEmailDomainValidator::new().with_rule("us", &[".com", ".ORG"]);
        let mut chain = ValidationChain::new(RunPolicy::ShortCircuit);
        chain
            .add(crate::validation::requests::RequiredFieldsValidator)
            .add(stage);

        let ok = chain.run(with("email", json!("ada@EXAMPLE.ORG")).to_string().as_bytes());
        assert!(ok.is_valid());

        let rejected = chain.run(with("email", json!("ada@example.io")).to_string().as_bytes());
        assert_eq!(rejected.errors.len(), 1);
        assert_eq!(rejected.errors[0].field, "email");

        let mut other_country = with("country", json!("DE"));
        other_country["email"] = json!("ada@example.io");
        assert!(chain.run(other_country.to_string().as_bytes()).is_valid());
    }
}
