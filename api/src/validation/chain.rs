//! Ordered validation pipeline
//!
//! A [`ValidationChain`] holds a list of [`Validator`] stages and runs them in
//! insertion order over the raw request body. The first stage is expected to
//! parse the body and deposit the typed request into the run's
//! [`ValidationContext`]; the stages after it inspect that request.

use std::fmt;
use std::str::FromStr;

use shared::RegistrationRequest;

use super::context::ValidationContext;
use super::extractors::{FieldError, ValidationError};
use super::requests::RequiredFieldsValidator;
use super::validators::{
    CountryEmailDomainValidator, EmailFormatValidator, PasswordMatchValidator,
    PasswordStrengthValidator, PhoneNumberValidator, TermsAcceptanceValidator,
    UsernameFormatValidator,
};

/// How a run reacts to a failing stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPolicy {
    /// Stop at the first stage that reports errors
    #[default]
    ShortCircuit,
    /// Run every stage and report everything
    Accumulate,
}

impl fmt::Display for RunPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPolicy::ShortCircuit => write!(f, "short-circuit"),
            RunPolicy::Accumulate => write!(f, "accumulate"),
        }
    }
}

impl FromStr for RunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short-circuit" | "short_circuit" | "shortcircuit" => Ok(RunPolicy::ShortCircuit),
            "accumulate" => Ok(RunPolicy::Accumulate),
            other => Err(format!(
                "unknown validation policy '{}', expected 'short-circuit' or 'accumulate'",
                other
            )),
        }
    }
}

/// What a single stage produced
#[derive(Debug, Default)]
pub struct StageOutcome {
    pub errors: Vec<FieldError>,
    /// Typed request produced by a parsing stage
    pub parsed: Option<RegistrationRequest>,
}

impl StageOutcome {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn fail(errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            parsed: None,
        }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::fail(vec![FieldError::new(field, message)])
    }

    pub fn parsed(request: RegistrationRequest) -> Self {
        Self {
            errors: vec![],
            parsed: Some(request),
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl From<Result<(), Vec<FieldError>>> for StageOutcome {
    fn from(result: Result<(), Vec<FieldError>>) -> Self {
        match result {
            Ok(()) => StageOutcome::pass(),
            Err(errors) => StageOutcome::fail(errors),
        }
    }
}

/// One stage of the chain.
///
/// Stages are shared across concurrent requests, so they hold no per-request
/// state; everything a run needs lives in the context.
pub trait Validator: Send + Sync {
    /// Short stable name used in logs
    fn name(&self) -> &'static str;

    fn validate(&self, raw: &[u8], ctx: &ValidationContext) -> StageOutcome;
}

/// Result of running the chain once
#[derive(Debug)]
pub struct ChainReport {
    pub errors: Vec<FieldError>,
    pub context: ValidationContext,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Ordered list of validation stages
pub struct ValidationChain {
    validators: Vec<Box<dyn Validator>>,
    policy: RunPolicy,
}

impl ValidationChain {
    pub fn new(policy: RunPolicy) -> Self {
        Self {
            validators: Vec::new(),
            policy,
        }
    }

    /// The registration pipeline in its fixed order
    pub fn registration(policy: RunPolicy) -> Self {
        let mut chain = Self::new(policy);
        chain
            .add(RequiredFieldsValidator)
            .add(EmailFormatValidator)
            .add(PasswordStrengthValidator)
            .add(PasswordMatchValidator)
            .add(UsernameFormatValidator)
            .add(TermsAcceptanceValidator)
            .add(PhoneNumberValidator)
            .add(CountryEmailDomainValidator::new());
        chain
    }

    /// Appends a stage; stages run in the order they were added
    pub fn add<V>(&mut self, validator: V) -> &mut Self
    where
        V: Validator + 'static,
    {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Runs every stage over `raw` with a fresh context
    pub fn run(&self, raw: &[u8]) -> ChainReport {
        let mut context = ValidationContext::new(self.policy);
        let mut errors = Vec::new();

        for validator in &self.validators {
            let StageOutcome {
                errors: stage_errors,
                parsed,
            } = validator.validate(raw, &context);

            if stage_errors.is_empty() {
                if let Some(request) = parsed {
                    if !context.populate(request) {
                        tracing::warn!(
                            stage = validator.name(),
                            "context already populated, ignoring parsed request"
                        );
                    }
                }
                continue;
            }

            tracing::debug!(
                stage = validator.name(),
                error_count = stage_errors.len(),
                "validation stage failed"
            );
            errors.extend(stage_errors);

            if self.policy == RunPolicy::ShortCircuit {
                break;
            }
        }

        ChainReport { errors, context }
    }

    /// Runs the chain and yields the typed request only when it is fully valid
    pub fn gate(&self, raw: &[u8]) -> Result<RegistrationRequest, ValidationError> {
        let report = self.run(raw);
        if !report.is_valid() {
            return Err(ValidationError::new(report.errors));
        }

        report
            .context
            .into_request()
            .ok_or_else(|| ValidationError::single("body", "Invalid request data"))
    }
}

impl fmt::Debug for ValidationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationChain")
            .field("policy", &self.policy)
            .field("stages", &self.stage_names())
            .finish()
    }
}
