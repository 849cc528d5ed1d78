//! Per-run state shared by the stages of one validation pass

use shared::RegistrationRequest;

use super::chain::RunPolicy;

/// State owned by a single chain run.
///
/// A fresh context is created for every request. The typed request starts out
/// absent and is deposited exactly once by the parsing stage; later stages
/// only read it.
#[derive(Debug)]
pub struct ValidationContext {
    policy: RunPolicy,
    request: Option<RegistrationRequest>,
}

impl ValidationContext {
    pub fn new(policy: RunPolicy) -> Self {
        Self {
            policy,
            request: None,
        }
    }

    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    /// The parsed request, if the parsing stage has run and succeeded
    pub fn request(&self) -> Option<&RegistrationRequest> {
        self.request.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.request.is_some()
    }

    /// Stores the parsed request. Returns false and leaves the context
    /// untouched when a request is already present.
    pub(crate) fn populate(&mut self, request: RegistrationRequest) -> bool {
        if self.request.is_some() {
            return false;
        }
        self.request = Some(request);
        true
    }

    pub fn into_request(self) -> Option<RegistrationRequest> {
        self.request
    }
}
