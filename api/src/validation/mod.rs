//! Input Validation Module
//!
//! Registration payloads pass through an ordered [`ValidationChain`] before
//! any business logic runs.
//!
//! # Overview
//!
//! 1. **Chain** - ordered stages plus the run policy (short-circuit or accumulate)
//! 2. **Requests** - the parsing stage that turns raw bytes into a typed request
//! 3. **Validators** - field predicates and the stages built on them
//! 4. **Extractors** - `ValidatedRegistration`, the Axum gate in front of the handler
//!
//! # Usage
//!
//! ```ignore
//! use crate::validation::ValidatedRegistration;
//!
//! pub async fn register(
//!     State(state): State<AppState>,
//!     ValidatedRegistration(req): ValidatedRegistration,
//! ) -> impl IntoResponse {
//!     // req passed every stage
//! }
//! ```
//!
//! Custom stages implement [`Validator`] and are appended with
//! [`ValidationChain::add`]. Stages that inspect fields must treat an empty
//! context as "nothing to check".

pub mod chain;
pub mod context;
pub mod extractors;
pub mod requests;
pub mod validators;

pub use chain::{ChainReport, RunPolicy, StageOutcome, ValidationChain, Validator};
pub use context::ValidationContext;
pub use extractors::{FieldError, ValidatedRegistration, ValidationBuilder, ValidationError};
