//! Account sign-up over attested sessions.
//!
//! - [`api`] - typed calls to the `AppStoreSignUp/*` endpoints
//! - [`flow`] - the step-by-step wizard built on top of them
//! - [`validation`] - client-side field checks

pub mod api;
pub mod flow;
pub mod models;
pub mod validation;

pub use api::SignUpApi;
pub use flow::{AccountDetails, SignUpFlow, SignUpProgress, SignUpStep, INVALID_CODE_MESSAGE};
