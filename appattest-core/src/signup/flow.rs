//! Sign-up wizard state machine.
//!
//! ```text
//! PersonalInfo -> PhoneCodeSent -> EmailPending -> DetailsSubmitted -> Completed
//! ```
//!
//! Steps only advance on an explicit success from the server. Field checks
//! run before any network call, and an operation invoked from the wrong step
//! fails with [`AttestError::InvalidState`] without touching the network.
//! `reset` is the only way back.

use tracing::{info, warn};

use super::api::SignUpApi;
use super::models::CreateSignUpDetailsRequest;
use super::validation;
use crate::error::{AttestError, Result};

/// Message shown when the server rejects a phone or email code.
pub const INVALID_CODE_MESSAGE: &str = "Invalid code. Please try again.";

/// Position in the sign-up wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpStep {
    /// Collecting name and phone number.
    PersonalInfo,
    /// A phone code was sent and awaits verification.
    PhoneCodeSent,
    /// Phone verified; email code being requested and verified.
    EmailPending,
    /// Email verified; account details are submitted from here.
    DetailsSubmitted,
    /// The account was created.
    Completed,
}

impl SignUpStep {
    /// 1-based position, for progress display.
    pub fn number(self) -> u8 {
        match self {
            Self::PersonalInfo => 1,
            Self::PhoneCodeSent => 2,
            Self::EmailPending => 3,
            Self::DetailsSubmitted => 4,
            Self::Completed => 5,
        }
    }
}

impl std::fmt::Display for SignUpStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonalInfo => write!(f, "Personal Information"),
            Self::PhoneCodeSent => write!(f, "Phone Verification"),
            Self::EmailPending => write!(f, "Email Verification"),
            Self::DetailsSubmitted => write!(f, "Company Information"),
            Self::Completed => write!(f, "Sign Up Complete"),
        }
    }
}

/// Data accumulated across the steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpProgress {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub phone_number_guid: Option<String>,
    pub valid_phone_number_code_guid: Option<String>,
    pub email: Option<String>,
    pub email_code_sent: bool,
    pub email_guid: Option<String>,
    pub device_code: Option<String>,
}

/// Free-form account fields for the final step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDetails {
    pub company_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// One sign-up attempt.
pub struct SignUpFlow {
    api: SignUpApi,
    step: SignUpStep,
    progress: SignUpProgress,
    status: String,
}

impl SignUpFlow {
    pub fn new(api: SignUpApi) -> Self {
        Self {
            api,
            step: SignUpStep::PersonalInfo,
            progress: SignUpProgress::default(),
            status: String::new(),
        }
    }

    pub fn step(&self) -> SignUpStep {
        self.step
    }

    pub fn progress(&self) -> &SignUpProgress {
        &self.progress
    }

    /// Short human-readable result of the last action.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Discard all progress and start over.
    pub fn reset(&mut self) {
        info!(from = %self.step, "Sign-up reset");
        self.step = SignUpStep::PersonalInfo;
        self.progress = SignUpProgress::default();
        self.status.clear();
    }

    /// Validate name and phone, then request a phone verification code.
    pub async fn submit_personal_info(
        &mut self,
        first_name: &str,
        last_name: &str,
        phone_number: &str,
    ) -> Result<()> {
        self.expect_step(SignUpStep::PersonalInfo)?;
        self.check(validation::validate_name(first_name, last_name))?;
        self.check(validation::validate_phone_number(phone_number))?;

        let response = match self.api.issue_phone_validation(phone_number).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail("Failed to send validation code", e)),
        };

        self.progress.first_name = first_name.trim().to_string();
        self.progress.last_name = last_name.trim().to_string();
        self.progress.phone_number = phone_number.to_string();
        self.progress.phone_number_guid = Some(response.phone_number_guid);
        self.advance(SignUpStep::PhoneCodeSent);
        self.status = format!("We sent a verification code to {phone_number}.");
        Ok(())
    }

    /// Ask for another phone code. Explicit user action; never automatic.
    pub async fn resend_phone_code(&mut self) -> Result<()> {
        self.expect_step(SignUpStep::PhoneCodeSent)?;
        let phone_number = self.progress.phone_number.clone();

        match self.api.issue_phone_validation(&phone_number).await {
            Ok(response) => {
                self.progress.phone_number_guid = Some(response.phone_number_guid);
                self.status = format!("We sent a new code to {phone_number}.");
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to send validation code", e)),
        }
    }

    /// Verify the phone code. Advances only when the server says it is valid.
    pub async fn verify_phone_code(&mut self, code: &str) -> Result<()> {
        self.expect_step(SignUpStep::PhoneCodeSent)?;
        self.check(validation::validate_code(code))?;

        let guid = self.progress.phone_number_guid.clone().unwrap_or_default();
        let phone_number = self.progress.phone_number.clone();

        let response = match self
            .api
            .validate_phone_code(&guid, &phone_number, code)
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail("Failed to validate code", e)),
        };

        if !response.is_valid {
            return Err(self.reject());
        }
        if response.valid_phone_number_code_guid.is_empty() {
            return Err(self.fail(
                "Failed to validate code",
                AttestError::protocol("Valid phone code response has no validPhoneNumberCodeGuid"),
            ));
        }

        self.progress.valid_phone_number_code_guid = Some(response.valid_phone_number_code_guid);
        self.advance(SignUpStep::EmailPending);
        self.status = "Phone number verified.".to_string();
        Ok(())
    }

    /// Send (or resend) an email code to `email`.
    ///
    /// If the server reports the address as already validated the flow
    /// moves straight on.
    pub async fn request_email_code(&mut self, email: &str) -> Result<()> {
        self.expect_step(SignUpStep::EmailPending)?;
        self.check(validation::validate_email(email))?;

        let phone_code_guid = self
            .progress
            .valid_phone_number_code_guid
            .clone()
            .unwrap_or_default();

        let response = match self
            .api
            .issue_or_validate_email(&phone_code_guid, email, "")
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail("Failed to send email code", e)),
        };

        if response.is_valid_email {
            let Some(email_guid) = response.email_guid.filter(|g| !g.is_empty()) else {
                return Err(self.fail(
                    "Failed to send email code",
                    AttestError::protocol("Valid email response has no emailGuid"),
                ));
            };
            self.progress.email = Some(email.to_string());
            self.progress.email_code_sent = true;
            self.progress.email_guid = Some(email_guid);
            self.advance(SignUpStep::DetailsSubmitted);
            self.status = "Email already validated".to_string();
        } else {
            self.progress.email = Some(email.to_string());
            self.progress.email_code_sent = true;
            self.status = format!("We sent a code to {email}.");
        }
        Ok(())
    }

    /// Verify the email code. Advances only on `isValidEmail`.
    pub async fn verify_email_code(&mut self, code: &str) -> Result<()> {
        self.expect_step(SignUpStep::EmailPending)?;
        let email = match (&self.progress.email, self.progress.email_code_sent) {
            (Some(email), true) => email.clone(),
            _ => {
                let err = AttestError::InvalidState("Request an email code first".into());
                self.status = err.status_line();
                return Err(err);
            }
        };
        self.check(validation::validate_code(code))?;

        let phone_code_guid = self
            .progress
            .valid_phone_number_code_guid
            .clone()
            .unwrap_or_default();

        let response = match self
            .api
            .issue_or_validate_email(&phone_code_guid, &email, code)
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail("Failed to validate email", e)),
        };

        if !response.is_valid_email {
            return Err(self.reject());
        }
        let Some(email_guid) = response.email_guid.filter(|g| !g.is_empty()) else {
            return Err(self.fail(
                "Failed to validate email",
                AttestError::protocol("Valid email response has no emailGuid"),
            ));
        };

        self.progress.email_guid = Some(email_guid);
        self.advance(SignUpStep::DetailsSubmitted);
        self.status = "Email verified.".to_string();
        Ok(())
    }

    /// Submit the account details with the accumulated verification ids.
    ///
    /// A 401 here gets the session's single re-authentication and retry.
    pub async fn submit_details(&mut self, details: &AccountDetails) -> Result<()> {
        self.expect_step(SignUpStep::DetailsSubmitted)?;
        self.check(validation::validate_address(
            &details.company_name,
            &details.address_line1,
            &details.city,
            &details.state,
            &details.zip_code,
        ))?;

        let (phone_code_guid, email_guid) = match (
            &self.progress.valid_phone_number_code_guid,
            &self.progress.email_guid,
        ) {
            (Some(phone), Some(email)) => (phone.clone(), email.clone()),
            _ => {
                let err = AttestError::InvalidState(
                    "Phone and email must both be verified before submitting details".into(),
                );
                self.status = err.status_line();
                return Err(err);
            }
        };

        let request = CreateSignUpDetailsRequest {
            first_name: self.progress.first_name.clone(),
            last_name: self.progress.last_name.clone(),
            company_name: details.company_name.trim().to_string(),
            address_line1: details.address_line1.trim().to_string(),
            address_line2: details.address_line2.trim().to_string(),
            city: details.city.trim().to_string(),
            state: details.state.clone(),
            zip_code: details.zip_code.clone(),
            valid_phone_number_code_guid: phone_code_guid,
            valid_email_code_guid: email_guid,
        };

        let response = match self.api.create_sign_up_details(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail("Failed to complete sign up", e)),
        };

        self.progress.device_code = response.device_code;
        self.advance(SignUpStep::Completed);
        self.status = "Sign up completed successfully!".to_string();
        Ok(())
    }

    fn expect_step(&mut self, expected: SignUpStep) -> Result<()> {
        if self.step == expected {
            return Ok(());
        }
        let err = AttestError::InvalidState(format!(
            "Expected step '{expected}', currently at '{}'",
            self.step
        ));
        self.status = err.status_line();
        Err(err)
    }

    fn check(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.status = e.status_line();
        }
        result
    }

    fn advance(&mut self, next: SignUpStep) {
        info!(from = %self.step, to = %next, "Sign-up step advanced");
        self.step = next;
    }

    fn reject(&mut self) -> AttestError {
        warn!(step = %self.step, "Server rejected verification code");
        self.status = INVALID_CODE_MESSAGE.to_string();
        AttestError::CodeRejected(INVALID_CODE_MESSAGE.to_string())
    }

    fn fail(&mut self, context: &str, err: AttestError) -> AttestError {
        warn!(step = %self.step, error = %err, "{context}");
        self.status = format!("{context}: {}", err.status_line());
        err
    }
}
