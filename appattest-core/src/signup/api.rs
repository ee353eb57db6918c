//! Typed wrappers over the authenticated sign-up endpoints.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::models::{
    CreateSignUpDetailsRequest, CreateSignUpDetailsResponse, ValidateEmailRequest,
    ValidateEmailResponse, ValidatePhoneNumberCodeRequest, ValidatePhoneNumberCodeResponse,
    ValidatePhoneNumberRequest, ValidatePhoneNumberResponse,
};
use crate::error::Result;
use crate::http_client::ApiRequest;
use crate::session::AttestSession;

pub const VALIDATE_PHONE_ROUTE: &str = "AppStoreSignUp/ValidatePhoneNumber";
pub const VALIDATE_PHONE_CODE_ROUTE: &str = "AppStoreSignUp/ValidatePhoneNumberCode";
pub const VALIDATE_EMAIL_ROUTE: &str = "AppStoreSignUp/ValidateEmail";
pub const CREATE_DETAILS_ROUTE: &str = "AppStoreSignUp/CreateSignUpDetails";

/// Sign-up endpoints, all called through the session's 401 policy.
#[derive(Clone)]
pub struct SignUpApi {
    session: Arc<AttestSession>,
}

impl SignUpApi {
    pub fn new(session: Arc<AttestSession>) -> Self {
        Self { session }
    }

    /// Ask the server to text a verification code to `phone_number`.
    #[instrument(level = "debug", skip(self))]
    pub async fn issue_phone_validation(
        &self,
        phone_number: &str,
    ) -> Result<ValidatePhoneNumberResponse> {
        let body = ValidatePhoneNumberRequest {
            phone_number: phone_number.to_string(),
        };
        self.put(VALIDATE_PHONE_ROUTE, &body).await
    }

    #[instrument(level = "debug", skip(self, code))]
    pub async fn validate_phone_code(
        &self,
        phone_number_guid: &str,
        phone_number: &str,
        code: &str,
    ) -> Result<ValidatePhoneNumberCodeResponse> {
        let body = ValidatePhoneNumberCodeRequest {
            phone_number_guid: phone_number_guid.to_string(),
            phone_number: phone_number.to_string(),
            code: code.to_string(),
        };
        self.put(VALIDATE_PHONE_CODE_ROUTE, &body).await
    }

    /// Empty `validation_code` issues a code; non-empty validates it.
    #[instrument(level = "debug", skip(self, validation_code))]
    pub async fn issue_or_validate_email(
        &self,
        valid_phone_number_code_guid: &str,
        email: &str,
        validation_code: &str,
    ) -> Result<ValidateEmailResponse> {
        let body = ValidateEmailRequest {
            valid_phone_number_code_guid: valid_phone_number_code_guid.to_string(),
            email: email.to_string(),
            validation_code: validation_code.to_string(),
        };
        self.put(VALIDATE_EMAIL_ROUTE, &body).await
    }

    /// Submit the account details. The server may answer with an empty body.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_sign_up_details(
        &self,
        request: &CreateSignUpDetailsRequest,
    ) -> Result<CreateSignUpDetailsResponse> {
        let response = self
            .session
            .call_authenticated(ApiRequest::put_json(CREATE_DETAILS_ROUTE, request)?)
            .await?;

        if response.is_empty() {
            debug!("Sign-up details accepted with empty body");
            return Ok(CreateSignUpDetailsResponse::default());
        }
        response.json()
    }

    async fn put<B: Serialize, R: DeserializeOwned>(&self, route: &str, body: &B) -> Result<R> {
        let response = self
            .session
            .call_authenticated(ApiRequest::put_json(route, body)?)
            .await?;
        response.json()
    }
}
