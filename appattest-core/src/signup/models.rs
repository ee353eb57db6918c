//! Request and response bodies for the `AppStoreSignUp/*` endpoints.
//!
//! Requests use PascalCase keys, responses camelCase, matching the server.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidatePhoneNumberRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePhoneNumberResponse {
    pub phone_number_guid: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidatePhoneNumberCodeRequest {
    pub phone_number_guid: String,
    pub phone_number: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePhoneNumberCodeResponse {
    #[serde(default)]
    pub valid_phone_number_code_guid: String,
    #[serde(default)]
    pub phone_number: String,
    pub is_valid: bool,
}

/// An empty `validation_code` asks the server to send a code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidateEmailRequest {
    pub valid_phone_number_code_guid: String,
    pub email: String,
    pub validation_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateEmailResponse {
    pub is_valid_email: bool,
    #[serde(default)]
    pub valid_phone_number_code_guid: String,
    #[serde(default)]
    pub email_guid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSignUpDetailsRequest {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub valid_phone_number_code_guid: String,
    pub valid_email_code_guid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSignUpDetailsResponse {
    #[serde(default)]
    pub device_code: Option<String>,
}
