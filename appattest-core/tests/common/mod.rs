//! In-process fake of the attestation and sign-up API.
//!
//! Binds an axum router to `127.0.0.1:0` and records every call so tests can
//! assert on exactly what reached the server.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use appattest_core::{
    AttestSession, ClientConfig, KeyStore, MemoryKeyStore, MockAttestationProvider,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

pub const VALID_PHONE_CODE: &str = "123456";
pub const VALID_EMAIL_CODE: &str = "654321";
pub const DEVICE_CODE: &str = "DEV-0001";

#[derive(Default)]
struct Inner {
    /// Route names in call order ("challenge", "attest", "secure", ...)
    log: Vec<String>,
    issued_challenges: HashSet<String>,
    consumed_challenges: Vec<String>,
    next_challenge: u32,
    next_token: u32,
    attested_key_ids: Vec<String>,
    /// Forced 401 responses remaining per route
    forced_unauthorized: HashMap<String, usize>,
    fixed_challenge_body: Option<(StatusCode, Value)>,
    /// Challenge fetches still to fail with the given status
    challenge_failures: Option<(StatusCode, usize)>,
    attest_override: Option<(StatusCode, Value)>,
    email_already_valid: bool,
    omit_email_guid: bool,
    empty_details_response: bool,
    details_bodies: Vec<Value>,
}

/// Shared handle to the fake server's recorded state.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn log(&self) -> Vec<String> {
        self.with(|i| i.log.clone())
    }

    /// Calls to `route`, in order, as recorded in the log.
    pub fn calls(&self, route: &str) -> usize {
        self.with(|i| i.log.iter().filter(|r| r.as_str() == route).count())
    }

    /// The log without challenge fetches.
    pub fn log_without_challenges(&self) -> Vec<String> {
        self.with(|i| {
            i.log
                .iter()
                .filter(|r| r.as_str() != "challenge")
                .cloned()
                .collect()
        })
    }

    pub fn consumed_challenges(&self) -> Vec<String> {
        self.with(|i| i.consumed_challenges.clone())
    }

    pub fn attested_key_ids(&self) -> Vec<String> {
        self.with(|i| i.attested_key_ids.clone())
    }

    pub fn details_bodies(&self) -> Vec<Value> {
        self.with(|i| i.details_bodies.clone())
    }

    pub fn force_unauthorized(&self, route: &str, times: usize) {
        self.with(|i| {
            i.forced_unauthorized.insert(route.to_string(), times);
        })
    }

    pub fn set_challenge_response(&self, status: StatusCode, body: Value) {
        self.with(|i| i.fixed_challenge_body = Some((status, body)))
    }

    /// Fail the next `times` challenge fetches with `status`.
    pub fn fail_challenges(&self, status: StatusCode, times: usize) {
        self.with(|i| i.challenge_failures = Some((status, times)))
    }

    pub fn set_attest_response(&self, status: StatusCode, body: Value) {
        self.with(|i| i.attest_override = Some((status, body)))
    }

    pub fn set_email_already_valid(&self, valid: bool) {
        self.with(|i| i.email_already_valid = valid)
    }

    /// Report the email as valid but leave `emailGuid` null.
    pub fn set_omit_email_guid(&self, omit: bool) {
        self.with(|i| i.omit_email_guid = omit)
    }

    pub fn set_empty_details_response(&self, empty: bool) {
        self.with(|i| i.empty_details_response = empty)
    }

    /// Record the call and apply any forced 401 for `route`.
    fn authorize(&self, route: &str, headers: &HeaderMap) -> Option<Response> {
        self.with(|i| {
            i.log.push(route.to_string());

            if let Some(remaining) = i.forced_unauthorized.get_mut(route) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Some(
                        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "expired" })))
                            .into_response(),
                    );
                }
            }

            let bearer_ok = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|token| token.starts_with("token-"))
                .unwrap_or(false);

            if bearer_ok {
                None
            } else {
                Some(
                    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "missing bearer" })))
                        .into_response(),
                )
            }
        })
    }

    /// Mark a base64 challenge as used; false if unknown or already used.
    fn consume_challenge(i: &mut Inner, challenge: &str) -> bool {
        if !i.issued_challenges.contains(challenge) || i.consumed_challenges.iter().any(|c| c == challenge)
        {
            return false;
        }
        i.consumed_challenges.push(challenge.to_string());
        true
    }
}

async fn challenge(State(api): State<FakeApi>) -> Response {
    api.with(|i| {
        i.log.push("challenge".into());
        if let Some((status, remaining)) = &mut i.challenge_failures {
            if *remaining > 0 {
                *remaining -= 1;
                return (*status, "unavailable").into_response();
            }
        }
        if let Some((status, body)) = &i.fixed_challenge_body {
            return (*status, Json(body.clone())).into_response();
        }
        i.next_challenge += 1;
        let encoded = BASE64.encode(format!("challenge-{}", i.next_challenge));
        i.issued_challenges.insert(encoded.clone());
        Json(json!({ "challenge": encoded })).into_response()
    })
}

async fn attest(State(api): State<FakeApi>, Json(body): Json<Value>) -> Response {
    api.with(|i| {
        i.log.push("attest".into());
        if let Some((status, body)) = &i.attest_override {
            return (*status, Json(body.clone())).into_response();
        }

        let challenge = body["challenge"].as_str().unwrap_or_default().to_string();
        let key_id = body["keyId"].as_str().unwrap_or_default().to_string();
        let has_attestation = body["attestationObject"]
            .as_str()
            .map(|a| BASE64.decode(a).is_ok())
            .unwrap_or(false);

        if key_id.is_empty() || !has_attestation || !FakeApi::consume_challenge(i, &challenge) {
            return (StatusCode::BAD_REQUEST, "bad attestation").into_response();
        }

        i.attested_key_ids.push(key_id);
        i.next_token += 1;
        Json(json!({ "jwt": format!("token-{}", i.next_token), "success": true })).into_response()
    })
}

async fn assert_handler(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = api.authorize("assert", &headers) {
        return denied;
    }
    api.with(|i| {
        let challenge = body["challenge"].as_str().unwrap_or_default().to_string();
        if body["assertion"].as_str().is_none() || !FakeApi::consume_challenge(i, &challenge) {
            return (StatusCode::BAD_REQUEST, "bad assertion").into_response();
        }
        Json(json!({ "verified": true })).into_response()
    })
}

async fn secure(State(api): State<FakeApi>, headers: HeaderMap) -> Response {
    if let Some(denied) = api.authorize("secure", &headers) {
        return denied;
    }
    Json(json!({ "message": "secret data" })).into_response()
}

async fn validate_phone(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = api.authorize("validate_phone", &headers) {
        return denied;
    }
    let phone = body["PhoneNumber"].as_str().unwrap_or_default();
    Json(json!({ "phoneNumberGuid": "phone-guid-1", "phoneNumber": phone })).into_response()
}

async fn validate_phone_code(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = api.authorize("validate_phone_code", &headers) {
        return denied;
    }
    let phone = body["PhoneNumber"].as_str().unwrap_or_default();
    let valid = body["PhoneNumberGuid"] == "phone-guid-1" && body["Code"] == VALID_PHONE_CODE;
    let guid = if valid { "valid-phone-guid" } else { "" };
    Json(json!({
        "validPhoneNumberCodeGuid": guid,
        "phoneNumber": phone,
        "isValid": valid
    }))
    .into_response()
}

async fn validate_email(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = api.authorize("validate_email", &headers) {
        return denied;
    }
    let (already_valid, omit_guid) = api.with(|i| (i.email_already_valid, i.omit_email_guid));
    let code = body["ValidationCode"].as_str().unwrap_or_default();
    let phone_guid = body["ValidPhoneNumberCodeGuid"].as_str().unwrap_or_default();

    let valid = if code.is_empty() {
        already_valid
    } else {
        code == VALID_EMAIL_CODE
    };

    let email_guid = if valid && !omit_guid {
        Value::from("email-guid-1")
    } else {
        Value::Null
    };
    Json(json!({
        "isValidEmail": valid,
        "validPhoneNumberCodeGuid": phone_guid,
        "emailGuid": email_guid
    }))
    .into_response()
}

async fn create_details(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = api.authorize("create_details", &headers) {
        return denied;
    }
    let empty = api.with(|i| {
        i.details_bodies.push(body);
        i.empty_details_response
    });
    if empty {
        StatusCode::OK.into_response()
    } else {
        Json(json!({ "deviceCode": DEVICE_CODE })).into_response()
    }
}

/// Start the fake server; returns its handle and base URL.
pub async fn spawn_fake_api() -> (FakeApi, String) {
    let api = FakeApi::default();

    let app = Router::new()
        .route("/api/auth/challenge", get(challenge))
        .route("/api/auth/attest", post(attest))
        .route("/api/auth/assert", post(assert_handler))
        .route("/api/secure", get(secure))
        .route("/api/AppStoreSignUp/ValidatePhoneNumber", put(validate_phone))
        .route(
            "/api/AppStoreSignUp/ValidatePhoneNumberCode",
            put(validate_phone_code),
        )
        .route("/api/AppStoreSignUp/ValidateEmail", put(validate_email))
        .route(
            "/api/AppStoreSignUp/CreateSignUpDetails",
            put(create_details),
        )
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake api");
    let addr = listener.local_addr().expect("fake api address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake api server");
    });

    (api, format!("http://{addr}/api"))
}

/// Session against `base_url` with a fresh mock provider and memory key store.
pub fn session_for(
    base_url: &str,
    provider: Arc<MockAttestationProvider>,
    store: Arc<MemoryKeyStore>,
) -> Arc<AttestSession> {
    let provider: Arc<dyn appattest_core::AttestationProvider> = provider;
    let store: Arc<dyn KeyStore> = store;
    Arc::new(AttestSession::new(ClientConfig::local(base_url), provider, store).expect("session"))
}
