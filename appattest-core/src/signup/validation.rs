//! Client-side field validation
//!
//! Every check here runs before the corresponding network call so bad input
//! never costs a round trip.

use crate::error::{AttestError, Result};

/// Required phone number length (US, no country code)
pub const PHONE_DIGITS: usize = 10;

/// Required ZIP code length
pub const ZIP_DIGITS: usize = 5;

/// Longest verification code the server issues
pub const MAX_CODE_DIGITS: usize = 10;

/// US state postal codes accepted for the account address
pub const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS",
    "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY",
    "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV",
    "WI", "WY",
];

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Validates a phone number: exactly 10 ASCII digits.
pub fn validate_phone_number(phone: &str) -> Result<()> {
    if phone.len() == PHONE_DIGITS && all_digits(phone) {
        Ok(())
    } else {
        Err(AttestError::validation(
            "Please enter a valid 10-digit phone number",
        ))
    }
}

/// Validates first and last name are present.
pub fn validate_name(first_name: &str, last_name: &str) -> Result<()> {
    if is_blank(first_name) {
        return Err(AttestError::validation("First name is required"));
    }
    if is_blank(last_name) {
        return Err(AttestError::validation("Last name is required"));
    }
    Ok(())
}

/// Validates a verification code: 1 to 10 digits.
pub fn validate_code(code: &str) -> Result<()> {
    if code.len() <= MAX_CODE_DIGITS && all_digits(code) {
        Ok(())
    } else {
        Err(AttestError::validation("Please enter the numeric code you received"))
    }
}

/// Validates an email address against
/// `^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$` (case-insensitive).
pub fn validate_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AttestError::validation("Please enter a valid email address"))
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._%+-".contains(&b));
    if !local_ok {
        return false;
    }

    // The domain part may not contain another '@'; the TLD is the text after the last dot
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let host_ok = !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-');
    let tld_ok = tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic());

    host_ok && tld_ok
}

/// Validates the account address fields of the final step.
pub fn validate_address(
    company_name: &str,
    address_line1: &str,
    city: &str,
    state: &str,
    zip_code: &str,
) -> Result<()> {
    if is_blank(company_name) {
        return Err(AttestError::validation("Company name is required"));
    }
    if is_blank(address_line1) {
        return Err(AttestError::validation("Address line 1 is required"));
    }
    if is_blank(city) {
        return Err(AttestError::validation("City is required"));
    }
    if !US_STATES.contains(&state) {
        return Err(AttestError::validation(format!(
            "Unknown state '{state}'. Use a two-letter US postal code"
        )));
    }
    if zip_code.len() != ZIP_DIGITS || !all_digits(zip_code) {
        return Err(AttestError::validation("Please enter a valid 5-digit ZIP code"));
    }
    Ok(())
}
