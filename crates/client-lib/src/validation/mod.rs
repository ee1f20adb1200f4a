// ============================
// crates/client-lib/src/validation/mod.rs
// ============================
//! Credential and form validation.
//!
//! Everything here is pure: no I/O, no logging, no error beyond a boolean or
//! a [`ValidationError`]. Sanitizing is a best-effort markup strip, not a
//! security boundary.

use chrono::{DateTime, Utc};
use nutriplan_common::{Diet, Meal, NewDiet};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;

// Regex patterns for validation
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]+(>|$)").unwrap());
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("Password too short (minimum {min} characters).")]
    PasswordTooShort { min: usize },

    #[error("Invalid name. Letters and spaces only, at least 2 characters.")]
    InvalidName,

    #[error("The diet name and start date are required.")]
    MissingDietName,

    #[error("The end date cannot be before the start date.")]
    InvalidDateRange,

    #[error("Invalid meal: {0}")]
    InvalidMeal(String),
}

impl ValidationError {
    /// True for the errors raised by the email/password checks
    pub fn is_credential_shape(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidEmail | ValidationError::PasswordTooShort { .. }
        )
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Strip anything that looks like a markup tag and trim surrounding whitespace.
///
/// An unterminated tag at the end of the input (`"abc<b"`) is dropped too.
pub fn sanitize(input: &str) -> String {
    TAG_REGEX.replace_all(input, "").trim().to_string()
}

/// Permissive syntactic check: `local@domain.tld` without whitespace.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Length check, counted in characters.
pub fn is_valid_password(password: &str, min_length: usize) -> bool {
    password.chars().count() >= min_length
}

/// ASCII letters and spaces only, 2 to 50 characters.
pub fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) && NAME_REGEX.is_match(name)
}

/// Validate an already-sanitized email/password pair
pub fn validate_credentials(email: &str, password: &str, min_length: usize) -> ValidationResult<()> {
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !is_valid_password(password, min_length) {
        return Err(ValidationError::PasswordTooShort { min: min_length });
    }
    Ok(())
}

/// Validate an already-sanitized display name
pub fn validate_name(name: &str) -> ValidationResult<&str> {
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(ValidationError::InvalidName)
    }
}

/// Validate the diet creation form
pub fn validate_new_diet(diet: &NewDiet) -> ValidationResult<()> {
    validate_diet_fields(&diet.name, diet.start_date, diet.end_date)
}

/// Validate a diet as it would look after an edit
pub fn validate_diet(diet: &Diet) -> ValidationResult<()> {
    validate_diet_fields(&diet.name, diet.start_date, diet.end_date)
}

fn validate_diet_fields(
    name: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingDietName);
    }
    if end.is_some_and(|end| end < start) {
        return Err(ValidationError::InvalidDateRange);
    }
    Ok(())
}

/// Validate a meal before adding it to a weekly menu
pub fn validate_meal(meal: &Meal) -> ValidationResult<()> {
    if meal.name.trim().is_empty() {
        return Err(ValidationError::InvalidMeal("name is required".to_string()));
    }
    if meal.kind.trim().is_empty() {
        return Err(ValidationError::InvalidMeal("meal type is required".to_string()));
    }
    if meal.calories == 0 {
        return Err(ValidationError::InvalidMeal(
            "calories must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
