//! # Validation Module
//!
//! Input shape checks, run before any rule touches the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (apps/api)                                      │
//! │  ├── JSON deserialisation                                              │
//! │  └── THIS MODULE: shape of every field                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger (mizhiwu-db)                                          │
//! │  ├── lookups: invite code, username/email taken                        │
//! │  └── rules: crate::rules                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE(username), UNIQUE(email), UNIQUE(port), UNIQUE(code)       │
//! │  └── conditional UPDATEs on the one-shot latches                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registration reports every field at once, so [`validate_registration`]
//! collects into [`FieldErrors`] instead of stopping at the first failure.

use crate::error::{FieldErrors, ValidationError};
use crate::types::RegistrationForm;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Message shown when the invite code field is left blank.
pub const MISSING_INVITE_CODE: &str = "please enter an invite code";

const USERNAME_MAX: usize = 150;
const EMAIL_MAX: usize = 254;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 128;
const CODE_MAX: usize = 64;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

// =============================================================================
// Account Fields
// =============================================================================

/// Validates a username.
///
/// ## Rules
/// - 1 to 150 characters
/// - Letters, digits and `@ . + - _` only
///
/// ## Example
/// ```rust
/// use mizhiwu_core::validation::validate_username;
///
/// assert!(validate_username("alice_01").is_ok());
/// assert!(validate_username("").is_err());
/// assert!(validate_username("has space").is_err());
/// ```
pub fn validate_username(username: &str) -> ValidationResult<()> {
    if username.trim().is_empty() {
        return Err(required("username"));
    }

    if username.chars().count() > USERNAME_MAX {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: USERNAME_MAX,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "use only letters, digits and @/./+/-/_".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Syntactic only: one `@`, a non-empty local part and a dotted domain.
///
/// ## Example
/// ```rust
/// use mizhiwu_core::validation::validate_email;
///
/// assert!(validate_email("alice@example.com").is_ok());
/// assert!(validate_email("alice@localhost").is_err());
/// assert!(validate_email("not-an-email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(required("email"));
    }

    if email.len() > EMAIL_MAX {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: EMAIL_MAX,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "enter a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let labels_ok = domain.split('.').count() >= 2 && domain.split('.').all(|label| !label.is_empty());
    if !labels_ok {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a password.
///
/// ## Rules
/// - 6 to 128 characters
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(required("password"));
    }

    let len = password.chars().count();
    if len < PASSWORD_MIN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: PASSWORD_MIN,
        });
    }

    if len > PASSWORD_MAX {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: PASSWORD_MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Code & Reference Fields
// =============================================================================

/// Validates a submitted code token (invite or money code) and returns it
/// trimmed.
///
/// `field` names the request field so the error lands next to the right
/// input.
pub fn validate_code(field: &str, code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(required(field));
    }

    if code.len() > CODE_MAX {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: CODE_MAX,
        });
    }

    Ok(code.to_string())
}

/// Parses a goods reference.
///
/// Returns `None` for anything that is not an integer id. The purchase flow
/// reports that as "goods not found", the same as an unknown id.
///
/// ## Example
/// ```rust
/// use mizhiwu_core::validation::parse_goods_id;
///
/// assert_eq!(parse_goods_id(" 3 "), Some(3));
/// assert_eq!(parse_goods_id("abc"), None);
/// ```
pub fn parse_goods_id(good: &str) -> Option<i64> {
    good.trim().parse::<i64>().ok()
}

/// Validates a username used as an invite code owner.
pub fn validate_owner(owner: &str) -> ValidationResult<String> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(required("owner"));
    }
    Ok(owner.to_string())
}

// =============================================================================
// Registration
// =============================================================================

/// Shape-checks a registration form, collecting every failure.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sign up                                                                │
/// │                                                                         │
/// │  { username, email, password, code }                                   │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_registration ← THIS FUNCTION (shape only)                    │
/// │       │                                                                 │
/// │       ├── any field bad? → 400 { "field": ["msg"], ... }               │
/// │       │                                                                 │
/// │       └── OK → ledger: code lookup, uniqueness, insert                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_registration(form: &RegistrationForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Err(e) = validate_username(&form.username) {
        errors.push(e);
    }
    if let Err(e) = validate_email(&form.email) {
        errors.push(e);
    }
    if let Err(e) = validate_password(&form.password) {
        errors.push(e);
    }
    match validate_code("code", &form.code) {
        Ok(_) => {}
        Err(ValidationError::Required { .. }) => errors.add("code", MISSING_INVITE_CODE),
        Err(e) => errors.push(e),
    }

    errors.into_result()
}

// =============================================================================
// Unit Tests
// =============================================================================
