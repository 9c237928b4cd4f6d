//! # Error Types
//!
//! Domain-specific error types for mizhiwu-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mizhiwu-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  ├── ValidationError  - Input shape failures                           │
//! │  └── FieldErrors      - Per-field message lists (what callers see)     │
//! │                                                                         │
//! │  mizhiwu-db errors (separate crate)                                    │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  HTTP errors (in apps/api)                                             │
//! │  └── ApiError         - What the portal frontend sees                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → JSON         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Field Attribution
//! Every rejection is reported against the request field that caused it
//! (`code`, `good`, `owner`, ...). The portal renders these next to the
//! matching form input, so [`CoreError::field`] must stay in sync with the
//! request bodies accepted by the API.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

/// Field name used for errors that do not belong to a single input.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

// =============================================================================
// Core Error
// =============================================================================

/// Business rule rejections.
///
/// The display string of each variant is the exact message returned to the
/// caller, so keep them short and stable.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No invite code matches the submitted token.
    #[error("invite code incorrect")]
    InviteCodeIncorrect,

    /// The invite code exists but was already consumed.
    ///
    /// ## When This Occurs
    /// - The code was used by an earlier registration
    /// - Two registrations raced for the same code and this one lost
    #[error("invite code already used")]
    InviteCodeUsed,

    /// No unused money code matches the submitted token.
    ///
    /// Unknown and already-redeemed codes are deliberately indistinguishable.
    #[error("code incorrect")]
    MoneyCodeIncorrect,

    /// The goods id does not resolve to a catalogue entry.
    #[error("goods not found")]
    GoodsNotFound(String),

    /// The account cannot afford the goods.
    ///
    /// ## User Workflow
    /// ```text
    /// Purchase (price: 30.00)
    ///      │
    ///      ▼
    /// Check balance: 20.00
    ///      │
    ///      ▼
    /// InsufficientBalance { balance: 20.00, price: 30.00 }
    ///      │
    ///      ▼
    /// Portal shows: "insufficient balance" under the goods picker
    /// ```
    #[error("insufficient balance")]
    InsufficientBalance { balance: Money, price: Money },

    /// The owner already holds more invite codes than their cap allows.
    #[error("max invite codes reached")]
    InviteLimitReached {
        owner: String,
        existing: i64,
        cap: i64,
    },

    /// The invite code owner does not exist.
    #[error("user does not exist")]
    OwnerNotFound(String),

    /// Granting the goods would overflow the transfer quota.
    #[error("transfer quota overflow")]
    QuotaOverflow,

    /// Crediting the code would overflow the balance.
    #[error("balance overflow")]
    BalanceOverflow,

    /// No free service port remains above the current maximum.
    #[error("no service port available")]
    PortsExhausted { last: i64 },

    /// The caller may not act on this resource.
    #[error("you do not have permission to perform this action")]
    PermissionDenied,

    /// Several field-level validation failures at once.
    #[error("{0}")]
    Fields(FieldErrors),

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the request field this error is reported against.
    pub fn field(&self) -> &str {
        match self {
            CoreError::InviteCodeIncorrect
            | CoreError::InviteCodeUsed
            | CoreError::MoneyCodeIncorrect
            | CoreError::BalanceOverflow => "code",
            CoreError::GoodsNotFound(_)
            | CoreError::InsufficientBalance { .. }
            | CoreError::QuotaOverflow => "good",
            CoreError::InviteLimitReached { .. } | CoreError::OwnerNotFound(_) => "owner",
            CoreError::PortsExhausted { .. } | CoreError::PermissionDenied | CoreError::Fields(_) => {
                NON_FIELD_ERRORS
            }
            CoreError::Validation(e) => e.field(),
        }
    }

    /// Converts the error into the per-field list the API returns.
    pub fn into_field_errors(self) -> FieldErrors {
        match self {
            CoreError::Fields(errors) => errors,
            other => FieldErrors::single(other.field().to_string(), other.to_string()),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business rules run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., invalid email, non-numeric id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Unique value already taken (username, email).
    #[error("{}", already_exists_message(.field))]
    AlreadyExists { field: String },
}

impl ValidationError {
    /// Returns the field this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::AlreadyExists { field } => field,
        }
    }
}

fn already_exists_message(field: &str) -> String {
    match field {
        "username" => "user already exists".to_string(),
        other => format!("{} already exists", other),
    }
}

// =============================================================================
// Field Errors
// =============================================================================

/// Collected per-field error messages.
///
/// Serialises as `{"field": ["message", ...]}`, the shape the portal
/// frontend already understands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        FieldErrors::default()
    }

    /// Creates a collection holding one message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        errors
    }

    /// Appends a message to a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Records a validation error under its own field.
    pub fn push(&mut self, err: ValidationError) {
        let field = err.field().to_string();
        self.add(field, err.to_string());
    }

    /// Records a rule rejection under its own field.
    pub fn push_core(&mut self, err: CoreError) {
        for (field, messages) in err.into_field_errors().0 {
            for message in messages {
                self.add(field.clone(), message);
            }
        }
    }

    /// Whether any field has errors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the given field has errors.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for a field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when empty, otherwise the collection as an error.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl From<FieldErrors> for CoreError {
    fn from(errors: FieldErrors) -> Self {
        CoreError::Fields(errors)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
