//! Business logic services for admin.
//!
//! # Services
//!
//! - `accounts` - Account creation through the identity API
//! - `analytics` - Dashboard counters, daily trends and popular products
//! - `collections` - Raw collection and document browser
//! - `csv_import` - Bulk product upsert from CSV
//! - `export` - Users joined with their latest analysis, as CSV
//! - `prompts` - Analysis prompt updates with history retention

pub mod accounts;
pub mod analytics;
pub mod collections;
pub mod csv_import;
pub mod export;
pub mod prompts;

pub use accounts::{AccountError, AccountProvider, CreateUserRequest, IdentityClient};
pub use csv_import::{ImportError, ImportReport};
pub use export::{ExportError, ExportRequest};
pub use prompts::PromptError;

use skincare_admin_core::EmailError;
use thiserror::Error;

/// Input rejected before any store or identity call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("{0} is required")]
    Required(&'static str),

    #[error("New prompt is identical to the current one")]
    Unchanged,
}
