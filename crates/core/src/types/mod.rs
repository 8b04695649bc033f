//! Core types for the skincare admin service.
//!
//! This module provides the schemaless document model and the typed views the
//! admin layer builds on top of it.

pub mod analysis;
pub mod document;
pub mod email;
pub mod field_map;
pub mod product;
pub mod prompt;
pub mod user;
pub mod value;

pub use analysis::SkinAnalysis;
pub use document::Document;
pub use email::{Email, EmailError};
pub use field_map::{FieldMap, PRODUCT_FIELDS};
pub use product::{NewProduct, Product};
pub use prompt::{PromptHistoryEntry, PromptSetting};
pub use user::User;
pub use value::{FieldValue, Fields};
