//! Skincare Admin Core - Shared types library.
//!
//! This crate provides the types shared by the admin service and its tests:
//! - Document values as the remote store returns them ([`FieldValue`], [`Document`])
//! - Typed entity views (users, skin analyses, products, the analysis prompt)
//! - The product field-mapping table between stored labels and normalized names
//!
//! # Architecture
//!
//! The core crate contains only types and pure conversions - no I/O, no HTTP
//! clients, no store access. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Document model, entity views, email and field mapping

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
