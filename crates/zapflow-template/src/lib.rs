// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template parameter resolution for the Zapflow campaign engine.
//!
//! [`schema`] scans a template's components for `{{N}}` slots, [`resolver`]
//! binds contact and campaign data onto them with strict count validation,
//! [`validate`] aggregates resolutions over a batch, and [`render`] produces
//! the plain-text copy stored in the inbox.

pub mod render;
pub mod resolver;
pub mod schema;
pub mod validate;

pub use render::render_text;
pub use resolver::{Resolution, ResolveInput, ResolveIssue, Resolver, SlotDiagnostic};
pub use schema::{Section, SlotKey, TemplateSchema, scan_placeholders};
pub use validate::{ContactReport, ValidationReport, validate_contacts};
