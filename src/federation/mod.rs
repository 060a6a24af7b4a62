// SPDX-License-Identifier: Apache-2.0

//! Federated queries
//!
//! The federation engine plans and executes the cross-store joins; this
//! module owns the fixed queries, checks their catalog references and prints
//! what comes back.

pub mod parser;
pub mod queries;
pub mod runner;

pub use parser::{validate_catalog_refs, QualifiedName};
pub use queries::{standard_queries, CatalogLayout, FederatedQuery, JoinStyle};
pub use runner::{render, run_queries, OutputFormat, QueryOutcome};
