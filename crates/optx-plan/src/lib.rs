//! # optx-plan: Logical Plan Node Contract
//!
//! This crate defines the logical plan nodes of the optx Cascades optimizer and the
//! contract every node variant satisfies so the memo and the rule engine can treat
//! them uniformly.
//!
//! ## Module Overview
//!
//! - **`plan`**: The closed family of plan variants (scan, filter, project, join,
//!   aggregate, limit, view reference), node identity, lazy logical properties and
//!   immutable children replacement.
//! - **`properties`**: Logical properties: output slots, functional dependencies and
//!   dependency items.
//! - **`expr`**: Slots and scalar expressions owned by plan nodes.
//! - **`catalog`**: Catalog trait and handles to tables and stored views.
//! - **`memo`**: Groups of equivalent expressions, deduplication and group links.
//! - **`visitor`**: Double dispatch from a node to a per-variant handler.
//! - **`pattern`**: Declarative pattern matching for rule applicability checks.
//! - **`rule`**: The Rule trait and RuleRegistry.
//! - **`error`**: `PlanError` and the `PlanResult` alias.

pub mod catalog;
pub mod error;
pub mod expr;
pub mod memo;
pub mod pattern;
pub mod plan;
pub mod properties;
pub mod rule;
pub mod visitor;

pub use error::{PlanError, PlanResult};
pub use plan::{LogicalOp, PlanNode, PlanRef, PlanType};
