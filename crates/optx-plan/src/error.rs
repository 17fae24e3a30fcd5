//! # Plan Errors
//!
//! Every fallible operation in this crate returns [`PlanResult`]. The variants split
//! into two families:
//!
//! - **Caller errors** (`InvalidPayload`, `UnresolvedSlot`): the binder or a rewrite
//!   handed us data that cannot form a valid node. These are reported upstream as
//!   query compilation diagnostics.
//! - **Contract violations** (`ArityMismatch`, `UnknownGroup`, `UnknownExpr`): the
//!   rule engine or memo misused the node contract. These indicate an optimizer bug.
//!
//! Pass-through variants never wrap or translate the errors of their children; a
//! failure deep in the tree surfaces unchanged at the root.

use crate::expr::Slot;
use crate::memo::{ExprId, GroupId};
use crate::plan::PlanType;

/// Errors raised by plan construction, property derivation and the memo.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Variant-specific data is missing or malformed.
    #[error("invalid payload for {plan_type}: {reason}")]
    InvalidPayload { plan_type: PlanType, reason: String },
    /// The number of children does not match the variant's fixed arity.
    #[error("{plan_type} expects {expected} children, got {actual}")]
    ArityMismatch {
        plan_type: PlanType,
        expected: usize,
        actual: usize,
    },
    /// An expression references a slot that no child produces.
    #[error("{plan_type} references slot {slot} not produced by its children")]
    UnresolvedSlot { plan_type: PlanType, slot: Slot },
    /// A group id that does not belong to this memo.
    #[error("unknown memo group {0}")]
    UnknownGroup(GroupId),
    /// A group expression id that does not belong to this memo.
    #[error("unknown memo expression {0}")]
    UnknownExpr(ExprId),
}

impl PlanError {
    pub fn invalid_payload(plan_type: PlanType, reason: impl Into<String>) -> Self {
        PlanError::InvalidPayload {
            plan_type,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the plan crate.
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::SlotId;

    #[test]
    fn test_error_display() {
        let err = PlanError::ArityMismatch {
            plan_type: PlanType::View,
            expected: 1,
            actual: 2,
        };
        assert_eq!(err.to_string(), "LogicalView expects 1 children, got 2");

        let err = PlanError::UnresolvedSlot {
            plan_type: PlanType::Filter,
            slot: Slot::new(SlotId(7), "k"),
        };
        assert!(err.to_string().contains("k#7"));
    }
}
