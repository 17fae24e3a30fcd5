//! Binary join.
//!
//! Which dependencies survive a join depends on the join type:
//!
//! - **Inner / Cross**: every row of the output is a left row glued to a right row, so
//!   both sides' dependencies hold. Equi-conditions add `l <-> r`.
//! - **Left / Right outer**: only the preserved side keeps its dependencies; the other
//!   side may be NULL-padded.
//! - **Semi / Anti**: the output is a subset of the left rows.
//! - **Full outer**: nothing is preserved.
//!
//! A side's unique keys additionally require that each of its rows matches at most one
//! row of the other side, i.e. the other side's join keys are unique there.

use super::{
    check_resolved, supplied_ids, write_label, ListDisplay, OutputSupplier, PlanRef, PlanType,
};
use crate::error::{PlanError, PlanResult};
use crate::expr::{Expr, JoinType, Slot, SlotId};
use crate::properties::{
    restrict_items, FdItem, FdItems, FunctionalDependencies, LogicalProperties,
};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalJoin {
    join_type: JoinType,
    conditions: Vec<Expr>,
}

impl LogicalJoin {
    pub fn new(join_type: JoinType, conditions: Vec<Expr>) -> Self {
        let conditions = conditions
            .iter()
            .flat_map(|c| c.conjuncts())
            .cloned()
            .collect();
        Self {
            join_type,
            conditions,
        }
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn conditions(&self) -> &[Expr] {
        &self.conditions
    }

    pub(super) fn validate(&self) -> PlanResult<()> {
        if self.join_type == JoinType::Cross && !self.conditions.is_empty() {
            return Err(PlanError::invalid_payload(
                PlanType::Join,
                "cross join can not carry join conditions",
            ));
        }
        Ok(())
    }

    /// `(left slot, right slot)` pairs from `l = r` conditions.
    fn equi_keys(
        &self,
        left: &BTreeSet<SlotId>,
        right: &BTreeSet<SlotId>,
    ) -> Vec<(SlotId, SlotId)> {
        self.conditions
            .iter()
            .filter_map(|c| c.equality_operands())
            .filter_map(|(a, b)| match (a.as_slot(), b.as_slot()) {
                (Some(a), Some(b)) if left.contains(&a.id) && right.contains(&b.id) => {
                    Some((a.id, b.id))
                }
                (Some(a), Some(b)) if left.contains(&b.id) && right.contains(&a.id) => {
                    Some((b.id, a.id))
                }
                _ => None,
            })
            .collect()
    }

    /// Whether each left row, and each right row, appears at most once in the output.
    fn matches_once(&self, lp: &LogicalProperties, rp: &LogicalProperties) -> (bool, bool) {
        let keys = self.equi_keys(&lp.output_ids(), &rp.output_ids());
        let left_keys: BTreeSet<SlotId> = keys.iter().map(|(l, _)| *l).collect();
        let right_keys: BTreeSet<SlotId> = keys.iter().map(|(_, r)| *r).collect();
        (
            rp.func_deps.is_unique(&right_keys),
            lp.func_deps.is_unique(&left_keys),
        )
    }

    pub(super) fn compute_output(&self, left: &PlanRef, right: &PlanRef) -> PlanResult<Vec<Slot>> {
        let left_out = left.output()?;
        let right_out = right.output()?;
        let both: Vec<Slot> = left_out.iter().chain(right_out.iter()).cloned().collect();
        check_resolved(PlanType::Join, &self.conditions, &both)?;

        let nullable = |slots: Vec<Slot>| {
            slots
                .into_iter()
                .map(|s| s.with_nullable(true))
                .collect::<Vec<_>>()
        };
        let output = match self.join_type {
            JoinType::Inner | JoinType::Cross => both,
            JoinType::Left => left_out.into_iter().chain(nullable(right_out)).collect(),
            JoinType::Right => nullable(left_out).into_iter().chain(right_out).collect(),
            JoinType::Full => nullable(left_out)
                .into_iter()
                .chain(nullable(right_out))
                .collect(),
            JoinType::Semi | JoinType::Anti => left_out,
        };
        Ok(output)
    }

    pub(super) fn compute_func_deps(
        &self,
        left: &PlanRef,
        right: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        let lp = left.logical_properties()?;
        let rp = right.logical_properties()?;
        let keys = self.equi_keys(&lp.output_ids(), &rp.output_ids());
        let (left_matches_once, right_matches_once) = self.matches_once(&lp, &rp);

        let keep = |props: &LogicalProperties, matches_once: bool| {
            if matches_once {
                props.func_deps.clone()
            } else {
                props.func_deps.without_uniques()
            }
        };

        let fds = match self.join_type {
            JoinType::Inner | JoinType::Cross => {
                let mut fds = keep(lp.as_ref(), left_matches_once);
                fds.extend(&keep(rp.as_ref(), right_matches_once));
                for (l, r) in keys {
                    fds.add_dep([l], [r]);
                    fds.add_dep([r], [l]);
                }
                fds
            }
            JoinType::Left => keep(lp.as_ref(), left_matches_once),
            JoinType::Right => keep(rp.as_ref(), right_matches_once),
            JoinType::Semi | JoinType::Anti => lp.func_deps.clone(),
            JoinType::Full => FunctionalDependencies::new(),
        };
        Ok(fds.restrict_to(&supplied_ids(output)))
    }

    pub(super) fn compute_fd_items(
        &self,
        left: &PlanRef,
        right: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FdItems> {
        let lp = left.logical_properties()?;
        let rp = right.logical_properties()?;
        let (left_matches_once, right_matches_once) = self.matches_once(&lp, &rp);

        let keep = |items: &FdItems, matches_once: bool| -> FdItems {
            if matches_once {
                items.clone()
            } else {
                items.iter().map(FdItem::without_unique).collect()
            }
        };

        let items = match self.join_type {
            JoinType::Inner | JoinType::Cross => {
                let mut items = keep(&lp.fd_items, left_matches_once);
                items.extend(keep(&rp.fd_items, right_matches_once));
                items
            }
            JoinType::Left => keep(&lp.fd_items, left_matches_once),
            JoinType::Right => keep(&rp.fd_items, right_matches_once),
            JoinType::Semi | JoinType::Anti => lp.fd_items.clone(),
            JoinType::Full => FdItems::new(),
        };
        Ok(restrict_items(&items, &supplied_ids(output)))
    }
}

impl fmt::Display for LogicalJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(
            f,
            PlanType::Join,
            &[
                ("type", &self.join_type),
                ("conditions", &ListDisplay(&self.conditions)),
            ],
        )
    }
}
