//! Grouped aggregation.

use super::{
    check_resolved, supplied_ids, write_label, ListDisplay, OutputSupplier, PlanRef, PlanType,
};
use crate::error::{PlanError, PlanResult};
use crate::expr::{Expr, NamedExpr, Slot, SlotId};
use crate::properties::{restrict_items, FdItem, FdItems, FunctionalDependencies};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Groups the child rows by `group_by` and produces `outputs` per group.
///
/// Every output is either an aggregate call, a literal, or one of the group-by
/// expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalAggregate {
    group_by: Vec<Expr>,
    outputs: Vec<NamedExpr>,
}

impl LogicalAggregate {
    pub fn new(group_by: Vec<Expr>, outputs: Vec<NamedExpr>) -> Self {
        Self { group_by, outputs }
    }

    pub fn group_by(&self) -> &[Expr] {
        &self.group_by
    }

    pub fn outputs(&self) -> &[NamedExpr] {
        &self.outputs
    }

    pub(super) fn validate(&self) -> PlanResult<()> {
        if self.outputs.is_empty() {
            return Err(PlanError::invalid_payload(
                PlanType::Aggregate,
                "aggregate requires at least one output",
            ));
        }
        for named in &self.outputs {
            let valid = matches!(named.expr, Expr::Aggregate(_))
                || named.expr.is_literal()
                || self.group_by.contains(&named.expr);
            if !valid {
                return Err(PlanError::invalid_payload(
                    PlanType::Aggregate,
                    format!("output {} is neither grouped nor aggregated", named),
                ));
            }
        }
        Ok(())
    }

    /// Output slots of the group-by expressions, if every group-by expression is
    /// projected.
    fn group_key_slots(&self) -> Option<BTreeSet<SlotId>> {
        self.group_by
            .iter()
            .map(|g| self.outputs.iter().find(|o| &o.expr == g).map(|o| o.output.id))
            .collect()
    }

    fn output_ids(&self) -> BTreeSet<SlotId> {
        self.outputs.iter().map(|o| o.output.id).collect()
    }

    pub(super) fn compute_output(&self, child: &PlanRef) -> PlanResult<Vec<Slot>> {
        let input = child.output()?;
        check_resolved(
            PlanType::Aggregate,
            self.group_by.iter().chain(self.outputs.iter().map(|o| &o.expr)),
            &input,
        )?;
        Ok(self.outputs.iter().map(|o| o.output.clone()).collect())
    }

    /// The group key determines every output and is unique. Dependencies among
    /// grouped child columns carry over. A global aggregate yields one row.
    pub(super) fn compute_func_deps(
        &self,
        child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        let all = self.output_ids();
        let mut fds = FunctionalDependencies::new();
        if self.group_by.is_empty() {
            fds.add_single_row(all);
            return Ok(fds.restrict_to(&supplied_ids(output)));
        }

        let grouped: BTreeMap<SlotId, SlotId> = self
            .outputs
            .iter()
            .filter(|o| self.group_by.contains(&o.expr))
            .filter_map(|o| o.renamed_slot().map(|src| (src.id, o.output.id)))
            .collect();
        let child_fds = child.logical_properties()?.func_deps.without_uniques();
        fds.extend(&child_fds.map_slots(&grouped));

        if let Some(key) = self.group_key_slots() {
            fds.add_dep(key.iter().copied(), all.iter().copied());
            fds.add_unique(key);
        }
        Ok(fds.restrict_to(&supplied_ids(output)))
    }

    pub(super) fn compute_fd_items(
        &self,
        _child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FdItems> {
        let mut items = FdItems::new();
        let key = if self.group_by.is_empty() {
            Some(BTreeSet::new())
        } else {
            self.group_key_slots()
        };
        if let Some(determinants) = key {
            let dependents = self.output_ids().difference(&determinants).copied().collect();
            items.insert(FdItem::Expr {
                determinants,
                dependents,
                unique: true,
            });
        }
        Ok(restrict_items(&items, &supplied_ids(output)))
    }
}

impl fmt::Display for LogicalAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(
            f,
            PlanType::Aggregate,
            &[
                ("groupBy", &ListDisplay(&self.group_by)),
                ("outputs", &ListDisplay(&self.outputs)),
            ],
        )
    }
}
