//! Projection computing a list of named expressions.

use super::{
    check_resolved, supplied_ids, write_label, ListDisplay, OutputSupplier, PlanRef, PlanType,
};
use crate::error::{PlanError, PlanResult};
use crate::expr::{NamedExpr, Slot, SlotId};
use crate::properties::{restrict_items, FdItems, FunctionalDependencies};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalProject {
    exprs: Vec<NamedExpr>,
}

impl LogicalProject {
    pub fn new(exprs: Vec<NamedExpr>) -> Self {
        Self { exprs }
    }

    pub fn exprs(&self) -> &[NamedExpr] {
        &self.exprs
    }

    pub(super) fn validate(&self) -> PlanResult<()> {
        if self.exprs.is_empty() {
            return Err(PlanError::invalid_payload(
                PlanType::Project,
                "projection requires at least one expression",
            ));
        }
        Ok(())
    }

    /// Child slot → first output slot that forwards it unchanged.
    fn rename_mapping(&self) -> BTreeMap<SlotId, SlotId> {
        let mut mapping = BTreeMap::new();
        for named in &self.exprs {
            if let Some(src) = named.renamed_slot() {
                mapping.entry(src.id).or_insert(named.output.id);
            }
        }
        mapping
    }

    pub(super) fn compute_output(&self, child: &PlanRef) -> PlanResult<Vec<Slot>> {
        let input = child.output()?;
        check_resolved(PlanType::Project, self.exprs.iter().map(|e| &e.expr), &input)?;
        Ok(self.exprs.iter().map(|e| e.output.clone()).collect())
    }

    /// Child dependencies carried through renames. Literal outputs are uniform, and
    /// a computed output is determined by the (renamed) inputs it reads.
    pub(super) fn compute_func_deps(
        &self,
        child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        let mapping = self.rename_mapping();
        let mut fds = child.logical_properties()?.func_deps.map_slots(&mapping);
        for named in &self.exprs {
            let out = named.output.id;
            match named.renamed_slot() {
                Some(src) => {
                    // Several outputs forwarding one input are interchangeable.
                    if let Some(&first) = mapping.get(&src.id) {
                        if first != out {
                            fds.add_dep([first], [out]);
                            fds.add_dep([out], [first]);
                        }
                    }
                }
                None if named.expr.is_literal() => fds.add_uniform(out),
                None => {
                    let inputs: Option<Vec<SlotId>> = named
                        .expr
                        .slot_ids()
                        .iter()
                        .map(|s| mapping.get(s).copied())
                        .collect();
                    if let Some(inputs) = inputs {
                        fds.add_dep(inputs, [out]);
                    }
                }
            }
        }
        Ok(fds.restrict_to(&supplied_ids(output)))
    }

    pub(super) fn compute_fd_items(
        &self,
        child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FdItems> {
        let mapping = self.rename_mapping();
        let props = child.logical_properties()?;
        let mapped: FdItems = props
            .fd_items
            .iter()
            .filter_map(|item| item.mapped(&mapping))
            .collect();
        Ok(restrict_items(&mapped, &supplied_ids(output)))
    }
}

impl fmt::Display for LogicalProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(f, PlanType::Project, &[("projects", &ListDisplay(&self.exprs))])
    }
}
