//! Leaf scan over a catalog table.

use super::{supplied_ids, write_label, ListDisplay, OutputSupplier, PlanType};
use crate::catalog::TableRef;
use crate::error::{PlanError, PlanResult};
use crate::expr::{Slot, SlotId, SlotIdGenerator};
use crate::properties::{restrict_items, FdItem, FdItems, FunctionalDependencies};
use std::collections::BTreeSet;
use std::fmt;

/// Reads every column of a base table, one output slot per table column.
///
/// Two scans of the same table are distinct shapes unless they also bind the same
/// slots, so a self-join keeps both sides apart in the memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalScan {
    table: TableRef,
    output: Vec<Slot>,
}

impl LogicalScan {
    /// Scan `table` producing `output`, which must line up with the table's columns.
    pub fn new(table: TableRef, output: Vec<Slot>) -> Self {
        Self { table, output }
    }

    /// Bind every column of `table` to a fresh slot.
    pub fn bind(table: TableRef, ids: &SlotIdGenerator) -> Self {
        let output = table
            .columns()
            .iter()
            .map(|c| {
                ids.new_slot(c.name.clone())
                    .with_qualifier(table.name().name.clone())
                    .with_nullable(c.nullable)
            })
            .collect();
        Self { table, output }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn slots(&self) -> &[Slot] {
        &self.output
    }

    /// Slot bound to the named column.
    pub fn slot_of(&self, column: &str) -> Option<&Slot> {
        self.table.column_index(column).and_then(|i| self.output.get(i))
    }

    pub(super) fn validate(&self) -> PlanResult<()> {
        if self.output.len() != self.table.columns().len() {
            return Err(PlanError::invalid_payload(
                PlanType::Scan,
                format!(
                    "table {} has {} columns but {} slots were bound",
                    self.table.name(),
                    self.table.columns().len(),
                    self.output.len()
                ),
            ));
        }
        Ok(())
    }

    fn unique_key_slots(&self) -> Vec<BTreeSet<SlotId>> {
        self.table
            .unique_keys()
            .iter()
            .filter_map(|key| {
                key.iter()
                    .map(|col| self.slot_of(col).map(|s| s.id))
                    .collect::<Option<BTreeSet<_>>>()
            })
            .collect()
    }

    pub(super) fn compute_output(&self) -> Vec<Slot> {
        self.output.clone()
    }

    pub(super) fn compute_func_deps(
        &self,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        let all: Vec<SlotId> = self.output.iter().map(|s| s.id).collect();
        let mut fds = FunctionalDependencies::new();
        for key in self.unique_key_slots() {
            fds.add_dep(key.iter().copied(), all.iter().copied());
            fds.add_unique(key);
        }
        Ok(fds.restrict_to(&supplied_ids(output)))
    }

    pub(super) fn compute_fd_items(&self, output: OutputSupplier<'_>) -> PlanResult<FdItems> {
        let items: FdItems = self
            .unique_key_slots()
            .into_iter()
            .map(|determinants| FdItem::Table {
                determinants,
                table: self.table.name().clone(),
                unique: true,
            })
            .collect();
        Ok(restrict_items(&items, &supplied_ids(output)))
    }
}

impl fmt::Display for LogicalScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(
            f,
            PlanType::Scan,
            &[("table", self.table.name()), ("output", &ListDisplay(&self.output))],
        )
    }
}
