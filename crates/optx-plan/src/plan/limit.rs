//! Row limit with offset.

use super::{supplied_ids, write_label, OutputSupplier, PlanRef, PlanType};
use crate::error::PlanResult;
use crate::expr::Slot;
use crate::properties::{restrict_items, FdItems, FunctionalDependencies};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalLimit {
    limit: u64,
    offset: u64,
}

impl LogicalLimit {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub(super) fn compute_output(&self, child: &PlanRef) -> PlanResult<Vec<Slot>> {
        child.output()
    }

    /// Child dependencies; a limit of at most one row makes every slot uniform.
    pub(super) fn compute_func_deps(
        &self,
        child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        let props = child.logical_properties()?;
        let mut fds = props.func_deps.clone();
        if self.limit <= 1 {
            fds.add_single_row(props.output_ids());
        }
        Ok(fds.restrict_to(&supplied_ids(output)))
    }

    pub(super) fn compute_fd_items(
        &self,
        child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FdItems> {
        let props = child.logical_properties()?;
        Ok(restrict_items(&props.fd_items, &supplied_ids(output)))
    }
}

impl fmt::Display for LogicalLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(
            f,
            PlanType::Limit,
            &[("limit", &self.limit), ("offset", &self.offset)],
        )
    }
}
