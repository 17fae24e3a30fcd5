//! Reference to a stored view wrapping the plan of its body.
//!
//! The view node adds no columns and no semantics of its own. It keeps the catalog
//! association visible to rewrites (e.g. for privilege checks or view matching) and
//! forwards every derivation to its body unchanged.
//!
//! Equality covers the view identity only, not the body: two references to the same
//! view are the same shape however their bodies were bound.

use super::{write_label, OutputSupplier, PlanRef, PlanType};
use crate::catalog::{View, ViewRef};
use crate::error::{PlanError, PlanResult};
use crate::expr::Slot;
use crate::properties::{FdItems, FunctionalDependencies};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalView {
    view: ViewRef,
}

impl LogicalView {
    pub fn new(view: ViewRef) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_ref(&self) -> &ViewRef {
        &self.view
    }

    pub fn catalog_name(&self) -> &str {
        &self.view.name().catalog
    }

    pub fn database_name(&self) -> &str {
        &self.view.name().database
    }

    pub fn view_name(&self) -> &str {
        &self.view.name().name
    }

    /// Query text the view was defined with.
    pub fn view_definition(&self) -> &str {
        self.view.definition()
    }

    pub(super) fn validate(&self) -> PlanResult<()> {
        if !self.view.name().is_complete() {
            return Err(PlanError::invalid_payload(
                PlanType::View,
                format!("incomplete view name '{}'", self.view.name()),
            ));
        }
        Ok(())
    }

    pub(super) fn compute_output(&self, body: &PlanRef) -> PlanResult<Vec<Slot>> {
        body.output()
    }

    pub(super) fn compute_func_deps(
        &self,
        body: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        body.compute_func_deps(output)
    }

    pub(super) fn compute_fd_items(
        &self,
        body: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FdItems> {
        body.compute_fd_items(output)
    }
}

impl fmt::Display for LogicalView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(
            f,
            PlanType::View,
            &[
                ("catalog", &self.catalog_name()),
                ("db", &self.database_name()),
                ("name", &self.view_name()),
            ],
        )
    }
}
