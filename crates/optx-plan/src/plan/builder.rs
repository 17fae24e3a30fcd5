//! Catalog-aware construction of leaf and view nodes.

use super::{LogicalScan, PlanNode, PlanRef, PlanType};
use crate::catalog::{Catalog, QualifiedName};
use crate::error::{PlanError, PlanResult};
use crate::expr::SlotIdGenerator;

/// Resolves catalog names while building plans, binding fresh slots from `ids`.
pub struct PlanBuilder<'a> {
    catalog: &'a dyn Catalog,
    ids: &'a SlotIdGenerator,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(catalog: &'a dyn Catalog, ids: &'a SlotIdGenerator) -> Self {
        Self { catalog, ids }
    }

    pub fn catalog(&self) -> &'a dyn Catalog {
        self.catalog
    }

    pub fn ids(&self) -> &'a SlotIdGenerator {
        self.ids
    }

    /// Scan every column of the named table.
    pub fn scan(&self, name: &QualifiedName) -> PlanResult<PlanRef> {
        let table = self.catalog.get_table(name).ok_or_else(|| {
            PlanError::invalid_payload(PlanType::Scan, format!("table {} not found", name))
        })?;
        PlanNode::scan(LogicalScan::bind(table, self.ids))
    }

    /// Wrap `body` in a reference to the named view. Fails with `InvalidPayload` when
    /// the catalog has no such view.
    pub fn view(&self, name: &QualifiedName, body: PlanRef) -> PlanResult<PlanRef> {
        PlanNode::try_view(self.catalog.get_view(name), body)
    }
}
