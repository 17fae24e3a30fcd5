//! Row filter over a conjunction of predicates.

use super::{
    check_resolved, supplied_ids, write_label, ListDisplay, OutputSupplier, PlanRef, PlanType,
};
use crate::error::{PlanError, PlanResult};
use crate::expr::{Expr, ScalarValue, Slot, UnaryOp};
use crate::properties::{restrict_items, FdItems, FunctionalDependencies};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalFilter {
    conjuncts: Vec<Expr>,
}

impl LogicalFilter {
    /// Nested ANDs are flattened into one conjunct list.
    pub fn new(predicates: Vec<Expr>) -> Self {
        let conjuncts = predicates
            .iter()
            .flat_map(|p| p.conjuncts())
            .cloned()
            .collect();
        Self { conjuncts }
    }

    pub fn conjuncts(&self) -> &[Expr] {
        &self.conjuncts
    }

    pub(super) fn validate(&self) -> PlanResult<()> {
        if self.conjuncts.is_empty() {
            return Err(PlanError::invalid_payload(
                PlanType::Filter,
                "filter requires at least one conjunct",
            ));
        }
        Ok(())
    }

    pub(super) fn compute_output(&self, child: &PlanRef) -> PlanResult<Vec<Slot>> {
        let output = child.output()?;
        check_resolved(PlanType::Filter, &self.conjuncts, &output)?;
        Ok(output)
    }

    /// Child dependencies plus what the predicates pin down:
    /// `a = literal` and `a IS NULL` make `a` uniform, `a = b` makes them mutually
    /// dependent.
    pub(super) fn compute_func_deps(
        &self,
        child: &PlanRef,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        let mut fds = child.logical_properties()?.func_deps.clone();
        for conjunct in &self.conjuncts {
            if let Some((left, right)) = conjunct.equality_operands() {
                match (left, right) {
                    (Expr::Column(a), Expr::Column(b)) => {
                        fds.add_dep([a.id], [b.id]);
                        fds.add_dep([b.id], [a.id]);
                    }
                    (Expr::Column(a), Expr::Literal(v)) | (Expr::Literal(v), Expr::Column(a))
                        if *v != ScalarValue::Null =>
                    {
                        fds.add_uniform(a.id);
                    }
                    _ => {}
                }
            } else if let Expr::UnaryOp {
                op: UnaryOp::IsNull,
                operand,
            } = conjunct
            {
                if let Some(a) = operand.as_slot() {
                    fds.add_uniform(a.id);
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
        let props = child.logical_properties()?;
        Ok(restrict_items(&props.fd_items, &supplied_ids(output)))
    }
}

impl fmt::Display for LogicalFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_label(f, PlanType::Filter, &[("predicates", &ListDisplay(&self.conjuncts))])
    }
}
