//! # Logical Properties
//!
//! Logical properties describe *what* a plan subtree produces, independent of how it
//! is executed. They are derived lazily from a node's payload and its children's
//! properties, then cached on the node (see `PlanNode::logical_properties`).
//!
//! ## Functional Dependencies
//!
//! [`FunctionalDependencies`] tracks three kinds of facts about the output slots:
//!
//! - **Dependencies** `X -> Y`: rows that agree on `X` agree on `Y`.
//! - **Unique keys**: slot sets whose values identify at most one output row. The
//!   empty key means the subtree produces at most one row.
//! - **Uniform slots**: slots holding the same value in every row (e.g. after
//!   `WHERE a = 1`). A uniform slot is determined by the empty set.
//!
//! Every derivation ends with [`FunctionalDependencies::restrict_to`] over the node's
//! output so that no fact mentions a slot the node does not produce.
//!
//! ## FD Items
//!
//! [`FdItem`]s are a coarser unit used by rewrites that reason about where a
//! dependency came from: either a base table's key or an expression computed from
//! determinant slots (e.g. aggregate outputs keyed by the group-by).

use crate::catalog::QualifiedName;
use crate::expr::{Slot, SlotId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single functional dependency `determinants -> dependents`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncDep {
    pub determinants: BTreeSet<SlotId>,
    pub dependents: BTreeSet<SlotId>,
}

impl FuncDep {
    pub fn new(
        determinants: impl IntoIterator<Item = SlotId>,
        dependents: impl IntoIterator<Item = SlotId>,
    ) -> Self {
        Self {
            determinants: determinants.into_iter().collect(),
            dependents: dependents.into_iter().collect(),
        }
    }
}

impl fmt::Display for FuncDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", SlotSet(&self.determinants), SlotSet(&self.dependents))
    }
}

struct SlotSet<'a>(&'a BTreeSet<SlotId>);

impl fmt::Display for SlotSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}

/// Functional dependencies holding over a node's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalDependencies {
    deps: BTreeSet<FuncDep>,
    uniques: BTreeSet<BTreeSet<SlotId>>,
    uniforms: BTreeSet<SlotId>,
}

impl FunctionalDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `determinants -> dependents`. Trivial dependencies are dropped.
    pub fn add_dep(
        &mut self,
        determinants: impl IntoIterator<Item = SlotId>,
        dependents: impl IntoIterator<Item = SlotId>,
    ) {
        let mut dep = FuncDep::new(determinants, dependents);
        dep.dependents.retain(|s| !dep.determinants.contains(s));
        if !dep.dependents.is_empty() {
            self.deps.insert(dep);
        }
    }

    pub fn add_unique(&mut self, key: impl IntoIterator<Item = SlotId>) {
        self.uniques.insert(key.into_iter().collect());
    }

    pub fn add_uniform(&mut self, slot: SlotId) {
        self.uniforms.insert(slot);
    }

    /// Record that the output has at most one row: every slot is uniform and the
    /// empty set is a key.
    pub fn add_single_row(&mut self, slots: impl IntoIterator<Item = SlotId>) {
        self.uniforms.extend(slots);
        self.uniques.insert(BTreeSet::new());
    }

    pub fn deps(&self) -> impl Iterator<Item = &FuncDep> {
        self.deps.iter()
    }

    pub fn uniques(&self) -> impl Iterator<Item = &BTreeSet<SlotId>> {
        self.uniques.iter()
    }

    pub fn uniforms(&self) -> &BTreeSet<SlotId> {
        &self.uniforms
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty() && self.uniques.is_empty() && self.uniforms.is_empty()
    }

    pub fn is_uniform(&self, slot: SlotId) -> bool {
        self.uniforms.contains(&slot)
    }

    /// Whether `slots` contains a unique key, i.e. identifies at most one row.
    pub fn is_unique(&self, slots: &BTreeSet<SlotId>) -> bool {
        self.uniques.iter().any(|key| key.is_subset(slots))
    }

    /// All slots determined by `slots` under the recorded dependencies.
    pub fn closure(&self, slots: &BTreeSet<SlotId>) -> BTreeSet<SlotId> {
        let mut closed: BTreeSet<SlotId> = slots.union(&self.uniforms).copied().collect();
        loop {
            let before = closed.len();
            for dep in &self.deps {
                if dep.determinants.is_subset(&closed) {
                    closed.extend(dep.dependents.iter().copied());
                }
            }
            if closed.len() == before {
                return closed;
            }
        }
    }

    pub fn determines(
        &self,
        determinants: &BTreeSet<SlotId>,
        dependents: &BTreeSet<SlotId>,
    ) -> bool {
        dependents.is_subset(&self.closure(determinants))
    }

    /// Merge every fact of `other` into `self`.
    pub fn extend(&mut self, other: &FunctionalDependencies) {
        self.deps.extend(other.deps.iter().cloned());
        self.uniques.extend(other.uniques.iter().cloned());
        self.uniforms.extend(other.uniforms.iter().copied());
    }

    /// Same facts without the unique keys.
    pub fn without_uniques(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            uniques: BTreeSet::new(),
            uniforms: self.uniforms.clone(),
        }
    }

    /// Keep only facts expressible over `slots`.
    ///
    /// A dependency survives if its determinants are all kept; its dependents are
    /// narrowed to the kept slots.
    pub fn restrict_to(&self, slots: &BTreeSet<SlotId>) -> Self {
        let mut restricted = Self::new();
        for dep in &self.deps {
            if dep.determinants.is_subset(slots) {
                restricted.add_dep(
                    dep.determinants.iter().copied(),
                    dep.dependents.intersection(slots).copied(),
                );
            }
        }
        restricted.uniques = self
            .uniques
            .iter()
            .filter(|key| key.is_subset(slots))
            .cloned()
            .collect();
        restricted.uniforms = self.uniforms.intersection(slots).copied().collect();
        restricted
    }

    /// Rewrite facts through a slot renaming, dropping facts over unmapped slots.
    pub fn map_slots(&self, mapping: &BTreeMap<SlotId, SlotId>) -> Self {
        let map_all = |set: &BTreeSet<SlotId>| -> Option<BTreeSet<SlotId>> {
            set.iter().map(|s| mapping.get(s).copied()).collect()
        };
        let mut mapped = Self::new();
        for dep in &self.deps {
            if let Some(determinants) = map_all(&dep.determinants) {
                let dependents = dep.dependents.iter().filter_map(|s| mapping.get(s).copied());
                mapped.add_dep(determinants, dependents);
            }
        }
        mapped.uniques = self.uniques.iter().filter_map(map_all).collect();
        mapped.uniforms = self
            .uniforms
            .iter()
            .filter_map(|s| mapping.get(s).copied())
            .collect();
        mapped
    }
}

impl fmt::Display for FunctionalDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncDeps[")?;
        for (i, dep) in self.deps.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dep)?;
        }
        write!(f, "] unique[")?;
        for (i, key) in self.uniques.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", SlotSet(key))?;
        }
        write!(f, "] uniform{}", SlotSet(&self.uniforms))
    }
}

/// A dependency unit tagged with where it originates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FdItem {
    /// The determinant slots are a key of a base table.
    Table {
        determinants: BTreeSet<SlotId>,
        table: QualifiedName,
        unique: bool,
    },
    /// The determinant slots determine computed output slots.
    Expr {
        determinants: BTreeSet<SlotId>,
        dependents: BTreeSet<SlotId>,
        unique: bool,
    },
}

pub type FdItems = BTreeSet<FdItem>;

impl FdItem {
    pub fn determinants(&self) -> &BTreeSet<SlotId> {
        match self {
            FdItem::Table { determinants, .. } | FdItem::Expr { determinants, .. } => determinants,
        }
    }

    pub fn is_unique(&self) -> bool {
        match self {
            FdItem::Table { unique, .. } | FdItem::Expr { unique, .. } => *unique,
        }
    }

    /// The same item with uniqueness dropped.
    pub fn without_unique(&self) -> FdItem {
        let mut item = self.clone();
        match &mut item {
            FdItem::Table { unique, .. } | FdItem::Expr { unique, .. } => *unique = false,
        }
        item
    }

    /// This item narrowed to `slots`, or `None` if its determinants are not all kept.
    pub fn restricted(&self, slots: &BTreeSet<SlotId>) -> Option<FdItem> {
        if !self.determinants().is_subset(slots) {
            return None;
        }
        match self {
            FdItem::Table { .. } => Some(self.clone()),
            FdItem::Expr {
                determinants,
                dependents,
                unique,
            } => Some(FdItem::Expr {
                determinants: determinants.clone(),
                dependents: dependents.intersection(slots).copied().collect(),
                unique: *unique,
            }),
        }
    }

    /// This item rewritten through a slot renaming.
    pub fn mapped(&self, mapping: &BTreeMap<SlotId, SlotId>) -> Option<FdItem> {
        let determinants: BTreeSet<SlotId> = self
            .determinants()
            .iter()
            .map(|s| mapping.get(s).copied())
            .collect::<Option<_>>()?;
        match self {
            FdItem::Table { table, unique, .. } => Some(FdItem::Table {
                determinants,
                table: table.clone(),
                unique: *unique,
            }),
            FdItem::Expr {
                dependents, unique, ..
            } => Some(FdItem::Expr {
                determinants,
                dependents: dependents.iter().filter_map(|s| mapping.get(s).copied()).collect(),
                unique: *unique,
            }),
        }
    }
}

/// Narrow a set of FD items to `slots`.
pub fn restrict_items(items: &FdItems, slots: &BTreeSet<SlotId>) -> FdItems {
    items.iter().filter_map(|item| item.restricted(slots)).collect()
}

/// Logical properties are derived from the logical content of a subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalProperties {
    /// Output slots, in order.
    pub output: Vec<Slot>,
    pub func_deps: FunctionalDependencies,
    pub fd_items: FdItems,
}

impl LogicalProperties {
    pub fn output_ids(&self) -> BTreeSet<SlotId> {
        crate::expr::slot_ids(&self.output)
    }
}
