//! # Catalog Interface
//!
//! The catalog is the source of truth for schema objects. Plan nodes never own catalog
//! data; they hold shared, read-only handles (`TableRef`, `ViewRef`) that the binder
//! resolved *before* constructing the node. Node construction therefore never performs
//! a lookup or any I/O.
//!
//! ## Identity
//!
//! A schema object is identified by its [`QualifiedName`] (catalog, database, object).
//! Handle equality and hashing use the qualified name only: two handles obtained from
//! different lookups of the same view compare equal, which is what the memo needs to
//! collapse duplicate view references into one group expression. The `version` carried
//! by a handle is informational and is not part of identity.
//!
//! ## Trait Design
//!
//! `Catalog` is kept minimal and object safe so different backends can sit behind
//! `dyn Catalog`. `InMemoryCatalog` is a HashMap-backed implementation for tests and
//! development.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Fully qualified name of a schema object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub catalog: String,
    pub database: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(
        catalog: impl Into<String>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            database: database.into(),
            name: name.into(),
        }
    }

    /// Whether every component is non-empty.
    pub fn is_complete(&self) -> bool {
        !self.catalog.is_empty() && !self.database.is_empty() && !self.name.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.database, self.name)
    }
}

/// Column definition of a base table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
        }
    }
}

/// Base table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    name: QualifiedName,
    version: u64,
    columns: Vec<ColumnDef>,
    /// Column-name sets declared unique (primary key, unique constraints).
    unique_keys: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: QualifiedName, columns: Vec<ColumnDef>) -> Self {
        Self {
            name,
            version: 0,
            columns,
            unique_keys: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn with_unique_key<S: Into<String>>(mut self, key: impl IntoIterator<Item = S>) -> Self {
        self.unique_keys.push(key.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn unique_keys(&self) -> &[Vec<String>] {
        &self.unique_keys
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Stored view metadata: a name and the query text that defines it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    name: QualifiedName,
    version: u64,
    definition: String,
}

impl View {
    pub fn new(name: QualifiedName, definition: impl Into<String>) -> Self {
        Self {
            name,
            version: 0,
            definition: definition.into(),
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The inline query text the view was created with.
    pub fn definition(&self) -> &str {
        &self.definition
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for View {}

impl Hash for View {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

pub type TableRef = Arc<Table>;
pub type ViewRef = Arc<View>;

/// Catalog provides schema objects by qualified name.
pub trait Catalog: Send + Sync {
    fn get_table(&self, name: &QualifiedName) -> Option<TableRef>;
    fn get_view(&self, name: &QualifiedName) -> Option<ViewRef>;
}

/// In-memory catalog for testing and development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    pub tables: HashMap<QualifiedName, TableRef>,
    pub views: HashMap<QualifiedName, ViewRef>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: Table) -> TableRef {
        let table = Arc::new(table);
        self.tables.insert(table.name().clone(), table.clone());
        table
    }

    pub fn add_view(&mut self, view: View) -> ViewRef {
        let view = Arc::new(view);
        self.views.insert(view.name().clone(), view.clone());
        view
    }
}

impl Catalog for InMemoryCatalog {
    fn get_table(&self, name: &QualifiedName) -> Option<TableRef> {
        self.tables.get(name).cloned()
    }

    fn get_view(&self, name: &QualifiedName) -> Option<ViewRef> {
        self.views.get(name).cloned()
    }
}
