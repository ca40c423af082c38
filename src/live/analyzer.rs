//! Affected-query analysis.
//!
//! Given the table a write touched and a registration's query description,
//! decide whether that registration must refresh. The analysis is pure and
//! never reaches into the store; when a description's metadata is incomplete
//! it biases toward refreshing too often rather than too rarely.

use crate::core::TableIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Simple,
    Extended,
    Advanced,
    /// Opaque caller-supplied join. The analyzer cannot see which tables it
    /// depends on and deliberately treats it as depending on none of them,
    /// so a write to the joined table does not refresh the query. Known
    /// precision gap.
    Custom,
}

#[derive(Debug, Clone)]
pub struct JoinDescription {
    table: TableIdentity,
    kind: JoinKind,
}

impl JoinDescription {
    pub fn new(table: TableIdentity, kind: JoinKind) -> Self {
        Self { table, kind }
    }

    pub fn table(&self) -> &TableIdentity {
        &self.table
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }
}

/// What a live query reads: its primary table, its joins, and whether it
/// eager-loads related rows.
#[derive(Debug, Clone)]
pub struct QueryDescription {
    primary: TableIdentity,
    joins: Vec<JoinDescription>,
    eager_loads: bool,
}

impl QueryDescription {
    pub fn table(primary: TableIdentity) -> Self {
        Self {
            primary,
            joins: Vec::new(),
            eager_loads: false,
        }
    }

    pub fn join(mut self, table: TableIdentity, kind: JoinKind) -> Self {
        self.joins.push(JoinDescription::new(table, kind));
        self
    }

    /// Mark the query as eager-loading related rows. Which related tables
    /// are loaded is not tracked, so the analyzer assumes all of them.
    pub fn with_eager_loads(mut self) -> Self {
        self.eager_loads = true;
        self
    }

    pub fn primary_table(&self) -> &TableIdentity {
        &self.primary
    }

    pub fn joins(&self) -> &[JoinDescription] {
        &self.joins
    }

    pub fn has_eager_loads(&self) -> bool {
        self.eager_loads
    }
}

/// Must the query refresh after a write to `mutated`?
pub fn is_relevant(mutated: &TableIdentity, query: &QueryDescription) -> bool {
    if query.primary == *mutated {
        return true;
    }
    // Eager loads are conservative: we cannot tell which related table was
    // loaded, so any write might have changed the result.
    if query.eager_loads {
        return true;
    }
    query
        .joins
        .iter()
        .any(|join| join.kind != JoinKind::Custom && join.table == *mutated)
}
