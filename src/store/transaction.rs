use crate::core::{Row, TableIdentity, WriteKind};

/// One not-yet-applied row write.
#[derive(Debug, Clone)]
pub enum PendingWrite {
    Create {
        table: TableIdentity,
        values: Row,
    },
    Update {
        table: TableIdentity,
        row_id: u64,
        values: Row,
    },
    SoftDelete {
        table: TableIdentity,
        row_id: u64,
    },
    Restore {
        table: TableIdentity,
        row_id: u64,
    },
    HardDelete {
        table: TableIdentity,
        row_id: u64,
    },
}

impl PendingWrite {
    pub fn kind(&self) -> WriteKind {
        match self {
            Self::Create { .. } => WriteKind::Create,
            Self::Update { .. } => WriteKind::Update,
            Self::SoftDelete { .. } => WriteKind::SoftDelete,
            Self::Restore { .. } => WriteKind::Restore,
            Self::HardDelete { .. } => WriteKind::HardDelete,
        }
    }

    pub fn table(&self) -> &TableIdentity {
        match self {
            Self::Create { table, .. }
            | Self::Update { table, .. }
            | Self::SoftDelete { table, .. }
            | Self::Restore { table, .. }
            | Self::HardDelete { table, .. } => table,
        }
    }
}

/// An ordered batch of writes applied atomically by `Store::commit`.
///
/// The batch itself is a plain builder; nothing touches the store until
/// commit. On commit failure no write is applied and no invalidation runs.
/// On success each write notifies the interceptor chain individually, as if
/// performed standalone.
#[derive(Debug, Default)]
pub struct TransactionBatch {
    writes: Vec<PendingWrite>,
}

impl TransactionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, table: TableIdentity, values: Row) -> &mut Self {
        self.writes.push(PendingWrite::Create { table, values });
        self
    }

    pub fn update(&mut self, table: TableIdentity, row_id: u64, values: Row) -> &mut Self {
        self.writes.push(PendingWrite::Update {
            table,
            row_id,
            values,
        });
        self
    }

    pub fn soft_delete(&mut self, table: TableIdentity, row_id: u64) -> &mut Self {
        self.writes.push(PendingWrite::SoftDelete { table, row_id });
        self
    }

    pub fn restore(&mut self, table: TableIdentity, row_id: u64) -> &mut Self {
        self.writes.push(PendingWrite::Restore { table, row_id });
        self
    }

    pub fn hard_delete(&mut self, table: TableIdentity, row_id: u64) -> &mut Self {
        self.writes.push(PendingWrite::HardDelete { table, row_id });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub(crate) fn into_writes(self) -> Vec<PendingWrite> {
        self.writes
    }
}
