pub mod change;
pub mod context;
pub mod persistence;
pub mod store;

pub use change::Change;
pub use context::{Context, ContextStats};
pub use persistence::{
    DurabilityMode, JournalEntry, JournalManager, PersistenceManager, SnapshotManager,
    StoreMetadata, StoreSnapshot,
};
pub use store::RecordStore;
