pub mod config;
pub mod stack;

pub use config::{StackConfig, StoreType};
pub use stack::{LifecycleEvent, PersistenceStack};
