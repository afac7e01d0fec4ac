use crate::storage::DurabilityMode;
use std::path::PathBuf;

const URL_SCHEME: &str = "memostack://";

/// Where a stack keeps its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    /// Snapshot + journal files under `data_dir`.
    #[default]
    Persistent,
    /// Process memory only; nothing survives the stack.
    InMemory,
}

/// Persistence stack configuration
///
/// Built with `new` and the builder methods, or parsed from a store URL.
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    /// Store name; also the file stem of the store's files
    pub store_name: String,

    /// Directory holding the store's files
    pub data_dir: PathBuf,

    pub store_type: StoreType,

    pub durability_mode: DurabilityMode,

    /// Journal frames written before the snapshot is rewritten
    pub checkpoint_threshold: usize,

    /// Version of the entity model the store must have been written by
    pub model_version: u32,
}

impl StackConfig {
    pub fn new(store_name: &str) -> Self {
        Self {
            store_name: store_name.to_string(),
            data_dir: PathBuf::from("data"),
            store_type: StoreType::Persistent,
            durability_mode: DurabilityMode::Async,
            checkpoint_threshold: 100,
            model_version: 1,
        }
    }

    pub fn in_memory(store_name: &str) -> Self {
        Self::new(store_name).store_type(StoreType::InMemory)
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn store_type(mut self, store_type: StoreType) -> Self {
        self.store_type = store_type;
        self
    }

    pub fn durability_mode(mut self, mode: DurabilityMode) -> Self {
        self.durability_mode = mode;
        self
    }

    pub fn checkpoint_threshold(mut self, threshold: usize) -> Self {
        self.checkpoint_threshold = threshold;
        self
    }

    pub fn model_version(mut self, version: u32) -> Self {
        self.model_version = version;
        self
    }

    /// Parse from a store URL
    ///
    /// Format: `memostack://memory/<store>` or `memostack://<dir>/<store>`,
    /// e.g. `memostack:///var/lib/walks/DogWalk`.
    pub fn from_url(url: &str) -> Result<Self, String> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| format!("URL must start with '{}'", URL_SCHEME))?;

        let (dir, store_name) = rest
            .rsplit_once('/')
            .ok_or_else(|| "URL must end with /<store name>".to_string())?;

        if store_name.is_empty() {
            return Err("Store name cannot be empty".to_string());
        }

        if dir == "memory" {
            return Ok(Self::in_memory(store_name));
        }
        if dir.is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }
        Ok(Self::new(store_name).data_dir(dir))
    }

    pub fn to_url(&self) -> String {
        match self.store_type {
            StoreType::InMemory => format!("{}memory/{}", URL_SCHEME, self.store_name),
            StoreType::Persistent => format!(
                "{}{}/{}",
                URL_SCHEME,
                self.data_dir.display(),
                self.store_name
            ),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.store_name.is_empty() {
            return Err("Store name cannot be empty".to_string());
        }

        if self.store_name.contains(['/', '\\']) {
            return Err("Store name cannot contain path separators".to_string());
        }

        if self.checkpoint_threshold == 0 {
            return Err("checkpoint_threshold must be > 0".to_string());
        }

        Ok(())
    }
}
