use super::StackConfig;
use crate::core::{DbError, Result};
use crate::storage::{Context, ContextStats};
use tracing::{error, info};

/// App lifecycle moments at which pending changes are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    DidEnterBackground,
    WillTerminate,
}

enum StackState {
    Configured,
    Open(Context),
    /// Opening failed; the error is replayed on every later access.
    Failed(DbError),
}

/// Owns the single storage context of an app.
///
/// Construction only records the configuration; the backing store is
/// opened on the first call to [`PersistenceStack::context`]. A failure to
/// open is logged once and is permanent for this stack.
pub struct PersistenceStack {
    config: StackConfig,
    state: StackState,
}

impl PersistenceStack {
    pub fn new(config: StackConfig) -> Self {
        Self {
            config,
            state: StackState::Configured,
        }
    }

    /// Persistent store named `store_name` in the default data directory.
    pub fn init(store_name: &str) -> Self {
        Self::new(StackConfig::new(store_name))
    }

    pub fn store_name(&self) -> &str {
        &self.config.store_name
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, StackState::Open(_))
    }

    /// The shared context, opening and loading the store on first access.
    pub fn context(&mut self) -> Result<&mut Context> {
        if matches!(self.state, StackState::Configured) {
            self.state = match self.open() {
                Ok(ctx) => {
                    info!(store = %self.config.store_name, "store opened");
                    StackState::Open(ctx)
                }
                Err(err) => {
                    error!(store = %self.config.store_name, error = %err, "unresolved error opening store");
                    StackState::Failed(err)
                }
            };
        }

        match &mut self.state {
            StackState::Open(ctx) => Ok(ctx),
            StackState::Failed(err) => Err(err.clone()),
            StackState::Configured => Err(DbError::StoreOpen {
                store: self.config.store_name.clone(),
                reason: "store not opened".to_string(),
            }),
        }
    }

    fn open(&self) -> Result<Context> {
        self.config.validate().map_err(|reason| DbError::StoreOpen {
            store: self.config.store_name.clone(),
            reason,
        })?;
        Context::open(&self.config)
    }

    /// Commits pending changes if there are any. Returns whether a write
    /// happened. A stack that was never opened has nothing to save and is
    /// not opened by this call. On failure the changes stay pending.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        let store = self.config.store_name.clone();
        let ctx = match &mut self.state {
            StackState::Configured => return Ok(false),
            StackState::Failed(err) => return Err(err.clone()),
            StackState::Open(ctx) => ctx,
        };

        if !ctx.has_changes() {
            return Ok(false);
        }
        ctx.save().inspect_err(|err| {
            error!(store = %store, error = %err, pending = ctx.pending_changes().len(), "unresolved error saving context");
        })
    }

    /// Flushes on background/terminate. Failures are logged and swallowed.
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        if let Ok(true) = self.save_if_dirty() {
            info!(?event, "flushed pending changes");
        }
    }

    pub fn stats(&self) -> Option<ContextStats> {
        match &self.state {
            StackState::Open(ctx) => Some(ctx.stats()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Person;
    use crate::query::fetch_all;
    use tempfile::TempDir;

    #[test]
    fn test_store_opens_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let mut stack = PersistenceStack::new(StackConfig::new("HitList").data_dir(temp_dir.path()));

        assert!(!stack.is_open());
        assert!(!temp_dir.path().join("HitList.journal").exists());

        stack.context().unwrap();
        assert!(stack.is_open());
        assert!(temp_dir.path().join("HitList.journal").exists());
        assert!(temp_dir.path().join("HitList.meta.json").exists());
    }

    #[test]
    fn test_save_before_open_does_not_open() {
        let mut stack = PersistenceStack::new(StackConfig::in_memory("HitList"));
        assert!(!stack.save_if_dirty().unwrap());
        assert!(!stack.is_open());
    }

    #[test]
    fn test_open_failure_is_sticky() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let mut stack = PersistenceStack::new(StackConfig::new("HitList").data_dir(&blocker));
        let first = stack.context().map(|_| ()).unwrap_err();
        assert!(first.is_open_failure());

        // Removing the obstacle does not resurrect the stack.
        std::fs::remove_file(&blocker).unwrap();
        let second = stack.context().map(|_| ()).unwrap_err();
        assert_eq!(first, second);
        assert!(stack.save_if_dirty().is_err());
    }

    #[test]
    fn test_lifecycle_flush() {
        let mut stack = PersistenceStack::new(StackConfig::in_memory("HitList"));
        stack.context().unwrap().insert(Person::new("Ann"));

        stack.handle_lifecycle(LifecycleEvent::DidEnterBackground);
        let ctx = stack.context().unwrap();
        assert!(!ctx.has_changes());
        assert_eq!(fetch_all::<Person>(ctx, None, None).unwrap().len(), 1);

        stack.handle_lifecycle(LifecycleEvent::WillTerminate);
        assert_eq!(stack.stats().unwrap().writes, 1);
    }
}
