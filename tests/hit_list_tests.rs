//! Integration tests for the hit list

use memostack::apps::HitList;
use memostack::storage::DurabilityMode;
use memostack::{LifecycleEvent, PersistenceStack, StackConfig};
use tempfile::TempDir;

#[test]
fn test_names_persist_across_launches() {
    let temp_dir = TempDir::new().unwrap();
    let config = StackConfig::new("HitList")
        .data_dir(temp_dir.path())
        .durability_mode(DurabilityMode::Sync);

    {
        let mut stack = PersistenceStack::new(config.clone());
        let ctx = stack.context().unwrap();
        let mut list = HitList::load(ctx);
        assert!(list.add_name(ctx, "Ann").is_some());
        assert!(list.add_name(ctx, "Bob").is_some());
        stack.handle_lifecycle(LifecycleEvent::DidEnterBackground);
    }

    let mut stack = PersistenceStack::new(config);
    let list = HitList::load(stack.context().unwrap());
    let mut names = list.names();
    names.sort();
    assert_eq!(names, ["Ann", "Bob"]);
}

#[test]
fn test_unopenable_store_yields_no_list() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut stack = PersistenceStack::new(StackConfig::new("HitList").data_dir(&blocker));
    assert!(stack.context().is_err());
    stack.handle_lifecycle(LifecycleEvent::WillTerminate);
    assert!(!stack.is_open());
}
