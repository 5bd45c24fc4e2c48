//! Session snapshot behavior.

mod common;

use common::{free_user, seed_user, test_env};
use petfolio::session::SessionManager;
use petfolio::store::PetStore;

#[tokio::test]
async fn test_current_repairs_missing_usage_without_writeback() {
    let (_dir, store, sessions) = test_env().await;

    // A user from before usage tracking existed
    let mut user = free_user("u-old");
    user.usage = None;
    seed_user(store.as_ref(), &user).await;
    sessions.establish(&user).await.unwrap();

    let current = sessions.current("u-old").await.unwrap().unwrap();
    let usage = current.usage.expect("usage must be filled in on read");
    assert_eq!(usage.ai_questions, 0);
    assert_eq!(usage.calc_tests, 0);

    // The read did not mutate the authoritative record
    let stored = store.get_user("u-old").await.unwrap().unwrap();
    assert!(stored.usage.is_none());
}

#[tokio::test]
async fn test_snapshot_survives_manager_restart() {
    let (dir, _store, sessions) = test_env().await;

    let user = free_user("u-restart");
    sessions.establish(&user).await.unwrap();
    drop(sessions);

    // A fresh manager over the same directory finds the snapshot on disk
    let revived = SessionManager::new(dir.path()).await.unwrap();
    let current = revived.current("u-restart").await.unwrap().unwrap();
    assert_eq!(current.uid, "u-restart");
    assert_eq!(current.email, "u-restart@example.com");
}

#[tokio::test]
async fn test_clear_removes_snapshot() {
    let (_dir, _store, sessions) = test_env().await;

    let user = free_user("u-out");
    sessions.establish(&user).await.unwrap();
    sessions.clear("u-out").await.unwrap();

    assert!(sessions.current("u-out").await.unwrap().is_none());
    // Clearing an absent session is not an error
    sessions.clear("u-out").await.unwrap();
}

#[tokio::test]
async fn test_refresh_updates_snapshot() {
    let (_dir, _store, sessions) = test_env().await;

    let mut user = free_user("u-fresh");
    sessions.establish(&user).await.unwrap();

    user.name = "Renamed".to_string();
    sessions.refresh(&user).await.unwrap();

    let current = sessions.current("u-fresh").await.unwrap().unwrap();
    assert_eq!(current.name, "Renamed");
}
