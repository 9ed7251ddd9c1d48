//! Pickcode cache repository tests.

use cinegate_store::{PickcodeRepo, SqliteStore};

#[tokio::test]
async fn missing_path_is_none() {
    let store = SqliteStore::in_memory().await.unwrap();
    assert_eq!(store.get_pickcode("/media/movie.mkv").await.unwrap(), None);
}

#[tokio::test]
async fn save_then_get() {
    let store = SqliteStore::in_memory().await.unwrap();
    store
        .save_pickcode("/media/movie.mkv", "pc-abc")
        .await
        .unwrap();
    assert_eq!(
        store.get_pickcode("/media/movie.mkv").await.unwrap(),
        Some("pc-abc".to_string())
    );
}

#[tokio::test]
async fn save_upserts_on_repeat() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.save_pickcode("/m/a.mkv", "old").await.unwrap();
    store.save_pickcode("/m/a.mkv", "new").await.unwrap();

    assert_eq!(
        store.get_pickcode("/m/a.mkv").await.unwrap(),
        Some("new".to_string())
    );
    assert_eq!(store.count_pickcodes().await.unwrap(), 1);
}

#[tokio::test]
async fn delete_and_clear() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.save_pickcode("/m/a.mkv", "pc1").await.unwrap();
    store.save_pickcode("/m/b.mkv", "pc2").await.unwrap();

    assert!(store.delete_pickcode("/m/a.mkv").await.unwrap());
    assert!(!store.delete_pickcode("/m/a.mkv").await.unwrap());
    assert_eq!(store.get_pickcode("/m/a.mkv").await.unwrap(), None);

    assert_eq!(store.clear_pickcodes().await.unwrap(), 1);
    assert_eq!(store.count_pickcodes().await.unwrap(), 0);
}
