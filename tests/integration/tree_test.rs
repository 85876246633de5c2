//! Integration tests for tree queries, path resolution and persistence.

mod helpers;

use mediatree_core::config::database::DatabaseConfig;
use mediatree_core::config::AppConfig;
use mediatree_core::error::ErrorKind;
use mediatree_database::Database;
use mediatree_entity::Placement;

use helpers::TestApp;

#[tokio::test]
async fn test_move_to_top_level_scenario() {
    let app = TestApp::new();
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(a.id), "B").await;
    let c = app.text_file(Some(b.id), "c.txt", "hello").await;
    let ctx = app.ctx();

    let same = app
        .services
        .mutations
        .move_node(&ctx, b.id, Some(a.id), Placement::Before(b.id))
        .await
        .unwrap();
    assert_eq!(same.left, b.left);
    assert_eq!(same.right, b.right);
    assert_eq!(app.child_names(a.id).await, ["B"]);

    let moved = app
        .services
        .mutations
        .move_node(&ctx, b.id, None, Placement::Last)
        .await
        .unwrap();
    assert!(moved.is_root());
    assert_eq!(moved.depth, 0);
    assert!(app.child_names(a.id).await.is_empty());
    assert_eq!(app.root_names().await, ["A", "B"]);

    let resolved = app.services.nodes.resolve(None, &["B", "c.txt"]).await.unwrap();
    assert_eq!(resolved.id, c.id);
    assert_eq!(resolved.payload(), c.payload());
    assert_eq!(resolved.depth, 1);
    assert_eq!(app.services.trees.path(c.id).await.unwrap(), "B/c.txt");
    app.assert_consistent().await;
}

#[tokio::test]
async fn test_resolve_misses_and_descendant_counts() {
    let app = TestApp::new();
    let photos = app.folder(None, "Photos").await;
    let year = app.folder(Some(photos.id), "2024").await;
    app.text_file(Some(year.id), "a.txt", "a").await;
    app.text_file(Some(year.id), "b.txt", "b").await;

    let err = app
        .services
        .nodes
        .resolve_path("Photos/2023")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let repo = app.services.trees.repository();
    assert_eq!(repo.descendant_count(photos.id).await.unwrap(), 3);
    let ancestors = repo
        .ancestors(app.services.nodes.resolve_path("Photos/2024/b.txt").await.unwrap().id)
        .await
        .unwrap();
    let names: Vec<&str> = ancestors.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["Photos", "2024"]);
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db_config = DatabaseConfig {
        snapshot_path: dir.path().join("tree.json").display().to_string(),
        autosave: true,
    };
    let mut config = AppConfig::default();
    config.storage.provider = "memory".to_string();

    let db = Database::open(&db_config, config.tree.clone()).await.unwrap();
    let app = TestApp::from_db(db.clone(), config.clone());
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(a.id), "B").await;
    app.text_file(Some(b.id), "c.txt", "c").await;
    db.save(std::path::Path::new(&db_config.snapshot_path))
        .await
        .unwrap();

    let reopened = Database::open(&db_config, config.tree.clone()).await.unwrap();
    let app2 = TestApp::from_db(reopened, config);
    assert_eq!(app2.services.trees.forest().await, app.services.trees.forest().await);
    app2.assert_consistent().await;

    // Allocators continue after the loaded rows.
    let d = app2.folder(Some(a.id), "D").await;
    assert!(d.id > b.id);
    assert_eq!(app2.child_names(a.id).await, ["B", "D"]);
}
