//! Integration tests for move, copy, delete and rebuild.

mod helpers;

use mediatree_core::error::ErrorKind;
use mediatree_core::traits::storage::ContentStorage;
use mediatree_entity::Placement;

use helpers::TestApp;

#[tokio::test]
async fn test_move_into_descendant_rolls_back() {
    let app = TestApp::new();
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(a.id), "B").await;
    let c = app.folder(Some(b.id), "C").await;
    app.text_file(Some(c.id), "deep.txt", "x").await;
    let before = app.services.trees.forest().await;

    let err = app
        .services
        .mutations
        .move_node(&app.ctx(), a.id, Some(c.id), Placement::Last)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTarget);
    assert_eq!(app.services.trees.forest().await, before);

    let err = app
        .services
        .mutations
        .move_node(&app.ctx(), b.id, Some(b.id), Placement::First)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTarget);
    assert_eq!(app.services.trees.forest().await, before);
}

#[tokio::test]
async fn test_reorder_siblings() {
    let app = TestApp::new();
    let root = app.folder(None, "root").await;
    let one = app.folder(Some(root.id), "one").await;
    let two = app.folder(Some(root.id), "two").await;
    let three = app.folder(Some(root.id), "three").await;
    let ctx = app.ctx();
    let mutations = &app.services.mutations;

    mutations
        .move_node(&ctx, three.id, Some(root.id), Placement::First)
        .await
        .unwrap();
    assert_eq!(app.child_names(root.id).await, ["three", "one", "two"]);

    mutations
        .move_node(&ctx, three.id, Some(root.id), Placement::After(two.id))
        .await
        .unwrap();
    assert_eq!(app.child_names(root.id).await, ["one", "two", "three"]);

    mutations
        .move_node(&ctx, one.id, Some(root.id), Placement::Index(1))
        .await
        .unwrap();
    assert_eq!(app.child_names(root.id).await, ["two", "one", "three"]);
    app.assert_consistent().await;
}

#[tokio::test]
async fn test_copy_survives_deleting_original() {
    let app = TestApp::new();
    let src = app.folder(None, "src").await;
    let inner = app.folder(Some(src.id), "inner").await;
    let file = app.text_file(Some(inner.id), "notes.txt", "keep me").await;
    let dst = app.folder(None, "dst").await;
    let ctx = app.ctx();

    let copy = app
        .services
        .mutations
        .copy_node(&ctx, src.id, Some(dst.id), Placement::Last)
        .await
        .unwrap();
    assert_ne!(copy.id, src.id);
    let copied_tree = app.services.trees.subtree(copy.id).await.unwrap();

    let report = app.services.mutations.delete(&ctx, src.id).await.unwrap();
    assert_eq!(report.removed, 3);
    assert!(report.released.is_empty());

    assert_eq!(app.root_names().await, ["dst"]);
    let after = app.services.trees.subtree(copy.id).await.unwrap();
    assert_eq!(after.len(), copied_tree.len());
    let copied_file = app
        .services
        .nodes
        .resolve_path("dst/src/inner/notes.txt")
        .await
        .unwrap();
    assert_ne!(copied_file.id, file.id);
    let content = &copied_file.payload().unwrap().content;
    assert_eq!(content, &file.payload().unwrap().content);
    assert_eq!(app.blobs.read_bytes(content).await.unwrap(), "keep me");
    app.assert_consistent().await;
}

#[tokio::test]
async fn test_delete_many_across_trees() {
    let app = TestApp::new();
    let a = app.folder(None, "A").await;
    let a1 = app.folder(Some(a.id), "a1").await;
    let a2 = app.folder(Some(a.id), "a2").await;
    let a3 = app.text_file(Some(a.id), "a3.txt", "3").await;
    let b = app.folder(None, "B").await;
    let b1 = app.text_file(Some(b.id), "b1.txt", "1").await;
    let nested = app.folder(Some(a1.id), "nested").await;

    let report = app
        .services
        .mutations
        .delete_many(&app.ctx(), &[a1.id, nested.id, a3.id, b1.id, a3.id])
        .await
        .unwrap();
    assert_eq!(report.deleted_roots.len(), 3);
    assert_eq!(report.removed, 4);
    assert_eq!(report.released.len(), 2);
    assert!(app.blobs.is_empty());

    assert_eq!(app.child_names(a.id).await, ["a2"]);
    assert!(app.child_names(b.id).await.is_empty());
    let a2 = app.services.nodes.get(a2.id).await.unwrap();
    assert_eq!((a2.left, a2.right), (2, 3));
    app.assert_consistent().await;
}

#[tokio::test]
async fn test_rebuild_consistent_forest_is_noop() {
    let app = TestApp::new();
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(a.id), "B").await;
    app.text_file(Some(b.id), "c.txt", "c").await;
    app.folder(None, "Z").await;
    let before = app.services.trees.forest().await;

    let report = app.services.mutations.rebuild(&app.ctx()).await.unwrap();
    assert_eq!(report.changed, 0);
    assert!(report.promoted.is_empty());
    assert_eq!(report.trees, 2);
    assert_eq!(app.services.trees.forest().await, before);

    let single = app
        .services
        .mutations
        .rebuild_tree(&app.ctx(), a.tree_id)
        .await
        .unwrap();
    assert_eq!(single.changed, 0);
    assert_eq!(single.nodes, 3);
}
