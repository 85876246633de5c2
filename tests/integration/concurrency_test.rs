//! Integration tests for concurrent mutations and lock contention.

mod helpers;

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;

use mediatree_core::config::tree::TreeConfig;
use mediatree_core::error::ErrorKind;
use mediatree_database::LockPlan;
use mediatree_entity::Placement;
use mediatree_service::{OperationContext, UploadParams};

use helpers::TestApp;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_get_distinct_names() {
    let app = TestApp::new();
    let docs = app.folder(None, "docs").await.id;

    let mut handles = Vec::new();
    for i in 0..8 {
        let uploads = app.services.uploads.clone();
        handles.push(tokio::spawn(async move {
            let ctx = OperationContext::new(format!("writer-{i}"));
            uploads
                .upload(
                    &ctx,
                    UploadParams::new(Some(docs), "report.pdf", Bytes::from_static(b"%PDF")),
                )
                .await
        }));
    }
    let mut names = HashSet::new();
    for handle in handles {
        let node = handle.await.unwrap().unwrap();
        assert!(names.insert(node.name));
    }
    assert_eq!(names.len(), 8);
    assert!(names.contains("report.pdf"));
    assert!(names.contains("report_2.pdf"));
    app.assert_consistent().await;
}

#[tokio::test]
async fn test_held_tree_does_not_block_other_trees() {
    let app = TestApp::with_tree_config(TreeConfig {
        lock_timeout_ms: 50,
        ..TreeConfig::default()
    });
    let busy = app.folder(None, "busy").await;
    let busy_child = app.folder(Some(busy.id), "child").await;
    let free = app.folder(None, "free").await;
    let free_child = app.folder(Some(free.id), "child").await;
    let other = app.folder(Some(free.id), "other").await;

    let held = app
        .services
        .db
        .locks()
        .acquire(&LockPlan::trees([busy.tree_id]))
        .await
        .unwrap();

    app.services
        .mutations
        .move_node(&app.ctx(), free_child.id, Some(other.id), Placement::Last)
        .await
        .unwrap();

    let err = app
        .services
        .mutations
        .delete(&app.ctx(), busy_child.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConcurrentModification);
    assert!(err.is_retryable());
    assert_eq!(app.child_names(busy.id).await, ["child"]);

    drop(held);
    app.services
        .mutations
        .delete(&app.ctx(), busy_child.id)
        .await
        .unwrap();
    assert!(app.child_names(busy.id).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_caller_retry_after_contention() {
    let app = TestApp::with_tree_config(TreeConfig {
        lock_timeout_ms: 10,
        ..TreeConfig::default()
    });
    let root = app.folder(None, "root").await;
    let leaf = app.folder(Some(root.id), "leaf").await;

    let held = app
        .services
        .db
        .locks()
        .acquire(&LockPlan::trees([root.tree_id]))
        .await
        .unwrap();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(held);
    });

    let mut attempts = 0;
    let mut backoff = Duration::from_millis(5);
    loop {
        attempts += 1;
        match app.services.mutations.delete(&app.ctx(), leaf.id).await {
            Ok(_) => break,
            Err(e) if e.is_retryable() && attempts < 20 => {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_millis(40));
            }
            Err(e) => panic!("delete failed after {attempts} attempts: {e}"),
        }
    }
    release.await.unwrap();
    assert!(attempts > 1);
    assert!(app.child_names(root.id).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutations_keep_invariants() {
    let app = TestApp::new();
    let mut folders = Vec::new();
    for t in 0..3 {
        let root = app.folder(None, &format!("tree{t}")).await;
        folders.push(root.id);
        for i in 0..4 {
            let f = app.folder(Some(root.id), &format!("f{i}")).await;
            folders.push(f.id);
            app.text_file(Some(f.id), "leaf.txt", "leaf").await;
        }
    }

    let mut handles = Vec::new();
    for worker in 0..6usize {
        let mutations = app.services.mutations.clone();
        let folders = folders.clone();
        handles.push(tokio::spawn(async move {
            let ctx = OperationContext::system();
            for step in 0..20usize {
                let pick = |k: usize| folders[(worker * 7 + step * 3 + k) % folders.len()];
                let (source, target) = (pick(1), pick(5));
                let result = match step % 6 {
                    0 | 3 => mutations
                        .move_node(&ctx, source, Some(target), Placement::First)
                        .await,
                    1 | 4 => mutations
                        .move_node(&ctx, source, Some(target), Placement::Index(1))
                        .await,
                    2 => mutations.move_node(&ctx, source, None, Placement::Last).await,
                    _ => mutations
                        .move_node(&ctx, source, Some(target), Placement::Last)
                        .await,
                };
                if let Err(e) = result {
                    assert!(
                        matches!(
                            e.kind,
                            ErrorKind::InvalidTarget | ErrorKind::ConcurrentModification
                        ),
                        "unexpected error: {e}"
                    );
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    app.assert_consistent().await;
}
