//! Integration tests for uploads, naming and default files.

mod helpers;

use std::io::Cursor;

use bytes::Bytes;

use mediatree_core::config::AppConfig;
use mediatree_core::error::ErrorKind;
use mediatree_database::Database;
use mediatree_entity::{MediaType, Placement};
use mediatree_service::{Services, UploadParams};
use mediatree_storage::StorageManager;

use helpers::TestApp;

fn png(width: u32, height: u32) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}

#[tokio::test]
async fn test_duplicate_names_are_numbered() {
    let app = TestApp::new();
    let docs = app.folder(None, "docs").await;
    app.text_file(Some(docs.id), "report.pdf", "%PDF").await;
    let second = app.text_file(Some(docs.id), "report.pdf", "%PDF").await;
    assert_eq!(second.name, "report_2.pdf");

    app.text_file(Some(docs.id), "archive.tar.gz", "gz").await;
    let archive = app.text_file(Some(docs.id), "archive.tar.gz", "gz").await;
    assert_eq!(archive.name, "archive_2.tar.gz");
    assert_eq!(archive.media_type(), MediaType::Archive);

    let sub = app.folder(Some(docs.id), "v1.0").await;
    let sub2 = app.folder(Some(docs.id), "v1.0").await;
    assert_ne!(sub.id, sub2.id);
    assert_eq!(sub2.name, "v1.0_2");

    let err = app
        .services
        .nodes
        .create_folder(&app.ctx().rejecting_collisions(), Some(docs.id), "v1.0", Placement::Last)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NameCollision);
}

#[tokio::test]
async fn test_upload_under_file_is_invalid_target() {
    let app = TestApp::new();
    let file = app.text_file(None, "loose.txt", "x").await;
    let err = app
        .services
        .uploads
        .upload(&app.ctx(), UploadParams::new(Some(file.id), "child.txt", Bytes::from_static(b"y")))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidTarget);
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn test_default_file_is_unique_per_folder() {
    let app = TestApp::new();
    let gallery = app.folder(None, "gallery").await;
    let ctx = app.ctx();
    let uploads = &app.services.uploads;
    let notes = app.text_file(Some(gallery.id), "notes.txt", "n").await;
    let first = uploads
        .upload(&ctx, UploadParams::new(Some(gallery.id), "first.png", png(2, 2)))
        .await
        .unwrap();
    let second = uploads
        .upload(&ctx, UploadParams::new(Some(gallery.id), "second.png", png(3, 1)))
        .await
        .unwrap();

    let nodes = &app.services.nodes;
    let fallback = nodes.default_file(gallery.id, None).await.unwrap().unwrap();
    assert_eq!(fallback.id, notes.id);
    let images = [MediaType::SupportedImage];
    let image = nodes
        .default_file(gallery.id, Some(&images[..]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(image.id, first.id);

    nodes.set_default(&ctx, first.id).await.unwrap();
    nodes.set_default(&ctx, second.id).await.unwrap();
    let flagged: Vec<_> = app
        .services
        .trees
        .children(gallery.id, false)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.is_default)
        .map(|n| n.id)
        .collect();
    assert_eq!(flagged, [second.id]);
    let chosen = nodes.default_file(gallery.id, None).await.unwrap().unwrap();
    assert_eq!(chosen.id, second.id);
    assert_eq!(chosen.payload().unwrap().dimensions.map(|d| d.width), Some(3));
}

#[tokio::test]
async fn test_local_storage_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.local.root_path = dir.path().display().to_string();
    let storage = StorageManager::from_config(&config.storage).await.unwrap();
    let services = Services::new(
        Database::in_memory(config.tree.clone()),
        storage,
        &config.storage,
    );
    let ctx = mediatree_service::OperationContext::new("tester");

    let folder = services
        .nodes
        .create_folder(&ctx, None, "media", Placement::Last)
        .await
        .unwrap();
    let node = services
        .uploads
        .upload(&ctx, UploadParams::new(Some(folder.id), "Photo 1.PNG", png(4, 4)))
        .await
        .unwrap();
    let key = node.payload().unwrap().content.as_str().to_string();
    assert!(key.starts_with("upload/") && key.ends_with(".png"));
    assert!(!key.contains("Photo"));
    assert!(dir.path().join(&key).is_file());

    services.mutations.delete(&ctx, folder.id).await.unwrap();
    assert!(!dir.path().join(&key).exists());
}
