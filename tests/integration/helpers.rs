//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;

use mediatree_core::config::AppConfig;
use mediatree_core::config::tree::TreeConfig;
use mediatree_core::types::NodeId;
use mediatree_database::Database;
use mediatree_entity::{Node, Placement};
use mediatree_service::{OperationContext, Services, UploadParams};
use mediatree_storage::{MemoryContentStorage, StorageManager};

/// Test application context
pub struct TestApp {
    /// All services over one in-memory table
    pub services: Services,
    /// The content store behind the services
    pub blobs: MemoryContentStorage,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application with default settings
    pub fn new() -> Self {
        Self::with_tree_config(TreeConfig::default())
    }

    /// Create a new test application with custom tree settings
    pub fn with_tree_config(tree: TreeConfig) -> Self {
        let mut config = AppConfig::default();
        config.tree = tree;
        config.storage.provider = "memory".to_string();
        Self::from_db(Database::in_memory(config.tree.clone()), config)
    }

    /// Wrap an existing database
    pub fn from_db(db: Database, config: AppConfig) -> Self {
        let blobs = MemoryContentStorage::new();
        let storage = StorageManager::with_provider(Arc::new(blobs.clone()), &config.storage);
        let services = Services::new(db, storage, &config.storage);
        Self {
            services,
            blobs,
            config,
        }
    }

    /// A context for the test actor
    pub fn ctx(&self) -> OperationContext {
        OperationContext::new("tester")
    }

    /// Create a folder, panicking on failure
    pub async fn folder(&self, parent: Option<NodeId>, name: &str) -> Node {
        self.services
            .nodes
            .create_folder(&self.ctx(), parent, name, Placement::Last)
            .await
            .expect("create folder")
    }

    /// Upload a small text file, panicking on failure
    pub async fn text_file(&self, parent: Option<NodeId>, name: &str, body: &'static str) -> Node {
        self.services
            .uploads
            .upload(
                &self.ctx(),
                UploadParams::new(parent, name, Bytes::from_static(body.as_bytes())),
            )
            .await
            .expect("upload file")
    }

    /// Names of a folder's children, in order
    pub async fn child_names(&self, id: NodeId) -> Vec<String> {
        self.services
            .trees
            .children(id, false)
            .await
            .expect("children")
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    /// Names of the top-level nodes, in order
    pub async fn root_names(&self) -> Vec<String> {
        self.services
            .trees
            .roots(false)
            .await
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    /// Assert that every tree satisfies the nested-set invariants
    pub async fn assert_consistent(&self) {
        let report = self.services.trees.check(None).await;
        assert!(report.is_ok(), "violations: {:#?}", report.violations);
        for node in self.services.trees.repository().forest().await {
            let descendants = self
                .services
                .trees
                .repository()
                .descendants(node.id)
                .await
                .expect("descendants");
            assert_eq!(descendants.len() as u64, node.descendant_count());
        }
    }
}
