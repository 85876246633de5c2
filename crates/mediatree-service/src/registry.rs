//! Wires every service over one database and storage manager.

use mediatree_core::config::storage::StorageConfig;
use mediatree_database::Database;
use mediatree_storage::StorageManager;

use crate::mutation::MutationService;
use crate::node::{NodeService, UploadService};
use crate::tree::TreeService;

/// All media tree services sharing one node table.
#[derive(Debug, Clone)]
pub struct Services {
    /// The node table handle.
    pub db: Database,
    /// Folder creation and field edits.
    pub nodes: NodeService,
    /// File uploads.
    pub uploads: UploadService,
    /// Move, copy, delete, rebuild.
    pub mutations: MutationService,
    /// Read views.
    pub trees: TreeService,
}

impl Services {
    /// Build every service.
    pub fn new(db: Database, storage: StorageManager, config: &StorageConfig) -> Self {
        Self {
            nodes: NodeService::new(db.clone(), storage.clone()),
            uploads: UploadService::new(db.clone(), storage.clone(), config.clone()),
            mutations: MutationService::new(db.clone(), storage),
            trees: TreeService::new(db.clone()),
            db,
        }
    }
}
