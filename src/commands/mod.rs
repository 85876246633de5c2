//! CLI command definitions and dispatch.

pub mod config;
pub mod maintenance;
pub mod node;
pub mod query;

use std::path::Path;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use mediatree_core::config::AppConfig;
use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{ContentRef, NodeId};
use mediatree_database::Database;
use mediatree_entity::Node;
use mediatree_service::{OperationContext, Services};
use mediatree_storage::StorageManager;

use crate::output::OutputFormat;

/// Media tree: nested-set media library management
#[derive(Debug, Parser)]
#[command(name = "mediatree", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Actor recorded as creator/modifier
    #[arg(long, env = "MEDIATREE_ACTOR")]
    pub actor: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a folder
    Mkdir(node::MkdirArgs),
    /// Upload a file from disk
    Upload(node::UploadArgs),
    /// Move a node
    Mv(node::MoveArgs),
    /// Copy a node and its subtree
    Cp(node::MoveArgs),
    /// Delete nodes and their subtrees
    Rm(node::RemoveArgs),
    /// Make a file its folder's default
    Default(node::DefaultArgs),
    /// List children of a folder (or the top level)
    Ls(query::LsArgs),
    /// Show a subtree as an outline
    Tree(query::TreeArgs),
    /// Resolve a path to a node
    Resolve(query::ResolveArgs),
    /// Recompute bounds from parent pointers
    Rebuild(maintenance::RebuildArgs),
    /// Check nested-set invariants
    Check(maintenance::CheckArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        if let Commands::Config(args) = &self.command {
            return config::execute(args, &config, self.format);
        }

        let session = Session::open(config, self.actor.clone()).await?;
        let mutated = match &self.command {
            Commands::Mkdir(args) => node::mkdir(args, &session, self.format).await?,
            Commands::Upload(args) => node::upload(args, &session, self.format).await?,
            Commands::Mv(args) => node::move_node(args, &session, self.format).await?,
            Commands::Cp(args) => node::copy_node(args, &session, self.format).await?,
            Commands::Rm(args) => node::remove(args, &session, self.format).await?,
            Commands::Default(args) => node::set_default(args, &session, self.format).await?,
            Commands::Ls(args) => query::ls(args, &session, self.format).await?,
            Commands::Tree(args) => query::tree(args, &session, self.format).await?,
            Commands::Resolve(args) => query::resolve(args, &session, self.format).await?,
            Commands::Rebuild(args) => maintenance::rebuild(args, &session, self.format).await?,
            Commands::Check(args) => maintenance::check(args, &session, self.format).await?,
            Commands::Config(_) => false,
        };
        session.finish(mutated).await
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> AppResult<AppConfig> {
    let env = std::env::var("MEDIATREE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(config_path.trim_end_matches(".toml"), &env)
}

/// An open node table plus services for one CLI invocation.
pub struct Session {
    /// Loaded configuration.
    pub config: AppConfig,
    /// Services over the table.
    pub services: Services,
    actor: Option<String>,
    pending_release: Mutex<Vec<ContentRef>>,
}

impl Session {
    /// Load the snapshot and build the configured storage.
    pub async fn open(config: AppConfig, actor: Option<String>) -> AppResult<Self> {
        let db = Database::open(&config.database, config.tree.clone()).await?;
        let storage = StorageManager::from_config(&config.storage).await?;
        let services = Services::new(db, storage, &config.storage);
        Ok(Self {
            config,
            services,
            actor,
            pending_release: Mutex::new(Vec::new()),
        })
    }

    /// A fresh context for one operation.
    pub fn context(&self) -> OperationContext {
        match &self.actor {
            Some(actor) => OperationContext::new(actor.clone()),
            None => OperationContext::system(),
        }
    }

    /// Queue content to delete once the snapshot no longer references it.
    pub async fn defer_release(&self, content: &[ContentRef]) {
        self.pending_release.lock().await.extend_from_slice(content);
    }

    /// Save the snapshot after a mutation when autosave is on, then release
    /// queued content. Content is kept when the snapshot is not saved.
    pub async fn finish(self, mutated: bool) -> AppResult<()> {
        let ctx = self.context();
        let pending = self.pending_release.into_inner();
        if !mutated {
            return Ok(());
        }
        if !self.config.database.autosave {
            if !pending.is_empty() {
                warn!(
                    count = pending.len(),
                    "Autosave is off; keeping unreferenced content"
                );
            }
            return Ok(());
        }
        let path = Path::new(&self.config.database.snapshot_path);
        self.services.db.save(path).await?;
        debug!(path = %path.display(), "Snapshot saved");

        let failed = self.services.mutations.release_content(&ctx, &pending).await;
        if failed > 0 {
            crate::output::print_warning(&format!("{failed} content object(s) could not be released"));
        }
        Ok(())
    }

    /// Resolve a node argument: `#<id>` or a `/`-separated path.
    pub async fn node(&self, arg: &str) -> AppResult<Node> {
        match arg.strip_prefix('#') {
            Some(raw) => {
                let id: NodeId = raw
                    .parse()
                    .map_err(|_| AppError::validation(format!("Invalid node id '{arg}'")))?;
                self.services.nodes.get(id).await
            }
            None => self.services.nodes.resolve_path(arg).await,
        }
    }

    /// Resolve a parent argument, where `/` means the top level.
    pub async fn parent(&self, arg: &str) -> AppResult<Option<NodeId>> {
        if arg.trim_matches('/').is_empty() {
            return Ok(None);
        }
        Ok(Some(self.node(arg).await?.id))
    }
}
