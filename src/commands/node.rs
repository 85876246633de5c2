//! Commands that create, move, copy and delete nodes.

use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;

use mediatree_core::error::{AppError, ErrorKind};
use mediatree_core::result::AppResult;
use mediatree_entity::{Node, Placement};
use mediatree_service::UploadParams;

use super::Session;
use crate::output::{self, OutputFormat};

/// Where among the target's children a node goes
#[derive(Debug, Args)]
pub struct PlacementArgs {
    /// Place before every existing child
    #[arg(long, conflicts_with_all = ["index", "before", "after"])]
    pub first: bool,
    /// Place at a zero-based index
    #[arg(long, conflicts_with_all = ["before", "after"])]
    pub index: Option<usize>,
    /// Place immediately before this sibling (`#id` or path)
    #[arg(long, conflicts_with = "after")]
    pub before: Option<String>,
    /// Place immediately after this sibling (`#id` or path)
    #[arg(long)]
    pub after: Option<String>,
}

impl PlacementArgs {
    async fn resolve(&self, session: &Session) -> AppResult<Placement> {
        if self.first {
            return Ok(Placement::First);
        }
        if let Some(index) = self.index {
            return Ok(Placement::Index(index));
        }
        if let Some(before) = &self.before {
            return Ok(Placement::Before(session.node(before).await?.id));
        }
        if let Some(after) = &self.after {
            return Ok(Placement::After(session.node(after).await?.id));
        }
        Ok(Placement::Last)
    }
}

/// Arguments for `mkdir`
#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// Parent folder (`/` for the top level)
    pub parent: String,
    /// Folder name
    pub name: String,
    /// Fail instead of numbering a colliding name
    #[arg(long)]
    pub strict: bool,
    /// Placement among siblings
    #[command(flatten)]
    pub placement: PlacementArgs,
}

/// Arguments for `upload`
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Target folder (`/` for the top level)
    pub parent: String,
    /// Local files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Title applied to every uploaded file
    #[arg(long)]
    pub title: Option<String>,
    /// Fail instead of numbering a colliding name
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `mv` and `cp`
#[derive(Debug, Args)]
pub struct MoveArgs {
    /// Node to move or copy (`#id` or path)
    pub source: String,
    /// Target folder (`/` for the top level)
    pub target: String,
    /// Fail instead of numbering a colliding name
    #[arg(long)]
    pub strict: bool,
    /// Placement among the target's children
    #[command(flatten)]
    pub placement: PlacementArgs,
}

/// Arguments for `rm`
#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Nodes to delete (`#id` or path)
    #[arg(required = true)]
    pub nodes: Vec<String>,
}

/// Arguments for `default`
#[derive(Debug, Args)]
pub struct DefaultArgs {
    /// File to flag (`#id` or path)
    pub file: String,
}

fn context(session: &Session, strict: bool) -> mediatree_service::OperationContext {
    let ctx = session.context();
    if strict { ctx.rejecting_collisions() } else { ctx }
}

fn announce(verb: &str, node: &Node, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            output::print_success(&format!("{verb} '{}' (#{})", node.name, node.id))
        }
        OutputFormat::Json => output::print_item(node, format),
    }
}

/// Create a folder.
pub async fn mkdir(args: &MkdirArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let parent = session.parent(&args.parent).await?;
    let placement = args.placement.resolve(session).await?;
    let folder = session
        .services
        .nodes
        .create_folder(&context(session, args.strict), parent, &args.name, placement)
        .await?;
    announce("Created folder", &folder, format);
    Ok(true)
}

/// Upload files from disk. Each file is its own transaction; one failure
/// does not undo the files uploaded before it.
pub async fn upload(args: &UploadArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let parent = session.parent(&args.parent).await?;
    let mut uploaded = 0usize;
    let mut last_error = None;
    for path in &args.files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::validation(format!("Invalid file name: {}", path.display())))?
            .to_string();
        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to read {}", path.display()), e)
        })?;

        let mut params = UploadParams::new(parent, file_name, Bytes::from(data));
        if let Some(title) = &args.title {
            params.metadata.title = title.clone();
        }
        match session
            .services
            .uploads
            .upload(&context(session, args.strict), params)
            .await
        {
            Ok(node) => {
                uploaded += 1;
                announce("Uploaded", &node, format);
            }
            Err(e) => {
                output::print_warning(&format!("{}: {e}", path.display()));
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) if uploaded == 0 => Err(e),
        _ => Ok(uploaded > 0),
    }
}

/// Move a node.
pub async fn move_node(args: &MoveArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let source = session.node(&args.source).await?;
    let target = session.parent(&args.target).await?;
    let placement = args.placement.resolve(session).await?;
    let moved = session
        .services
        .mutations
        .move_node(&context(session, args.strict), source.id, target, placement)
        .await?;
    announce("Moved", &moved, format);
    Ok(true)
}

/// Copy a node and its subtree.
pub async fn copy_node(args: &MoveArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let source = session.node(&args.source).await?;
    let target = session.parent(&args.target).await?;
    let placement = args.placement.resolve(session).await?;
    let copied = session
        .services
        .mutations
        .copy_node(&context(session, args.strict), source.id, target, placement)
        .await?;
    announce("Copied to", &copied, format);
    Ok(true)
}

/// Delete nodes.
pub async fn remove(args: &RemoveArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let mut ids = Vec::with_capacity(args.nodes.len());
    for arg in &args.nodes {
        ids.push(session.node(arg).await?.id);
    }
    let report = session.services.mutations.delete_many_retaining(&ids).await?;
    session.defer_release(&report.released).await;
    match format {
        OutputFormat::Table => output::print_success(&format!(
            "Deleted {} node(s), {} content object(s) no longer referenced",
            report.removed,
            report.released.len()
        )),
        OutputFormat::Json => output::print_item(&report, format),
    }
    Ok(true)
}

/// Flag a file as its folder's default.
pub async fn set_default(args: &DefaultArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let file = session.node(&args.file).await?;
    let node = session
        .services
        .nodes
        .set_default(&session.context(), file.id)
        .await?;
    announce("Default file is now", &node, format);
    Ok(true)
}
