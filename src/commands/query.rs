//! Read-only commands: listing, outlines, and path resolution.

use clap::Args;

use mediatree_core::result::AppResult;

use super::Session;
use crate::output::{self, OutputFormat};

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder to list (`/` for the top level)
    #[arg(default_value = "/")]
    pub folder: String,
    /// Only list published nodes
    #[arg(long)]
    pub published: bool,
}

/// Arguments for `tree`
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Subtree root (omit for the whole forest)
    pub node: Option<String>,
    /// Only show folders
    #[arg(long, conflicts_with = "node")]
    pub folders: bool,
}

/// Arguments for `resolve`
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Path such as `Photos/2024/beach.jpg`
    pub path: String,
    /// Also print breadcrumbs and aggregates
    #[arg(long)]
    pub details: bool,
}

/// List children.
pub async fn ls(args: &LsArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let trees = &session.services.trees;
    let nodes = match session.parent(&args.folder).await? {
        Some(id) => trees.children(id, args.published).await?,
        None => trees.roots(args.published).await,
    };
    output::print_nodes(&nodes, format);
    Ok(false)
}

/// Print an outline.
pub async fn tree(args: &TreeArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let trees = &session.services.trees;
    let views = match &args.node {
        Some(arg) => {
            let node = session.node(arg).await?;
            vec![trees.subtree(node.id).await?]
        }
        None if args.folders => trees.folder_tree().await.roots,
        None => trees.forest().await.roots,
    };
    output::print_outline(&views, format);
    Ok(false)
}

/// Resolve a path.
pub async fn resolve(args: &ResolveArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let node = session.services.nodes.resolve_path(&args.path).await?;
    output::print_nodes(std::slice::from_ref(&node), format);

    if args.details {
        let trees = &session.services.trees;
        let crumbs = trees.breadcrumbs(node.id).await?;
        let trail: Vec<&str> = crumbs.iter().map(|b| b.name.as_str()).collect();
        output::print_kv("Breadcrumbs", &trail.join(" › "));
        output::print_kv("Descendants", &node.descendant_count().to_string());
        output::print_kv("Total size", &trees.total_size(node.id).await?.to_string());
        output::print_kv(
            "Metadata complete",
            &trees
                .has_metadata_including_descendants(node.id)
                .await?
                .to_string(),
        );
        if node.is_folder() {
            let default = session.services.nodes.default_file(node.id, None).await?;
            output::print_kv(
                "Default file",
                default.as_ref().map(|n| n.name.as_str()).unwrap_or("-"),
            );
        }
    }
    Ok(false)
}
