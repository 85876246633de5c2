//! Integrity check and rebuild commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::TreeId;

use super::Session;
use crate::output::{self, OutputFormat};

/// Arguments for `rebuild`
#[derive(Debug, Args)]
pub struct RebuildArgs {
    /// Rebuild only this tree
    #[arg(long)]
    pub tree: Option<u64>,
}

/// Arguments for `check`
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Check only this tree
    #[arg(long)]
    pub tree: Option<u64>,
}

/// One violation as a table row.
#[derive(Debug, Serialize, Tabled)]
struct ViolationRow {
    /// Tree
    tree: u64,
    /// Node
    node: String,
    /// What is wrong
    problem: String,
}

/// Rebuild bounds from parent pointers.
pub async fn rebuild(args: &RebuildArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let ctx = session.context();
    let mutations = &session.services.mutations;
    let report = match args.tree {
        Some(tree) => mutations.rebuild_tree(&ctx, TreeId::new(tree)).await?,
        None => mutations.rebuild(&ctx).await?,
    };
    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "Rebuilt {} tree(s), {} node(s), {} changed",
                report.trees, report.nodes, report.changed
            ));
            if !report.promoted.is_empty() {
                let ids: Vec<String> = report.promoted.iter().map(|id| format!("#{id}")).collect();
                output::print_warning(&format!("Promoted to top level: {}", ids.join(", ")));
            }
        }
        OutputFormat::Json => output::print_item(&report, format),
    }
    Ok(report.changed > 0 || !report.promoted.is_empty())
}

/// Report invariant violations. Fails when any are found.
pub async fn check(args: &CheckArgs, session: &Session, format: OutputFormat) -> AppResult<bool> {
    let report = session
        .services
        .trees
        .check(args.tree.map(TreeId::new))
        .await;
    match format {
        OutputFormat::Table => {
            let rows: Vec<ViolationRow> = report
                .violations
                .iter()
                .map(|v| ViolationRow {
                    tree: v.tree_id.get(),
                    node: v.node_id.map(|id| format!("#{id}")).unwrap_or_default(),
                    problem: v.message.clone(),
                })
                .collect();
            if rows.is_empty() {
                output::print_success(&format!(
                    "{} tree(s), {} node(s): no violations",
                    report.trees_checked, report.nodes_checked
                ));
            } else {
                output::print_list(&rows, format);
            }
        }
        OutputFormat::Json => output::print_item(&report, format),
    }
    if report.is_ok() {
        Ok(false)
    } else {
        Err(AppError::tree_corruption(format!(
            "{} violation(s) found; run `mediatree rebuild`",
            report.violations.len()
        )))
    }
}
