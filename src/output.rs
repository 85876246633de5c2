//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use mediatree_entity::{Node, TreeNodeView};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One node as a table row.
#[derive(Debug, Serialize, Tabled)]
pub struct NodeRow {
    /// Node ID
    id: u64,
    /// Name
    name: String,
    /// Media type
    #[tabled(rename = "type")]
    media_type: String,
    /// Tree
    tree: u64,
    /// Bounds
    bounds: String,
    /// Depth
    depth: u32,
    /// Size in bytes
    size: String,
    /// Default file flag
    default: bool,
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.get(),
            name: node.name.clone(),
            media_type: node.media_type().to_string(),
            tree: node.tree_id.get(),
            bounds: format!("{}..{}", node.left, node.right),
            depth: node.depth,
            size: node.size().map(|s| s.to_string()).unwrap_or_default(),
            default: node.is_default,
        }
    }
}

/// Print a list of nodes in the selected format
pub fn print_nodes(nodes: &[Node], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
            print_list(&rows, format);
        }
        OutputFormat::Json => print_item(&nodes, format),
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{item:#?}"),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}

/// Print nested views as an indented outline.
pub fn print_outline(views: &[TreeNodeView], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if views.is_empty() {
                println!("No results found.");
            }
            for view in views {
                outline(view, 0);
            }
        }
        OutputFormat::Json => print_item(&views, format),
    }
}

fn outline(view: &TreeNodeView, indent: usize) {
    let marker = if view.children.is_empty() { "-" } else { "+" };
    println!(
        "{:indent$}{marker} {} [{}] #{}",
        "",
        view.name,
        view.media_type,
        view.id,
        indent = indent * 2
    );
    for child in &view.children {
        outline(child, indent + 1);
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}
