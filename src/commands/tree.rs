//! # Tree Command Implementation
//!
//! Displays the `-r` reference graph of the input files. Each root is an
//! environment nothing else references; its children are the environments
//! it references. Shared references appear under every environment that
//! references them.
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use super::args::{run_options, DiscoveryArgs};
use pip_compile_multi::phases::discovery::discover;
use pip_compile_multi::phases::EnvGraph;
use pip_compile_multi::suggestions;

/// Display the reference graph of the input files
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Maximum depth to display in the tree.
    ///
    /// Use 0 to show only the environments nothing references.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let max_depth = args.depth.unwrap_or(usize::MAX);
    for options in run_options(&args.discovery, None, true)? {
        let graph = discover(&options.input_pattern()).map_err(suggestions::explain)?;
        let root = TreeNode {
            label: options.directory.display().to_string(),
            children: roots(&graph)
                .into_iter()
                .map(|path| build_tree_node(&graph, path, max_depth, 0))
                .collect(),
        };
        print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    }
    Ok(())
}

/// Environments that no other environment references, in lock order.
fn roots(graph: &EnvGraph) -> Vec<&Path> {
    graph
        .iter()
        .filter(|env| {
            !graph
                .iter()
                .any(|other| other.refs.iter().any(|reference| reference.path == env.in_path))
        })
        .map(|env| env.in_path.as_path())
        .collect()
}

fn build_tree_node(graph: &EnvGraph, path: &Path, max_depth: usize, depth: usize) -> TreeNode {
    let Some(env) = graph.get(path) else {
        return TreeNode {
            label: path.display().to_string(),
            children: vec![],
        };
    };
    let label = format!("{} ({})", env.name, env.in_path.display());
    if depth >= max_depth {
        return TreeNode {
            label,
            children: vec![],
        };
    }
    let children = env
        .refs
        .iter()
        .map(|reference| build_tree_node(graph, &reference.path, max_depth, depth + 1))
        .collect();
    TreeNode { label, children }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
