//! Radial CLI - lay out record datasets and drive a headless viewer.
//!
//! Results are written to stdout as JSON, logs go to stderr.

mod logger;

use anyhow::{Context, Result};
use api::{execute_command, execute_query, Command, CommandResult, Query, QueryResult};
use clap::{Parser, Subcommand};
use glam::Vec3;
use logger::CliLogger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tree::{NodeId, Record, TreeBuilder};
use viewer::{Viewer, ViewerConfig};

/// Radial CLI - 3D radial tree layouts from flat records
#[derive(Parser)]
#[command(name = "radial")]
#[command(about = "Command-line interface for the radial tree viewer")]
struct Cli {
    /// Viewer configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and lay out the forest, printing node positions
    Layout {
        /// Records file (JSON array)
        records: PathBuf,

        /// Override the configured maximum depth
        #[arg(short = 'd', long)]
        max_depth: Option<i32>,
    },

    /// Execute a script of commands and queries against a headless viewer
    Run {
        /// Records file (JSON array)
        records: PathBuf,

        /// Script file (JSON array of commands and queries)
        script: PathBuf,
    },

    /// Send a single query to a freshly built viewer
    Query {
        /// Records file (JSON array)
        records: PathBuf,

        /// JSON query to execute
        json: String,
    },
}

/// One entry of a `run` script.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptStep {
    Command(Command),
    Query(Query),
}

#[derive(Serialize)]
#[serde(untagged)]
enum StepOutput {
    Command(CommandResult),
    Query(QueryResult),
}

#[derive(Serialize)]
struct TreeLayout {
    index: usize,
    offset: Vec3,
    outer_radius: f32,
    level_radii: Vec<f32>,
    nodes: Vec<NodeLayout>,
}

#[derive(Serialize)]
struct NodeLayout {
    id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<NodeId>,
    level: usize,
    angle: f32,
    position: Vec3,
    text: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    CliLogger::init(CliLogger::level_for(cli.verbose))?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Layout { records, max_depth } => {
            let mut config = config;
            if let Some(depth) = max_depth {
                config.max_depth = depth;
            }
            let records = load_records(&records)?;
            print_json(&layout(&config, &records), cli.pretty)
        }
        Commands::Run { records, script } => {
            let records = load_records(&records)?;
            let steps = load_script(&script)?;
            run_script(config, records, steps, cli.pretty)
        }
        Commands::Query { records, json } => {
            let query: Query = serde_json::from_str(&json).context("Invalid query JSON")?;
            let viewer = Viewer::new(config, load_records(&records)?);
            print_json(&execute_query(&viewer, query), cli.pretty)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = ViewerConfig::from_json(&json)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}

fn load_records(path: &Path) -> Result<Vec<Record>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid records {}", path.display()))?;
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid script {}", path.display()))
}

fn layout(config: &ViewerConfig, records: &[Record]) -> Vec<TreeLayout> {
    let mut builder = TreeBuilder::new();
    let forest = builder.build(records, &config.build_options());
    log::info!("laid out {} trees", forest.len());

    forest
        .iter()
        .enumerate()
        .map(|(index, laid_out)| {
            let tree = &laid_out.tree;
            let nodes = tree
                .preorder()
                .into_iter()
                .filter_map(|key| {
                    let node = tree.get(key)?;
                    Some(NodeLayout {
                        id: node.id,
                        parent: tree.parent_id(key),
                        level: node.level,
                        angle: node.angle,
                        position: node.position,
                        text: node.text.clone(),
                    })
                })
                .collect();
            TreeLayout {
                index,
                offset: laid_out.offset,
                outer_radius: laid_out.outer_radius,
                level_radii: laid_out.level_radii.as_slice().to_vec(),
                nodes,
            }
        })
        .collect()
}

fn run_script(
    config: ViewerConfig,
    records: Vec<Record>,
    steps: Vec<ScriptStep>,
    pretty: bool,
) -> Result<()> {
    let mut viewer = Viewer::new(config, records);
    let mut failures = 0;

    for (index, step) in steps.into_iter().enumerate() {
        let output = match step {
            ScriptStep::Command(command) => {
                let result = execute_command(&mut viewer, command);
                if let CommandResult::Error { message } = &result {
                    log::warn!("step {index}: {message}");
                    failures += 1;
                }
                StepOutput::Command(result)
            }
            ScriptStep::Query(query) => StepOutput::Query(execute_query(&viewer, query)),
        };
        print_json(&output, pretty)?;
    }

    viewer.dispose();
    if failures > 0 {
        anyhow::bail!("{failures} script step(s) failed");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::root(1, "root"),
            Record::child(2, 1, "a"),
            Record::child(3, 1, "b"),
            Record::child(4, 2, "a1"),
            Record::root(10, "other"),
        ]
    }

    #[test]
    fn test_layout_output() {
        let trees = layout(&ViewerConfig::default(), &records());
        assert_eq!(trees.len(), 2);

        let first = &trees[0];
        let ids: Vec<u64> = first.nodes.iter().map(|n| n.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert_eq!(first.nodes[0].parent, None);
        assert_eq!(first.nodes[2].parent, Some(NodeId(2)));
        assert_eq!(first.nodes[0].position, first.offset);

        let json = serde_json::to_value(&trees).unwrap();
        assert!(json[0]["nodes"][0].get("parent").is_none());
        assert_eq!(json[1]["nodes"][0]["text"], "other");
    }

    #[test]
    fn test_script_steps_parse_commands_and_queries() {
        let steps: Vec<ScriptStep> = serde_json::from_str(
            r#"[
                {"type": "select_node", "id": 4},
                {"type": "get_selection"},
                {"type": "advance_time", "seconds": 1}
            ]"#,
        )
        .unwrap();
        assert!(matches!(
            steps[0],
            ScriptStep::Command(Command::SelectNode { id: NodeId(4) })
        ));
        assert!(matches!(steps[1], ScriptStep::Query(Query::GetSelection)));
        assert!(matches!(
            steps[2],
            ScriptStep::Command(Command::AdvanceTime { .. })
        ));
    }

    #[test]
    fn test_run_script_reports_failures() {
        let steps = vec![
            ScriptStep::Command(Command::ZoomIn),
            ScriptStep::Command(Command::SelectNode { id: NodeId(99) }),
        ];
        let result = run_script(ViewerConfig::default(), records(), steps, false);
        assert!(result.is_err());
    }
}
