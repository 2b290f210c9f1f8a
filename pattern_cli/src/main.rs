mod config;
mod report;

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pattern_miner::{
    build_influence_tree, build_influence_tree_from, count_patterns_parallel, group_by_user,
    mine_patterns, read_event_file, read_pattern_file, InfluenceTree, MiningError, Pattern,
    PatternWrapper, TreeConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, Overrides};

#[derive(Debug, Parser)]
#[command(name = "pmine")]
#[command(about = "Sequential pattern mining and influence trees", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mine patterns from a sorted event file and build the goal's influence tree
    Mine {
        events: PathBuf,
        #[arg(long)]
        goal: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write every mined pattern as JSON lines
        #[arg(long)]
        patterns_out: Option<PathBuf>,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Count the given patterns over a sorted event file
    Count {
        events: PathBuf,
        /// Comma separated event names, e.g. A,B,C
        #[arg(short, long = "pattern", required = true)]
        patterns: Vec<String>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Build an influence tree from previously mined patterns
    Tree {
        patterns: PathBuf,
        #[arg(long)]
        goal: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Print a tree JSON file as an indented table
    Report { tree: PathBuf },
}

#[derive(Debug, Args)]
struct Tuning {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    max_len: Option<usize>,
    #[arg(long)]
    min_support: Option<u64>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Mine {
            events,
            goal,
            start,
            output,
            patterns_out,
            tuning,
        } => {
            let config = load_config(
                tuning.config.as_deref(),
                Overrides {
                    max_len: tuning.max_len,
                    min_support: tuning.min_support,
                    workers: tuning.workers,
                    max_depth: tuning.max_depth,
                },
            )?;

            let records = read_event_file(&events)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("failed to load events: {}", events.display()))?;
            let users = group_by_user(records);

            let outcome = mine_patterns(&users, &config)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .context("mining failed")?;
            info!(patterns = outcome.patterns.len(), "mining finished");

            if let Some(path) = &patterns_out {
                write_patterns(path, &outcome.patterns)?;
            }

            let wrapper = outcome.into_wrapper();
            let tree = build_tree(&wrapper, &goal, start.as_deref(), &config.tree)?;
            write_tree(&tree, output.as_deref())?;
        }
        Command::Count {
            events,
            patterns,
            workers,
        } => {
            let records = read_event_file(&events)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("failed to load events: {}", events.display()))?;
            let users = group_by_user(records);

            let mut counted = patterns
                .iter()
                .map(|raw| {
                    let names: Vec<&str> = raw.split(',').map(str::trim).collect();
                    Pattern::new(&names)
                        .map_err(|e| anyhow::anyhow!(e.to_string()))
                        .with_context(|| format!("invalid pattern: {raw}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            count_patterns_parallel(&users, &mut counted, workers.unwrap_or(1));

            let records: Vec<_> = counted.iter().map(Pattern::to_record).collect();
            let json =
                serde_json::to_string_pretty(&records).context("failed to serialize patterns")?;
            println!("{json}");
        }
        Command::Tree {
            patterns,
            goal,
            start,
            output,
            config,
            max_depth,
        } => {
            let config = load_config(
                config.as_deref(),
                Overrides {
                    max_depth,
                    ..Overrides::default()
                },
            )?;

            let loaded = read_pattern_file(&patterns)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("failed to load patterns: {}", patterns.display()))?;
            let wrapper = PatternWrapper::new(loaded);
            let tree = build_tree(&wrapper, &goal, start.as_deref(), &config.tree)?;
            write_tree(&tree, output.as_deref())?;
        }
        Command::Report { tree } => {
            let src = fs::read_to_string(&tree)
                .with_context(|| format!("failed to read: {}", tree.display()))?;
            let doc = serde_json::from_str(&src)
                .with_context(|| format!("invalid tree json: {}", tree.display()))?;
            print!("{}", report::render_tree(&doc));
        }
    }

    Ok(())
}

fn build_tree(
    wrapper: &PatternWrapper,
    goal: &str,
    start: Option<&str>,
    config: &TreeConfig,
) -> anyhow::Result<InfluenceTree> {
    let tree: Result<InfluenceTree, MiningError> = match start {
        Some(start) => build_influence_tree_from(start, goal, wrapper, config),
        None => build_influence_tree(goal, wrapper, config),
    };
    tree.map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("influence tree failed for goal: {goal}"))
}

fn write_tree(tree: &InfluenceTree, output: Option<&Path>) -> anyhow::Result<()> {
    let json =
        serde_json::to_string_pretty(&tree.to_document()).context("failed to serialize tree")?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write: {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn write_patterns(path: &Path, patterns: &[Pattern]) -> anyhow::Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("failed to create: {}", path.display()))?;
    for pattern in patterns {
        let line = serde_json::to_string(&pattern.to_record())
            .context("failed to serialize pattern")?;
        writeln!(file, "{line}").with_context(|| format!("failed to write: {}", path.display()))?;
    }
    Ok(())
}
