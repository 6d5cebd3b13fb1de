//! Pyramid command-line driver.
//!
//! Opens a project from the file store, runs one gesture, and prints the
//! result. Blocks are named by id, unique id prefix, or exact title.
//!
//! Usage:
//!   pyramid add roadmap "Write the parser"
//!   pyramid move roadmap parser 0 --index 0
//!   pyramid connect roadmap "Ship it" parser --color green
//!   pyramid arrange roadmap
//!   pyramid show roadmap

mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use pyramid_engine::{EngineConfig, FileStore, LayeredArranger, ProjectSession, tiers};
use pyramid_telemetry::{TracingConfig, init_tracing};
use pyramid_types::{BlockId, BlockPatch, Color, Level, NewBlock, ProjectId, resolve_block_prefix};

/// Arrange work items into a pyramid of tiers with dependency edges.
#[derive(Parser, Debug)]
#[command(name = "pyramid")]
#[command(about = "Arrange blocks into a tiered pyramid with dependency edges")]
struct Args {
    /// Config file (default: $PYRAMID_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding project documents (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List projects in the data directory
    Projects,

    /// Show tiers, pool, edges and palette of a project
    Show { project: String },

    /// Create a block in the pool, optionally placing it
    Add {
        project: String,
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
        /// Tier to place the new block on
        #[arg(long)]
        level: Option<String>,
        /// Position within that tier (default: end)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Change a block's title, description or category
    Edit {
        project: String,
        block: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
    },

    /// Move a block to a tier ("pool" for the pool)
    Move {
        project: String,
        block: String,
        level: String,
        /// Final position within the tier (default: end)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Delete a block and close the gap in its tier
    Delete { project: String, block: String },

    /// Add a dependency edge FROM -> TO
    Connect {
        project: String,
        from: String,
        to: String,
        /// Edge color (hex or name); must be in the palette
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove the dependency edge FROM -> TO
    Disconnect {
        project: String,
        from: String,
        to: String,
    },

    /// Show or extend the project's color palette
    Palette {
        project: String,
        #[command(subcommand)]
        action: Option<PaletteAction>,
    },

    /// Arrange blocks by dependency depth (default: every pooled block)
    Arrange {
        project: String,
        blocks: Vec<String>,
    },

    /// Delete every block and clear the arrangement note
    Reset {
        project: String,
        /// Required; reset cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PaletteAction {
    /// Enable a master color
    Add { color: String },
    /// List master colors not yet enabled
    Available,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut tracing_config = TracingConfig::new("pyramid").with_log_dir_from_env();
    if let Some(filter) = &config.log_filter {
        tracing_config = tracing_config.with_default_filter(filter.as_str());
    }
    let _log_guard = init_tracing(&tracing_config);

    match run(args.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)?
            .with_env_overrides(|key| std::env::var(key).ok()),
        None => EngineConfig::load()?,
    };
    Ok(match &args.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

fn store(config: &EngineConfig) -> Arc<FileStore> {
    let arranger = Arc::new(LayeredArranger::new(config.max_arranged_level));
    Arc::new(FileStore::with_arranger(&config.data_dir, arranger))
}

async fn open(config: &EngineConfig, project: &str) -> Result<ProjectSession> {
    let session = ProjectSession::open(store(config), ProjectId::new(project))
        .await
        .with_context(|| format!("failed to open project {project}"))?;
    Ok(session.with_min_display_level(config.min_display_level))
}

fn resolve(session: &ProjectSession, query: &str) -> Result<BlockId> {
    let entries = session.blocks().iter().map(|b| (&b.id, b.title.as_str()));
    Ok(resolve_block_prefix(entries, query)?)
}

fn parse_level(s: &str) -> Result<Level> {
    Level::from_str(s).with_context(|| format!("invalid level {s:?}: expected a tier number or \"pool\""))
}

fn parse_color(s: &str) -> Result<Color> {
    Color::from_str(s).with_context(|| {
        let names: Vec<&str> = Color::master().map(|c| c.name()).collect();
        format!("unknown color {s:?}: expected one of {}", names.join(", "))
    })
}

async fn run(command: Command, config: &EngineConfig) -> Result<()> {
    match command {
        Command::Projects => {
            for project in store(config).projects().await? {
                println!("{project}");
            }
        }

        Command::Show { project } => {
            let session = open(config, &project).await?;
            print!("{}", render::project(&session));
        }

        Command::Add {
            project,
            title,
            description,
            category,
            level,
            index,
        } => {
            let level = level.as_deref().map(parse_level).transpose()?;
            if level.is_none() && index.is_some() {
                bail!("--index requires --level");
            }
            let mut session = open(config, &project).await?;
            let order = tiers::next_order(session.blocks(), Level::POOL);
            let mut new = NewBlock::pooled(title, order);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(category) = category {
                new = new.with_category(category);
            }
            let block = session.create_block(new).await?;
            if let Some(level) = level {
                session.move_block(&block.id, level, index).await?;
            }
            let block = session.block(&block.id).unwrap_or(&block);
            println!("{}", render::block_line(block));
        }

        Command::Edit {
            project,
            block,
            title,
            description,
            category,
        } => {
            let mut session = open(config, &project).await?;
            let id = resolve(&session, &block)?;
            let mut patch = BlockPatch::default();
            if let Some(title) = title {
                patch = patch.with_title(title);
            }
            if let Some(description) = description {
                patch = patch.with_description(description);
            }
            if let Some(category) = category {
                patch = patch.with_category(category);
            }
            if patch.is_empty() {
                bail!("nothing to change: pass --title, --description or --category");
            }
            let block = session.edit_block(&id, patch).await?;
            println!("{}", render::block_line(&block));
        }

        Command::Move {
            project,
            block,
            level,
            index,
        } => {
            let mut session = open(config, &project).await?;
            let id = resolve(&session, &block)?;
            let plan = session.move_block(&id, parse_level(&level)?, index).await?;
            if plan.is_noop() {
                println!("already in place");
            } else {
                println!("moved {} {} -> {} ({} writes)", id.short(), plan.from, plan.to, plan.writes.len());
            }
        }

        Command::Delete { project, block } => {
            let mut session = open(config, &project).await?;
            let id = resolve(&session, &block)?;
            session.delete_block(&id).await?;
            println!("deleted {}", id.short());
        }

        Command::Connect {
            project,
            from,
            to,
            color,
        } => {
            let mut session = open(config, &project).await?;
            let from = resolve(&session, &from)?;
            let to = resolve(&session, &to)?;
            if let Some(color) = color {
                session.select_color(parse_color(&color)?)?;
            }
            session.begin_connection(&from)?;
            match session.complete_connection(&to).await? {
                Some(edge) => println!("{}", render::edge_line(&session, &edge)),
                None => println!("cancelled: a block cannot depend on itself"),
            }
        }

        Command::Disconnect { project, from, to } => {
            let mut session = open(config, &project).await?;
            let from = resolve(&session, &from)?;
            let to = resolve(&session, &to)?;
            if session.remove_dependency(&from, &to).await? {
                println!("removed {} -> {}", from.short(), to.short());
            } else {
                println!("no such dependency");
            }
        }

        Command::Palette { project, action } => {
            let mut session = open(config, &project).await?;
            match action {
                None => print!("{}", render::palette(session.palette())),
                Some(PaletteAction::Add { color }) => {
                    let color = parse_color(&color)?;
                    if session.add_color(color).await? {
                        println!("enabled {} {}", color.name(), color);
                    } else {
                        println!("{} is already enabled", color.name());
                    }
                }
                Some(PaletteAction::Available) => {
                    for color in session.palette().available() {
                        println!("{color}  {}", color.name());
                    }
                }
            }
        }

        Command::Arrange { project, blocks } => {
            let mut session = open(config, &project).await?;
            let ids: Vec<BlockId> = if blocks.is_empty() {
                session.pool().iter().map(|b| b.id.clone()).collect()
            } else {
                blocks
                    .iter()
                    .map(|q| resolve(&session, q))
                    .collect::<Result<_>>()?
            };
            if ids.is_empty() {
                println!("nothing to arrange");
                return Ok(());
            }
            let report = session.arrange(&ids).await?;
            println!(
                "arranged {} blocks ({} ignored, {} unplaced)",
                report.applied.len(),
                report.ignored.len(),
                report.missing.len()
            );
            if let Some(note) = session.arrangement_note() {
                println!("\n{note}");
            }
        }

        Command::Reset { project, yes } => {
            if !yes {
                bail!("reset deletes every block in {project}; pass --yes to confirm");
            }
            let mut session = open(config, &project).await?;
            let count = session.blocks().len();
            session.reset().await?;
            println!("deleted {count} blocks");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["pyramid", "move", "roadmap", "abc", "pool", "--index", "2"]).unwrap();
        match args.command {
            Command::Move { level, index, .. } => {
                assert_eq!(parse_level(&level).unwrap(), Level::POOL);
                assert_eq!(index, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_palette_subcommand_optional() {
        let args = Args::try_parse_from(["pyramid", "palette", "roadmap"]).unwrap();
        assert!(matches!(args.command, Command::Palette { action: None, .. }));

        let args = Args::try_parse_from(["pyramid", "palette", "roadmap", "add", "cyan"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Palette {
                action: Some(PaletteAction::Add { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_color_and_level_errors() {
        assert_eq!(parse_color("GREEN").unwrap(), Color::Green);
        assert!(parse_color("chartreuse").unwrap_err().to_string().contains("indigo"));
        assert!(parse_level("top").is_err());
    }

    #[tokio::test]
    async fn test_run_against_temp_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::default().with_data_dir(dir.path());

        run(
            Command::Add {
                project: "demo".into(),
                title: "Base".into(),
                description: None,
                category: None,
                level: Some("0".into()),
                index: None,
            },
            &config,
        )
        .await
        .unwrap();

        let session = open(&config, "demo").await.unwrap();
        assert_eq!(session.tier(Level::FOUNDATION).len(), 1);
        assert!(resolve(&session, "Base").is_ok());
    }

    fn add(title: &str) -> Command {
        Command::Add {
            project: "demo".into(),
            title: title.into(),
            description: None,
            category: None,
            level: None,
            index: None,
        }
    }

    #[tokio::test]
    async fn test_add_after_pool_gap_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::default().with_data_dir(dir.path());
        for title in ["a", "b", "c"] {
            run(add(title), &config).await.unwrap();
        }
        run(
            Command::Move {
                project: "demo".into(),
                block: "b".into(),
                level: "0".into(),
                index: None,
            },
            &config,
        )
        .await
        .unwrap();
        run(add("d"), &config).await.unwrap();

        let session = open(&config, "demo").await.unwrap();
        let pool: Vec<(&str, i64)> = session
            .pool()
            .into_iter()
            .map(|b| (b.title.as_str(), b.order))
            .collect();
        assert_eq!(pool, vec![("a", 0), ("c", 2), ("d", 3)]);
    }
}
