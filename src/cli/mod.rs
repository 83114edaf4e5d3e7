//! Command-line interface for asr-review.
//!
//! Provides an interactive review loop plus one-shot commands for listing
//! utterances, rendering one, submitting a single annotation, and pulling
//! stats or an export from the annotation backend.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{AnnotationApi, HttpApi};
use crate::config::{self, ResolvedConfig};
use crate::core::{EventOutcome, Session, SessionOptions, UiEvent};
use crate::overlay::render_utterance;

pub mod review;
pub mod view;

/// asr-review - Annotate ASR transcript errors against a review backend
#[derive(Parser, Debug)]
#[command(name = "asr-review")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Model whose transcripts are reviewed (defaults to session.model in config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Annotation backend URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List utterances with their error and annotation counts
    List,

    /// Show one utterance with its numbered error spans
    Show {
        /// Utterance number (1-based, backend order)
        index: usize,

        /// Also write the rendered overlay as an HTML page
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Submit a single annotation
    Annotate {
        /// Utterance number (1-based, backend order)
        index: usize,

        /// Error span number within the utterance (1-based)
        target: usize,

        /// Taxonomy category (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Free-text custom category
        #[arg(short, long)]
        custom: Option<String>,

        /// Severity level 0-5
        #[arg(short, long, default_value = "0")]
        severity: i64,
    },

    /// Interactive review session
    Review {
        /// Keep backend order instead of shuffling
        #[arg(long)]
        sequential: bool,

        /// Seed for the shuffled order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show annotation progress
    Stats {
        /// Count from loaded data instead of asking the server
        #[arg(long)]
        local: bool,
    },

    /// Summarize existing annotations by taxonomy and severity
    Summary,

    /// Export all annotations for the model to a JSON file
    Export {
        /// Output directory (defaults to export.dir in config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;

        if let Commands::Config = self.command {
            return show_config(cfg);
        }

        let api = match &self.api_url {
            Some(url) => HttpApi::new(url.clone()),
            None => HttpApi::from_config(cfg),
        };
        let model = resolve_model(self.model.as_deref(), cfg)?;

        match self.command {
            Commands::List => list_utterances(api, &model, cfg).await,
            Commands::Show { index, html } => show_utterance(api, &model, cfg, index, html).await,
            Commands::Annotate {
                index,
                target,
                tags,
                custom,
                severity,
            } => {
                let input = AnnotateInput {
                    index,
                    target,
                    tags,
                    custom,
                    severity,
                };
                annotate(api, &model, cfg, input).await
            }
            Commands::Review { sequential, seed } => {
                let options = SessionOptions {
                    randomize: cfg.randomize && !sequential,
                    seed,
                    taxonomy: cfg.taxonomy.clone(),
                };
                review::run(Session::new(api, model, options), &cfg.export_dir).await
            }
            Commands::Stats { local } => show_stats(api, &model, cfg, local).await,
            Commands::Summary => show_summary(api, &model, cfg).await,
            Commands::Export { out } => {
                let dir = out.unwrap_or_else(|| cfg.export_dir.clone());
                let session = Session::new(api, model, sequential_options(cfg));
                let path = session.export(&dir).await?;
                println!("Exported to {}", path.display());
                Ok(())
            }
            Commands::Config => Ok(()),
        }
    }
}

/// Model from the command line, else from config
fn resolve_model(arg: Option<&str>, cfg: &ResolvedConfig) -> Result<String> {
    arg.map(str::to_string)
        .or_else(|| cfg.model.clone())
        .filter(|m| !m.trim().is_empty())
        .context("No model given. Use --model <name> or set session.model in .asr-review/config.yaml")
}

fn sequential_options(cfg: &ResolvedConfig) -> SessionOptions {
    SessionOptions {
        randomize: false,
        seed: None,
        taxonomy: cfg.taxonomy.clone(),
    }
}

/// Load a session in backend order
async fn load_sequential<A: AnnotationApi>(
    api: A,
    model: &str,
    cfg: &ResolvedConfig,
) -> Session<A> {
    let mut session = Session::new(api, model, sequential_options(cfg));
    session.load().await;
    session
}

/// Convert a 1-based utterance number into a loaded position
fn utterance_position<A: AnnotationApi>(session: &Session<A>, index: usize) -> Result<usize> {
    let count = session.utterances().len();
    if index == 0 || index > count {
        anyhow::bail!(
            "Utterance {} not found (model {} has {} utterances)",
            index,
            session.model(),
            count
        );
    }
    Ok(index - 1)
}

/// List utterances
async fn list_utterances<A: AnnotationApi>(api: A, model: &str, cfg: &ResolvedConfig) -> Result<()> {
    let session = load_sequential(api, model, cfg).await;

    if session.utterances().is_empty() {
        println!("No utterances found for model {}", model);
        return Ok(());
    }

    println!("{:<6} {:<32} {:>7} {:>10}", "#", "UTTERANCE", "ERRORS", "ANNOTATED");
    println!("{}", "-".repeat(58));

    for (index, utterance) in session.utterances().iter().enumerate() {
        let overlay = render_utterance(utterance, session.cache());
        println!(
            "{:<6} {:<32} {:>7} {:>10}",
            index + 1,
            utterance.utterance_id,
            overlay.spans.len(),
            overlay.annotated_count()
        );
    }

    Ok(())
}

/// Show one utterance
async fn show_utterance<A: AnnotationApi>(
    api: A,
    model: &str,
    cfg: &ResolvedConfig,
    index: usize,
    html: Option<PathBuf>,
) -> Result<()> {
    let mut session = load_sequential(api, model, cfg).await;
    let position = utterance_position(&session, index)?;
    session.handle(UiEvent::Jump(position)).await?;

    let (_, utterance) = session
        .current_utterance()
        .context("No utterance under the cursor")?;
    view::print_utterance(
        position,
        session.utterances().len(),
        utterance,
        session.overlay(),
        session.cache(),
    );

    if let Some(path) = html {
        let page = view::html_page(model, utterance, session.overlay());
        tokio::fs::write(&path, page)
            .await
            .with_context(|| format!("Failed to write HTML page: {}", path.display()))?;
        println!("\nHTML written to {}", path.display());
    }

    Ok(())
}

/// Raw arguments of `annotate`
struct AnnotateInput {
    index: usize,
    target: usize,
    tags: Vec<String>,
    custom: Option<String>,
    severity: i64,
}

/// Submit one annotation through the same event path as the review loop
async fn annotate<A: AnnotationApi>(
    api: A,
    model: &str,
    cfg: &ResolvedConfig,
    input: AnnotateInput,
) -> Result<()> {
    let mut session = load_sequential(api, model, cfg).await;
    let position = utterance_position(&session, input.index)?;
    session.handle(UiEvent::Jump(position)).await?;

    if input.target == 0 || input.target > session.overlay().spans.len() {
        anyhow::bail!(
            "Error span {} not found (utterance {} has {} spans)",
            input.target,
            input.index,
            session.overlay().spans.len()
        );
    }
    session.handle(UiEvent::OpenTarget(input.target - 1)).await?;

    // Replace the prefilled categories with exactly the requested ones
    let prefilled: Vec<String> = session
        .form()
        .map(|f| f.selected.clone())
        .unwrap_or_default();
    for tag in prefilled.iter().filter(|t| !input.tags.contains(t)) {
        session.handle(UiEvent::ToggleTaxonomy(tag.clone())).await?;
    }
    for tag in input.tags.iter().filter(|t| !prefilled.contains(t)) {
        session.handle(UiEvent::ToggleTaxonomy(tag.clone())).await?;
    }
    session
        .handle(UiEvent::SetCustom(input.custom.unwrap_or_default()))
        .await?;
    session.handle(UiEvent::SetSeverity(input.severity)).await?;

    match session.handle(UiEvent::Submit).await? {
        EventOutcome::Saved(ack) => {
            println!(
                "Saved {} ({})",
                ack.error_id,
                ack.action.as_deref().unwrap_or("ok")
            );
            Ok(())
        }
        other => anyhow::bail!("Unexpected outcome: {:?}", other),
    }
}

/// Show progress stats
async fn show_stats<A: AnnotationApi>(
    api: A,
    model: &str,
    cfg: &ResolvedConfig,
    local: bool,
) -> Result<()> {
    let options = SessionOptions {
        randomize: local,
        ..sequential_options(cfg)
    };
    let mut session = Session::new(api, model, options);
    if local {
        session.load().await;
    }

    let stats = session.stats().await;
    view::print_stats(model, &stats);
    Ok(())
}

/// Summarize annotations
async fn show_summary<A: AnnotationApi>(api: A, model: &str, cfg: &ResolvedConfig) -> Result<()> {
    let mut session = Session::new(api, model, sequential_options(cfg));
    session.reload_annotations().await;
    view::print_summary(&session.summary());
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("  asr-review Configuration");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("API:        {}", cfg.api_base_url);
    println!("Model:      {}", cfg.model.as_deref().unwrap_or("(not set)"));
    println!("Order:      {}", if cfg.randomize { "randomized" } else { "sequential" });
    println!("Export dir: {}", cfg.export_dir.display());
    println!();
    println!("Taxonomy:");
    for category in &cfg.taxonomy {
        println!("  {}", category);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(model: Option<&str>) -> ResolvedConfig {
        ResolvedConfig {
            api_base_url: "http://localhost:5000".to_string(),
            model: model.map(str::to_string),
            randomize: true,
            taxonomy: vec!["meaning".to_string()],
            export_dir: PathBuf::from("."),
            config_file: None,
        }
    }

    #[test]
    fn test_resolve_model_prefers_argument() {
        assert_eq!(resolve_model(Some("phi4"), &cfg(Some("whisper"))).unwrap(), "phi4");
        assert_eq!(resolve_model(None, &cfg(Some("whisper"))).unwrap(), "whisper");
        assert!(resolve_model(None, &cfg(None)).is_err());
        assert!(resolve_model(Some("  "), &cfg(None)).is_err());
    }

    #[test]
    fn test_cli_parses_annotate() {
        let cli = Cli::parse_from([
            "asr-review", "--model", "whisper", "annotate", "3", "1", "--tag", "meaning", "--tag",
            "grammar", "--custom", "odd", "--severity", "4",
        ]);
        assert_eq!(cli.model.as_deref(), Some("whisper"));
        match cli.command {
            Commands::Annotate {
                index,
                target,
                tags,
                custom,
                severity,
            } => {
                assert_eq!((index, target, severity), (3, 1, 4));
                assert_eq!(tags, vec!["meaning", "grammar"]);
                assert_eq!(custom.as_deref(), Some("odd"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_review_flags() {
        let cli = Cli::parse_from(["asr-review", "review", "--sequential", "--seed", "7"]);
        match cli.command {
            Commands::Review { sequential, seed } => {
                assert!(sequential);
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
