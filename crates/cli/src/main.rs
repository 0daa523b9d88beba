use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use core_types::config::{AppConfig, load_or_create_config};
use indicatif::{ProgressBar, ProgressStyle};
use kindred_cli::{LoadedPosts, RelatedEntry, SkippedPost, load_posts};
use pipeline::{BuildReport, Pipeline, Stage, init_tracing_with_config};
use std::path::{Path, PathBuf};

/// Related-content builds for static sites.
#[derive(Parser, Debug)]
#[command(name = "kindred", version, about = "Find related posts by embedding similarity")]
struct Cli {
    /// Config file (defaults to ./kindred.toml, created if missing).
    #[arg(short, long, global = true, env = "KINDRED_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index every post under DIR and print each post's related posts.
    Related {
        dir: PathBuf,
        /// Neighbours requested per query, counting the post itself.
        #[arg(short, long)]
        neighbors: Option<usize>,
        /// Posts embedded concurrently.
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the effective configuration.
    Config {},
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut cfg = load_or_create_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Related {
            dir,
            neighbors,
            concurrency,
            format,
        } => {
            if let Some(n) = neighbors {
                cfg.semantic.neighbors = n;
            }
            if let Some(c) = concurrency {
                cfg.embedder.concurrency = c;
            }
            cfg.validate()?;
            let _guard = init_tracing_with_config(&cfg.logging)?;
            run_related(&cfg, &dir, format).await?;
        }
        Commands::Config {} => {
            let rendered = toml::to_string_pretty(&cfg).context("failed to render config")?;
            print!("{rendered}");
        }
    }
    Ok(())
}

async fn run_related(cfg: &AppConfig, dir: &Path, format: OutputFormat) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let LoadedPosts { mut posts, skipped } = load_posts(dir);
    if posts.is_empty() {
        eprintln!("{}", style(format!("No posts found under {}", dir.display())).yellow());
        print_skipped(&skipped);
        return Ok(());
    }
    tracing::info!(
        posts = posts.len(),
        skipped = skipped.len(),
        dir = %dir.display(),
        "loaded posts"
    );

    let pipeline = Pipeline::initialize(cfg)?;
    let bar = progress_bar(posts.len())?;
    let report = pipeline
        .process_posts_with(&mut posts, |stage, post| {
            let label = match stage {
                Stage::Index => "indexing",
                Stage::Related => "relating",
            };
            bar.set_message(format!("{label} {}", post.path));
            bar.inc(1);
        })
        .await;
    bar.finish_and_clear();

    let entries: Vec<RelatedEntry> = posts.iter().map(RelatedEntry::from).collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => print_text(&entries),
    }
    print_report(&report);
    print_skipped(&skipped);

    if report.consistency_violations > 0 {
        bail!(
            "related-content index reported {} consistency violations",
            report.consistency_violations
        );
    }
    Ok(())
}

fn progress_bar(posts: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(u64::try_from(posts).unwrap_or(u64::MAX).saturating_mul(2));
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

fn print_text(entries: &[RelatedEntry]) {
    for entry in entries {
        match &entry.title {
            Some(title) => println!("{} {}", style(&entry.path).cyan(), style(title).dim()),
            None => println!("{}", style(&entry.path).cyan()),
        }
        if entry.related.is_empty() {
            println!("  {}", style("(none)").dim());
        }
        for related in &entry.related {
            println!("  {related}");
        }
    }
}

fn print_report(report: &BuildReport) {
    let summary = report.summary();
    if report.is_clean() {
        eprintln!("{}", style(summary).green());
        return;
    }
    eprintln!("{}", style(summary).yellow());
    for failure in &report.failures {
        eprintln!(
            "  {} {:?}: {}",
            style(&failure.path).red(),
            failure.stage,
            failure.reason
        );
    }
}

fn print_skipped(skipped: &[SkippedPost]) {
    if skipped.is_empty() {
        return;
    }
    eprintln!("{}", style(format!("{} files skipped", skipped.len())).yellow());
    for file in skipped {
        eprintln!("  {} {}", style(&file.path).red(), file.reason);
    }
}
