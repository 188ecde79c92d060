mod config;
mod dump;
mod fetch;
mod integrity;
mod jobs;
mod markup;
mod model;
mod output;
mod parser;
mod sidebar;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::config::Settings;
use crate::fetch::{Format, HttpSource, PageSource};
use crate::model::Tree;

#[derive(Parser)]
#[command(name = "wiki_scrape", about = "Garry's Mod wiki scraper for editor tooling")]
struct Cli {
    /// Reuse the previously scraped tree instead of scraping again
    #[arg(long)]
    prescraped: bool,
    /// Serve pages from the on-disk cache when present
    #[arg(long)]
    cached: bool,
    /// Only log warnings and errors, no progress bar
    #[arg(short, long)]
    quiet: bool,
    /// Secondary dump with source locations (default: settings `dump_path`)
    #[arg(long)]
    dump: Option<PathBuf>,
    /// Where to write the artifact (default: settings `output_path`)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Also write the flat SEARCH → record index
    #[arg(long)]
    language_server: Option<PathBuf>,
    /// Grammar template with %_NAME_% placeholders
    #[arg(long, requires = "syntax_output")]
    syntax_template: Option<PathBuf>,
    /// Where to write the filled grammar
    #[arg(long, requires = "syntax_template")]
    syntax_output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let t0 = Instant::now();

    let mut settings = Settings::load()?;
    if let Some(dump) = cli.dump {
        settings.dump_path = dump;
    }
    if let Some(output) = cli.output {
        settings.output_path = output;
    }

    let mut tree = match prescraped(&settings, cli.prescraped)? {
        Some(tree) => tree,
        None => scrape(&settings, cli.cached, cli.quiet)?,
    };

    if let Some(dump) = dump::load(&settings.dump_path)? {
        dump::merge(&mut tree, dump);
    }

    let stripped = integrity::strip_empty_keys(&mut tree, &settings.index_url());
    if stripped > 0 {
        info!("Stripped {} records with empty keys", stripped);
    }

    output::write_json(&settings.prescraped_path, &tree)?;
    output::write_json(&settings.output_path, &tree)?;

    if let Some(path) = &cli.language_server {
        let index = output::index::flatten(&tree);
        info!("Language server index: {} symbols", index.len());
        output::write_json(path, &index)?;
    }

    if let (Some(template), Some(out)) = (&cli.syntax_template, &cli.syntax_output) {
        let template = fs::read_to_string(template)
            .with_context(|| format!("Failed to read {}", template.display()))?;
        let patterns = output::syntax::patterns(&tree);
        output::write_text(out, &output::syntax::render(&template, &patterns))?;
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    } else {
        info!("Done");
    }
    Ok(())
}

/// The tree from a previous run, when asked for and present.
fn prescraped(settings: &Settings, wanted: bool) -> Result<Option<Tree>> {
    let path: &Path = &settings.prescraped_path;
    if !wanted {
        return Ok(None);
    }
    if !path.exists() {
        warn!("No prescraped tree at {}, scraping instead", path.display());
        return Ok(None);
    }
    info!("Using prescraped wiki from {}", path.display());
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let tree = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(tree))
}

fn scrape(settings: &Settings, cached: bool, quiet: bool) -> Result<Tree> {
    let t_scrape = Instant::now();
    let source = HttpSource::new(&settings.cache_dir, cached)?;

    let index_url = settings.index_url();
    info!("Scraping {}", index_url);
    let markup = source
        .fetch(&index_url, Format::Html)
        .context("Failed to fetch the sidebar")?;

    let plan = sidebar::walk(&markup, &settings.wiki_path);
    let mut tree = plan.tree;
    jobs::run(settings, &source, &mut tree, plan.jobs, &plan.links, quiet)?;

    info!("Scraped in {}", format_duration(t_scrape.elapsed()));
    Ok(tree)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
