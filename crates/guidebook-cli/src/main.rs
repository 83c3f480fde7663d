#![deny(unsafe_code)]

//! Guidebook CLI: find the guides in a document library that apply to an input.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guidebook_config::{AppConfig, LibraryConfig};
use guidebook_core::{BasicMeta, DocumentLoader, DocumentMatcher, Entry, EntryFilter, LoaderOptions};
use guidebook_query::QueryEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Matcher = DocumentMatcher<str, BasicMeta>;

/// Guidebook: match inputs against a library of guides.
#[derive(Parser)]
#[command(name = "guidebook", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = guidebook_config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Document root, overriding `[library] root`.
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the guides whose queries match any of the inputs.
    Match {
        /// Input text to match.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Treat inputs as paths and match against file contents.
        #[arg(long)]
        files: bool,

        /// Include guides with an empty body.
        #[arg(long)]
        include_empty: bool,

        /// Print matched entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List every guide in the library.
    List,

    /// Show one guide and its ancestors.
    Show {
        /// Guide id, e.g. `ember/template/buttons`.
        id: String,
    },

    /// Load the whole library and report the first error.
    Check,

    /// Print the JSON Schema of the query language.
    Schema,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .await
        .with_context(|| format!("failed to load config from '{}'", cli.config.display()))?;
    if let Some(root) = &cli.root {
        config.library.root = root.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config.logging.level))),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Match {
            inputs,
            files,
            include_empty,
            json,
        } => {
            let filter = match_filter(&config.library, include_empty);
            cmd_match(&config, inputs, files, filter, json).await?
        }
        Commands::List => cmd_list(&config).await?,
        Commands::Show { id } => cmd_show(&config, &id).await?,
        Commands::Check => cmd_check(&config).await?,
        Commands::Schema => cmd_schema()?,
        Commands::Config { show } => cmd_config(&config, &cli.config, show)?,
    }

    Ok(())
}

/// `-v` flags win over the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// `--include-empty` overrides `[library] skip_empty`.
fn match_filter(library: &LibraryConfig, include_empty: bool) -> EntryFilter {
    EntryFilter {
        skip_empty: library.skip_empty && !include_empty,
    }
}

fn loader_options(library: &LibraryConfig) -> LoaderOptions {
    LoaderOptions {
        root: library.root.clone(),
        include: library.include.clone(),
        exclude_hidden: library.exclude_hidden,
    }
}

fn build_matcher(config: &AppConfig) -> Result<Matcher> {
    let engine = QueryEngine::with_text_predicates()?;
    let loader = DocumentLoader::new(&loader_options(&config.library), engine)?;
    Ok(DocumentMatcher::new(loader))
}

async fn cmd_match(config: &AppConfig, inputs: Vec<String>, files: bool, filter: EntryFilter, json: bool) -> Result<()> {
    let inputs = if files {
        let mut contents = Vec::with_capacity(inputs.len());
        for path in &inputs {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read input '{path}'"))?;
            contents.push(text);
        }
        contents
    } else {
        inputs
    };

    let matcher = build_matcher(config)?;
    let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
    let matched = matcher.match_any(&inputs, filter).await?;
    info!(inputs = inputs.len(), matched = matched.len(), "Matched inputs");
    print!("{}", render_entries(&matched, json)?);
    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let matcher = build_matcher(config)?;
    let entries = matcher.entries().await?;
    print!("{}", render_entries(&entries, false)?);
    Ok(())
}

async fn cmd_show(config: &AppConfig, id: &str) -> Result<()> {
    let matcher = build_matcher(config)?;
    let entry = matcher
        .get_one_by_id(id)
        .await?
        .with_context(|| format!("no guide with id '{id}'"))?;
    let chain = matcher.get_parents_by_id(id).await?;
    print!("{}", render_entry(&entry, &chain)?);
    Ok(())
}

async fn cmd_check(config: &AppConfig) -> Result<()> {
    let matcher = build_matcher(config)?;
    let entries = matcher.entries().await?;
    println!(
        "{} guides under '{}' are valid.",
        entries.len(),
        config.library.root.display()
    );
    Ok(())
}

fn cmd_schema() -> Result<()> {
    let engine = QueryEngine::with_text_predicates()?;
    println!("{}", serde_json::to_string_pretty(&engine.schema().to_json_schema())?);
    Ok(())
}

fn cmd_config(config: &AppConfig, config_path: &Path, show: bool) -> Result<()> {
    if show {
        println!("{}", config.to_toml()?);
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn entry_line<M>(entry: &Entry<M>) -> String {
    match &entry.kind {
        Some(kind) => format!("{} [{kind}]", entry.id),
        None => entry.id.clone(),
    }
}

fn render_entries(entries: &[Arc<Entry<BasicMeta>>], json: bool) -> Result<String> {
    if json {
        let entries: Vec<&Entry<BasicMeta>> = entries.iter().map(Arc::as_ref).collect();
        return Ok(serde_json::to_string_pretty(&entries)? + "\n");
    }
    let mut out = String::new();
    for entry in entries {
        writeln!(out, "{}", entry_line(entry))?;
    }
    Ok(out)
}

fn render_entry(entry: &Entry<BasicMeta>, chain: &[Arc<Entry<BasicMeta>>]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "id:       {}", entry_line(entry))?;
    if let Some(title) = &entry.meta.title {
        writeln!(out, "title:    {title}")?;
    }
    writeln!(out, "source:   {}", entry.source.display())?;
    writeln!(out, "query:    {}", entry.query)?;
    let ancestors: Vec<&str> = chain
        .iter()
        .filter(|a| a.id != entry.id)
        .map(|a| a.id.as_str())
        .collect();
    if !ancestors.is_empty() {
        writeln!(out, "parents:  {}", ancestors.join(" > "))?;
    }
    if let Some(content) = &entry.content {
        writeln!(out, "\n{content}")?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guidebook_test_utils::config::TestConfigBuilder;
    use guidebook_test_utils::{TestLibrary, document};
    use pretty_assertions::assert_eq;

    async fn library() -> TestLibrary {
        TestLibrary::with_files(&[
            ("ember/ember.md", &document("query:\n  contains: ember\ntitle: Ember", "Ember guides")),
            ("ember/0.buttons.rule.md", &document("query:\n  contains: button", "Use <Button>")),
        ])
        .await
    }

    #[test]
    fn test_parse_match_command() {
        let cli = Cli::try_parse_from(["guidebook", "-vv", "match", "a", "b", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("guidebook.toml"));
        let Commands::Match { inputs, json, files, include_empty } = cli.command else {
            panic!("expected match command");
        };
        assert_eq!(inputs, vec!["a".to_string(), "b".to_string()]);
        assert!(json);
        assert!(!files);
        assert!(!include_empty);
    }

    #[test]
    fn test_match_requires_input() {
        assert!(Cli::try_parse_from(["guidebook", "match"]).is_err());
    }

    #[test]
    fn test_log_filter_precedence() {
        let config = TestConfigBuilder::new().log_level("warn").build();
        assert_eq!(log_filter(0, &config.logging.level), "warn");
        assert_eq!(log_filter(1, &config.logging.level), "debug");
        assert_eq!(log_filter(3, &config.logging.level), "trace");
    }

    #[test]
    fn test_match_filter_from_config() {
        let skipping = TestConfigBuilder::new().build();
        assert_eq!(match_filter(&skipping.library, false), EntryFilter::non_empty());
        assert_eq!(match_filter(&skipping.library, true), EntryFilter::all());

        let keeping = TestConfigBuilder::new().skip_empty(false).build();
        assert_eq!(match_filter(&keeping.library, false), EntryFilter::all());
    }

    #[tokio::test]
    async fn test_render_matches() {
        let library = library().await;
        let config = TestConfigBuilder::new().root(library.root()).build();
        let matcher = build_matcher(&config).unwrap();

        let matched = matcher
            .match_any(&["ember button"], EntryFilter::non_empty())
            .await
            .unwrap();
        assert_eq!(
            render_entries(&matched, false).unwrap(),
            "ember/buttons [rule]\nember\n"
        );

        let json: serde_json::Value = serde_json::from_str(&render_entries(&matched, true).unwrap()).unwrap();
        assert_eq!(json[0]["id"], "ember/buttons");
        assert_eq!(json[0]["type"], "rule");
        assert_eq!(json[1]["meta"]["title"], "Ember");
    }

    #[tokio::test]
    async fn test_render_entry_with_parents() {
        let library = library().await;
        let config = TestConfigBuilder::new().root(library.root()).build();
        let matcher = build_matcher(&config).unwrap();

        let entry = matcher.get_one_by_id("ember/buttons").await.unwrap().unwrap();
        let chain = matcher.get_parents_by_id("ember/buttons").await.unwrap();
        let rendered = render_entry(&entry, &chain).unwrap();
        assert!(rendered.starts_with("id:       ember/buttons [rule]\n"), "{rendered}");
        assert!(rendered.contains("query:    {\"contains\":\"button\"}\n"), "{rendered}");
        assert!(rendered.contains("parents:  ember\n"), "{rendered}");
        assert!(rendered.ends_with("\nUse <Button>\n"), "{rendered}");
    }

    #[test]
    fn test_loader_options_from_config() {
        let config = TestConfigBuilder::new()
            .root("/srv/guides")
            .include("rules/*.txt")
            .exclude_hidden(false)
            .build();
        let options = loader_options(&config.library);
        assert_eq!(options.root, PathBuf::from("/srv/guides"));
        assert_eq!(options.include, vec!["rules/*.txt".to_string()]);
        assert!(!options.exclude_hidden);
    }
}
