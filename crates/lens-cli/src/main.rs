mod client;
mod orchestrator;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lens_core::{ActivityWindow, DEFAULT_BASE_URL, Locale, SearchFilters};
use lens_store::PrefStore;

use crate::client::ApiClient;
use crate::orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "ghlens", about = "GitHub profile analytics from the terminal")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a GitHub profile
    Search {
        /// GitHub username to analyze
        subject: String,

        /// Override the analytics API base URL for this run only
        #[arg(long)]
        api_url: Option<String>,

        /// Repositories to consider for profile/language/community analysis
        #[arg(long, default_value_t = 5)]
        repo_limit: u32,

        /// Only consider repositories pushed within this many months
        #[arg(long, default_value_t = 12)]
        months: u32,

        /// Include forked repositories
        #[arg(long)]
        include_forks: bool,

        /// Include archived repositories
        #[arg(long)]
        include_archived: bool,

        /// Activity window in days (30, 60 or 90); persisted as preference
        #[arg(long, value_parser = parse_window)]
        days: Option<ActivityWindow>,

        /// Narrative language (en or es)
        #[arg(long, value_parser = parse_locale, default_value = "en")]
        locale: Locale,

        /// Skip the cached AI narrative and always hit the backend
        #[arg(long)]
        no_cache: bool,
    },

    /// List recent searches
    Recent,

    /// Show or set the persisted API base URL
    Config {
        /// New base URL to persist
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Drop all cached AI narratives
    ClearCache,
}

fn parse_window(s: &str) -> std::result::Result<ActivityWindow, String> {
    s.parse::<u32>()
        .ok()
        .and_then(ActivityWindow::from_days)
        .ok_or_else(|| format!("invalid window '{s}': expected 30, 60 or 90"))
}

fn parse_locale(s: &str) -> std::result::Result<Locale, String> {
    Locale::parse(s).ok_or_else(|| format!("invalid locale '{s}': expected en or es"))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn open_store() -> Result<PrefStore> {
    PrefStore::open_default().context("failed to open preference store")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Search {
            subject,
            api_url,
            repo_limit,
            months,
            include_forks,
            include_archived,
            days,
            locale,
            no_cache,
        } => {
            let filters = SearchFilters {
                repo_limit,
                recent_months: months,
                include_forks,
                include_archived,
            };
            let code = cmd_search(&subject, api_url, filters, days, locale, no_cache).await?;
            std::process::exit(code);
        }
        Commands::Recent => cmd_recent(),
        Commands::Config { api_url } => cmd_config(api_url.as_deref()),
        Commands::ClearCache => cmd_clear_cache(),
    }
}

async fn cmd_search(
    subject: &str,
    api_url: Option<String>,
    filters: SearchFilters,
    days: Option<ActivityWindow>,
    locale: Locale,
    no_cache: bool,
) -> Result<i32> {
    let store = open_store()?;
    let base_url = api_url
        .or_else(|| store.api_base_url())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    tracing::debug!("using analytics backend {base_url}");

    let api = Arc::new(ApiClient::new(&base_url));
    let orchestrator = Orchestrator::new(api, store, locale);
    orchestrator.set_filters(filters).await;
    if let Some(window) = days {
        orchestrator.set_activity_window(window).await;
    }

    let mut rx = orchestrator.subscribe();
    orchestrator.search(subject, !no_cache).await;

    let state = rx
        .wait_for(|s| s.all_settled())
        .await
        .context("search state channel closed")?
        .clone();

    print!("{}", render::render_report(&state));
    for (name, error) in render::failed_sections(&state) {
        tracing::warn!("{name} fetch failed: {error}");
    }

    Ok(if state.has_primary_results() { 0 } else { 1 })
}

fn cmd_recent() -> Result<()> {
    let store = open_store()?;
    let recents = store.recent_subjects();
    if recents.is_empty() {
        println!("no recent searches");
    } else {
        for subject in recents {
            println!("{subject}");
        }
    }
    Ok(())
}

fn cmd_config(api_url: Option<&str>) -> Result<()> {
    let store = open_store()?;
    match api_url {
        Some(url) => {
            store.set_api_base_url(url);
            println!("api url set to {url}");
        }
        None => {
            let current = store
                .api_base_url()
                .unwrap_or_else(|| format!("{DEFAULT_BASE_URL} (default)"));
            println!("api url: {current}");
        }
    }
    Ok(())
}

fn cmd_clear_cache() -> Result<()> {
    let store = open_store()?;
    store.clear_narrative_cache();
    println!("narrative cache cleared");
    Ok(())
}
