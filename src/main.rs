//! folio-search CLI: run one streamed metadata search against a library
//! server and print what the providers found.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};

use folio_search::config::ClientConfig;
use folio_search::error::FolioError;
use folio_search::search::{
    HttpTransport, ProviderPhase, ProviderStatus, SearchActions, SearchState, SearchStreamClient,
};

#[derive(Parser)]
#[command(
    name = "folio-search",
    version,
    about = "Search book metadata providers through a folio server"
)]
struct Cli {
    /// What to search for (title, author, ISBN...).
    query: String,

    /// Config file (default: $XDG_CONFIG_HOME/folio/search.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Library server base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Locale forwarded to providers.
    #[arg(long)]
    locale: Option<String>,

    /// Maximum results each provider may return.
    #[arg(long)]
    max_results: Option<u32>,

    /// Only query this provider id (repeatable).
    #[arg(long = "provider-id")]
    provider_ids: Vec<String>,

    /// Only query the provider with this name (repeatable).
    #[arg(long = "enable-provider")]
    enable_providers: Vec<String>,

    /// Correlation id sent with the request.
    #[arg(long)]
    request_id: Option<String>,

    /// Print the final search state as JSON.
    #[arg(long)]
    json: bool,

    /// Only log warnings and errors.
    #[arg(long, short)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ClientConfig::default_path().map_err(FolioError::from)?,
    };
    let config = apply_overrides(
        ClientConfig::load_or_default(&config_path).map_err(FolioError::from)?,
        &cli,
    );

    let mut options = config.options(&cli.query);
    options.request_id = cli.request_id.clone();

    let transport =
        HttpTransport::new(&config.base_url, config.connect_timeout()).map_err(FolioError::from)?;
    let client = Arc::new(SearchStreamClient::new(transport, options).map_err(FolioError::from)?);
    let mut actions = SearchActions::new(Arc::clone(&client), || {
        tracing::debug!("search closed");
    });

    let mut updates = client.subscribe();
    if !actions.handle_search(&cli.query) {
        return Err(miette::miette!(
            code = "folio::cli::blank_query",
            help = "Pass a title, author or ISBN to search for.",
            "search query is blank"
        ));
    }

    let mut previous = client.state();
    let final_state = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break client.state();
                }
                let current = Arc::clone(&updates.borrow_and_update());
                report_transitions(&previous, &current);
                if !current.is_searching {
                    break current;
                }
                previous = current;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, cancelling search");
                actions.handle_close();
                break client.state();
            }
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&*final_state).into_diagnostic()?;
        println!("{json}");
    } else {
        print_results(&final_state);
    }

    match &final_state.error {
        Some(message) => Err(FolioError::SearchFailed {
            message: message.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

fn apply_overrides(mut config: ClientConfig, cli: &Cli) -> ClientConfig {
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }
    if let Some(max) = cli.max_results {
        config.max_results_per_provider = max;
    }
    if !cli.provider_ids.is_empty() {
        config.provider_ids = cli.provider_ids.clone();
    }
    if !cli.enable_providers.is_empty() {
        config.enable_providers = cli.enable_providers.clone();
    }
    config
}

/// One stderr line per provider whose status changed since `previous`.
fn report_transitions(previous: &SearchState, current: &SearchState) {
    for status in current.provider_statuses.values() {
        let before = previous.provider_statuses.get(&status.id);
        let changed = before.is_none_or(|b| b.status != status.status);
        if changed && status.status != ProviderPhase::Pending {
            eprintln!("  {:<24} {}", status.name, describe(status));
        }
    }
}

fn describe(status: &ProviderStatus) -> String {
    match status.status {
        ProviderPhase::Pending => "pending".to_string(),
        ProviderPhase::Searching => "searching".to_string(),
        ProviderPhase::Completed => match status.duration_ms {
            Some(ms) => format!("completed ({} results, {ms} ms)", status.result_count),
            None => format!("completed ({} results)", status.result_count),
        },
        ProviderPhase::Failed => format!(
            "failed: {} [{}]",
            status.error.as_deref().unwrap_or("unknown error"),
            status.error_type.as_deref().unwrap_or("Error"),
        ),
    }
}

fn print_results(state: &SearchState) {
    println!(
        "{} results from {}/{} providers ({} failed)",
        state.total_results,
        state.providers_completed,
        state.total_providers,
        state.providers_failed,
    );
    for record in &state.results {
        let authors = if record.authors.is_empty() {
            "unknown author".to_string()
        } else {
            record.authors.join(", ")
        };
        println!("  {:<48} {:<32} [{}]", record.title, authors, record.source_id);
    }
}
