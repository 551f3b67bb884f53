//! Terminal entry-point: loads settings, wires the GitHub adapters, cache,
//! quota breaker and debounce controller, then reads queries from stdin.

use std::env;
use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::io::BufReader;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use directory_search::config::SearchSettings;
use directory_search::domain::{
    DebounceController, RateLimitTracker, SearchOrchestrator, SearchOrchestratorPorts,
};
use directory_search::inbound::terminal;
use directory_search::outbound::cache::LruQueryCache;
use directory_search::outbound::github::{GithubEndpoints, GithubHttpSource};

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = SearchSettings::load_from_iter(env::args_os())
        .wrap_err("failed to load directory search settings")?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build tokio runtime")?;
    runtime.block_on(run(settings))
}

async fn run(settings: SearchSettings) -> Result<()> {
    let endpoints = GithubEndpoints::parse(
        settings.search_endpoint(),
        settings.profile_endpoint(),
        settings.user_agent(),
    )
    .wrap_err("invalid endpoint URL")?;
    let token = settings.token();
    let authenticated = token.is_some();
    let github = Arc::new(
        GithubHttpSource::new(endpoints, settings.request_timeout(), token)
            .wrap_err("failed to build HTTP client")?,
    );
    info!(
        authenticated,
        search_endpoint = settings.search_endpoint(),
        "directory search client starting"
    );

    let tracker = Arc::new(RateLimitTracker::new(
        Arc::new(DefaultClock),
        settings.rate_limit_cooldown(),
    ));
    let orchestrator = Arc::new(SearchOrchestrator::with_lookup_limit(
        SearchOrchestratorPorts::new(
            github.clone(),
            github,
            Arc::new(LruQueryCache::new(settings.cache_capacity())),
        ),
        tracker,
        settings.max_concurrent_lookups(),
    ));
    let controller = DebounceController::new(orchestrator.clone(), settings.debounce_window());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    terminal::run(controller, orchestrator, stdin, &mut stdout)
        .await
        .wrap_err("terminal session failed")
}
