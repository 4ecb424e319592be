//! KALSHI-SCOUT: event-wide market comparison and guarded order entry
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves the market input, quotes every market in its event and,
//! when betting is enabled, walks the operator through the
//! two-stage confirmation workflow.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use kalshi_scout::config::{self, AppConfig};
use kalshi_scout::console::StdinPrompt;
use kalshi_scout::engine::aggregator::QuoteAggregator;
use kalshi_scout::engine::expander::EventExpander;
use kalshi_scout::engine::report::{render_recommendations, render_snapshot};
use kalshi_scout::engine::resolver;
use kalshi_scout::engine::workflow::GuardedOrderWorkflow;
use kalshi_scout::platforms::kalshi::KalshiClient;
use kalshi_scout::platforms::MarketVenue;
use kalshi_scout::signals::spread::SpreadHeuristic;
use kalshi_scout::strategy::{AdvisorConfig, BettingAdvisor};

const BANNER: &str = r#"
 _  __     _     _     _       ____                  _
| |/ /__ _| |___| |__ (_)     / ___|  ___ ___  _   _| |_
| ' // _` | / __| '_ \| |_____\___ \ / __/ _ \| | | | __|
| . \ (_| | \__ \ | | | |_____|___) | (_| (_) | |_| | |_
|_|\_\__,_|_|___/_| |_|_|     |____/ \___\___/ \__,_|\__|

  Event-wide market comparison for Kalshi
  v0.1.0
"#;

const USAGE: &str = "\
Usage: kalshi-scout <market-url-or-ticker>

  The market can also be supplied via KALSHI_URL or [market] url in config.toml.
  Set KALSHI_BETTING=true to run the confirmation workflow after the table.

Examples:
  kalshi-scout https://kalshi.com/markets/kxrtconjuring/conjuring/kxrtconjuring-70
  kalshi-scout KXRTCONJURING-70";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");

    let Some(input) = cfg.market_input(std::env::args().nth(1)) else {
        println!("{USAGE}");
        anyhow::bail!("No market URL or ticker provided");
    };

    // -- Resolve ---------------------------------------------------------

    let ticker = resolver::resolve(&input)?;
    let environment = cfg.venue.resolve_environment(&input)?;
    info!(%ticker, %environment, "Resolved market input");

    // -- Venue client ----------------------------------------------------

    let client = KalshiClient::new(
        environment,
        cfg.venue.timeout(),
        cfg.venue.min_request_interval(),
    )?
    .with_page_limit(cfg.venue.page_limit);

    if AppConfig::resolve_env(environment.key_id_env()).is_ok() {
        warn!(
            key_env = environment.key_id_env(),
            "API key id found but no request signer is configured; balance and order calls will be rejected"
        );
    }

    info!(
        environment = %client.environment(),
        authenticated = client.is_authenticated(),
        "Kalshi client ready"
    );

    let venue: Arc<dyn MarketVenue> = Arc::new(client);

    // -- Expand and quote ------------------------------------------------

    let expander = EventExpander::new(Arc::clone(&venue));
    let snapshot = expander.expand(&ticker).await?;
    info!(event = %snapshot.event, markets = snapshot.len(), "Expanded event");

    let aggregator = QuoteAggregator::new(Arc::clone(&venue), cfg.venue.max_concurrent_quotes);
    let snapshot = aggregator.fetch_quotes(snapshot).await?;

    println!("{}", render_snapshot(&snapshot));

    if !cfg.betting_enabled() {
        info!(
            "Betting workflow disabled (set {}=true to enable)",
            config::BETTING_ENV
        );
        return Ok(());
    }

    // -- Advise and confirm ----------------------------------------------

    let advisor = BettingAdvisor::new(AdvisorConfig::from(&cfg.advisor));
    let recommendations = advisor.recommend(&snapshot, &SpreadHeuristic::default()).await;
    println!("{}", render_recommendations(&recommendations));

    let workflow = GuardedOrderWorkflow::new(venue);
    let mut prompt = StdinPrompt::new();
    let report = workflow.run(&recommendations, &mut prompt).await;

    println!("{report}");

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kalshi_scout=info"));

    let json_logging = std::env::var("KALSHI_SCOUT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
