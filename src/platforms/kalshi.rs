//! Kalshi REST integration.
//!
//! Lists event markets, reads quotes and balance, and submits limit orders
//! through the Kalshi trade API.
//!
//! API docs: https://trading-api.readme.io/reference
//! Base URL: https://api.elections.kalshi.com (demo: https://demo-api.kalshi.co)
//! Prefix:   /trade-api/v2
//! Auth: `KALSHI-ACCESS-KEY`, `KALSHI-ACCESS-SIGNATURE` and
//! `KALSHI-ACCESS-TIMESTAMP` headers. The signature is produced by an
//! external `RequestSigner` over `timestamp + METHOD + path`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{MarketVenue, OrderAck};
use crate::types::{EventTicker, ListedMarket, PriceLevels, Side, Ticker};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const API_PREFIX: &str = "/trade-api/v2";
const PLATFORM_NAME: &str = "kalshi";

/// Markets requested per listing page (API max is 1000).
pub const DEFAULT_PAGE_LIMIT: u32 = 200;

/// Hard stop for cursor pagination on a single event.
const MAX_PAGES: usize = 50;

/// Kalshi deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KalshiEnvironment {
    Demo,
    Prod,
}

impl KalshiEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            KalshiEnvironment::Demo => "https://demo-api.kalshi.co",
            KalshiEnvironment::Prod => "https://api.elections.kalshi.com",
        }
    }

    /// Pick the environment from a user-supplied URL or ticker.
    ///
    /// `demo.kalshi.co` links are demo, `kalshi.com` links are production,
    /// and anything else (including bare tickers) defaults to demo.
    pub fn detect(input: &str) -> Self {
        let lower = input.to_ascii_lowercase();
        if lower.contains("demo.kalshi.co") {
            KalshiEnvironment::Demo
        } else if lower.contains("kalshi.com") {
            KalshiEnvironment::Prod
        } else {
            KalshiEnvironment::Demo
        }
    }

    /// Environment variable holding the API key id for this environment.
    pub fn key_id_env(&self) -> &'static str {
        match self {
            KalshiEnvironment::Demo => "DEMO_KEYID",
            KalshiEnvironment::Prod => "PROD_KEYID",
        }
    }
}

impl fmt::Display for KalshiEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KalshiEnvironment::Demo => write!(f, "demo"),
            KalshiEnvironment::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for KalshiEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(KalshiEnvironment::Demo),
            "prod" | "production" => Ok(KalshiEnvironment::Prod),
            other => anyhow::bail!("Unknown Kalshi environment: {other}"),
        }
    }
}

/// Produces the base64 request signature for an authenticated call.
///
/// Key loading and the signature scheme live outside this crate.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, message: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// API response types (Kalshi JSON → Rust)
// ---------------------------------------------------------------------------

/// Response from `GET /markets`.
#[derive(Debug, Deserialize)]
struct MarketsPage {
    #[serde(default)]
    markets: Vec<KalshiMarket>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Response from `GET /markets/{ticker}`.
#[derive(Debug, Deserialize)]
struct MarketEnvelope {
    market: KalshiMarket,
}

/// Kalshi market object. Prices are integer cents; absent levels mean an
/// empty side of the book.
#[derive(Debug, Deserialize)]
struct KalshiMarket {
    ticker: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    yes_bid: Option<u32>,
    #[serde(default)]
    yes_ask: Option<u32>,
    #[serde(default)]
    no_bid: Option<u32>,
    #[serde(default)]
    no_ask: Option<u32>,
    #[serde(default)]
    last_price: Option<u32>,
    #[serde(default)]
    status: Option<String>,
}

impl KalshiMarket {
    fn levels(&self) -> PriceLevels {
        PriceLevels {
            yes_bid: self.yes_bid.unwrap_or(0),
            yes_ask: self.yes_ask.unwrap_or(0),
            no_bid: self.no_bid.unwrap_or(0),
            no_ask: self.no_ask.unwrap_or(0),
            last_price: self.last_price.unwrap_or(0),
        }
    }
}

/// Response from `GET /portfolio/balance`.
#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: u64,
}

/// Body of `POST /portfolio/orders`.
#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    ticker: &'a str,
    action: &'static str,
    side: &'static str,
    count: u32,
    #[serde(rename = "type")]
    order_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    yes_price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_price: Option<u32>,
    client_order_id: String,
}

impl<'a> CreateOrderRequest<'a> {
    fn limit_buy(ticker: &'a Ticker, side: Side, count: u32, price_cents: u32) -> Self {
        let (yes_price, no_price) = match side {
            Side::Yes => (Some(price_cents), None),
            Side::No => (None, Some(price_cents)),
        };
        Self {
            ticker: ticker.as_str(),
            action: "buy",
            side: side.as_api_str(),
            count,
            order_type: "limit",
            yes_price,
            no_price,
            client_order_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Response from `POST /portfolio/orders`.
#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: KalshiOrder,
}

#[derive(Debug, Deserialize)]
struct KalshiOrder {
    order_id: String,
    #[serde(default)]
    status: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Kalshi venue client.
pub struct KalshiClient {
    http: Client,
    base_url: String,
    environment: KalshiEnvironment,
    key_id: Option<SecretString>,
    signer: Option<Arc<dyn RequestSigner>>,
    page_limit: u32,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl KalshiClient {
    /// Create a client for `environment`.
    ///
    /// Without credentials only public endpoints (market listing and
    /// quotes) will succeed.
    pub fn new(
        environment: KalshiEnvironment,
        timeout: Duration,
        min_interval: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("kalshi-scout/0.1.0")
            .build()
            .context("Failed to build HTTP client for Kalshi")?;

        Ok(Self {
            http,
            base_url: environment.base_url().to_string(),
            environment,
            key_id: None,
            signer: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Attach the API key id and the signer used for authenticated calls.
    pub fn with_credentials(mut self, key_id: SecretString, signer: Arc<dyn RequestSigner>) -> Self {
        self.key_id = Some(key_id);
        self.signer = Some(signer);
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.clamp(1, 1000);
        self
    }

    pub fn environment(&self) -> KalshiEnvironment {
        self.environment
    }

    pub fn is_authenticated(&self) -> bool {
        self.key_id.is_some() && self.signer.is_some()
    }

    // -- Internal helpers ------------------------------------------------

    /// Keep at least `min_interval` between consecutive requests.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Authentication headers for `method path`; empty when unauthenticated.
    fn auth_headers(&self, method: &str, path: &str) -> Result<Vec<(&'static str, String)>> {
        let (Some(key_id), Some(signer)) = (&self.key_id, &self.signer) else {
            return Ok(Vec::new());
        };

        let timestamp = Utc::now().timestamp_millis().to_string();
        let path_only = path.split('?').next().unwrap_or(path);
        let signature = signer
            .sign(&format!("{timestamp}{method}{path_only}"))
            .with_context(|| format!("Failed to sign {method} {path_only}"))?;

        Ok(vec![
            ("KALSHI-ACCESS-KEY", key_id.expose_secret().to_string()),
            ("KALSHI-ACCESS-SIGNATURE", signature),
            ("KALSHI-ACCESS-TIMESTAMP", timestamp),
        ])
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<T> {
        self.throttle().await;

        let mut request = request;
        for (name, value) in self.auth_headers(method, path)? {
            request = request.header(name, value);
        }

        debug!(method, path, "Kalshi request");

        let resp = request
            .send()
            .await
            .with_context(|| format!("Kalshi request failed: {method} {path}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Kalshi API error {status} on {method} {path}: {body}");
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse Kalshi response for {method} {path}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        self.send_json(self.http.get(&url), "GET", path).await
    }

    fn markets_path(&self, event: &EventTicker, cursor: Option<&str>) -> String {
        let mut path = format!(
            "{API_PREFIX}/markets?event_ticker={}&limit={}",
            urlencoding::encode(event.as_str()),
            self.page_limit,
        );
        if let Some(cursor) = cursor {
            path.push_str("&cursor=");
            path.push_str(&urlencoding::encode(cursor));
        }
        path
    }
}

/// What to do after reading page number `pages_read` of a listing.
#[derive(Debug, PartialEq, Eq)]
enum PageStep {
    Fetch(String),
    Done,
    /// More pages exist but `MAX_PAGES` were already read.
    Truncated,
}

fn next_page(cursor: Option<String>, pages_read: usize) -> PageStep {
    match cursor.filter(|c| !c.is_empty()) {
        None => PageStep::Done,
        Some(_) if pages_read >= MAX_PAGES => PageStep::Truncated,
        Some(next) => PageStep::Fetch(next),
    }
}

// ---------------------------------------------------------------------------
// MarketVenue trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketVenue for KalshiClient {
    /// List every market of an event, following the pagination cursor.
    async fn list_markets_by_event(&self, event: &EventTicker) -> Result<Vec<ListedMarket>> {
        let mut listed = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let path = self.markets_path(event, cursor.as_deref());
            let page: MarketsPage = self.get_json(&path).await?;
            pages += 1;

            for market in page.markets {
                match Ticker::parse(&market.ticker) {
                    Ok(ticker) => listed.push(ListedMarket {
                        ticker,
                        title: market.title,
                    }),
                    Err(e) => {
                        warn!(event = %event, error = %e, "Skipping market with unusable ticker");
                    }
                }
            }

            match next_page(page.cursor, pages) {
                PageStep::Fetch(next) => cursor = Some(next),
                PageStep::Done => break,
                PageStep::Truncated => {
                    warn!(
                        event = %event,
                        pages,
                        count = listed.len(),
                        "Page limit reached with more markets pending; listing is incomplete"
                    );
                    break;
                }
            }
        }

        debug!(event = %event, count = listed.len(), pages, "Kalshi markets listed");
        Ok(listed)
    }

    async fn get_quote(&self, ticker: &Ticker) -> Result<PriceLevels> {
        let path = format!("{API_PREFIX}/markets/{}", urlencoding::encode(ticker.as_str()));
        let envelope: MarketEnvelope = self.get_json(&path).await?;

        if let Some(status) = envelope.market.status.as_deref() {
            debug!(ticker = %ticker, status, "Kalshi market status");
        }

        Ok(envelope.market.levels())
    }

    async fn get_balance(&self) -> Result<u64> {
        if !self.is_authenticated() {
            anyhow::bail!("Kalshi credentials required for balance check");
        }
        let balance: BalanceResponse = self
            .get_json(&format!("{API_PREFIX}/portfolio/balance"))
            .await?;
        Ok(balance.balance)
    }

    async fn place_order(
        &self,
        ticker: &Ticker,
        side: Side,
        quantity: u32,
        price_cents: u32,
    ) -> Result<OrderAck> {
        if !self.is_authenticated() {
            anyhow::bail!("Kalshi credentials required for placing orders");
        }

        let path = format!("{API_PREFIX}/portfolio/orders");
        let body = CreateOrderRequest::limit_buy(ticker, side, quantity, price_cents);
        let url = format!("{}{path}", self.base_url);

        let envelope: OrderEnvelope = self
            .send_json(self.http.post(&url).json(&body), "POST", &path)
            .await?;

        info!(
            order_id = %envelope.order.order_id,
            client_order_id = %body.client_order_id,
            ticker = %ticker,
            side = %side,
            count = quantity,
            price_cents,
            status = %envelope.order.status,
            "Kalshi order accepted"
        );

        Ok(OrderAck {
            order_id: envelope.order.order_id,
            status: envelope.order.status,
        })
    }

    fn name(&self) -> String {
        PLATFORM_NAME.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
