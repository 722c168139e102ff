//! HTTP market data client (Yahoo chart endpoint + optional NewsAPI headlines)

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::indicators;
use crate::common::errors::{ArenaError, Result};
use crate::common::traits::MarketDataProvider;
use crate::common::types::{MarketSnapshot, PriceSeries};
use crate::config::types::MarketDataConfig;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    #[serde(default)]
    title: Option<String>,
}

/// Price data extracted from one chart response
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Quoted price, or the last close when no quote was present
    pub current_price: Decimal,
    /// Closes with null bars dropped, oldest first
    pub closes: Vec<Decimal>,
}

// ============================================================================
// Client
// ============================================================================

/// Market data collaborator backed by public HTTP endpoints
#[derive(Debug, Clone)]
pub struct YahooMarketData {
    client: Client,
    config: MarketDataConfig,
}

impl YahooMarketData {
    pub fn new(config: MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("strategy_arena/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArenaError::Internal(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn chart_url(&self, symbol: &str) -> Result<Url> {
        let mut url = Url::parse(self.config.chart_url.trim_end_matches('/'))?;
        url.path_segments_mut()
            .map_err(|_| ArenaError::Configuration(format!("chart_url {} cannot take a path", self.config.chart_url)))?
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("range", &self.config.range)
            .append_pair("interval", &self.config.interval);
        Ok(url)
    }

    /// Fetch the price series for one symbol
    #[instrument(skip(self))]
    pub async fn fetch_chart(&self, symbol: &str) -> Result<ChartData> {
        let url = self.chart_url(symbol)?;
        debug!("Fetching chart from: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArenaError::market_data(
                symbol,
                format!("chart returned status {}: {}", status, body),
            ));
        }

        let envelope: ChartEnvelope = response.json().await?;
        parse_chart(symbol, envelope)
    }

    /// Latest headlines for a symbol; empty when no key is configured
    ///
    /// News is decoration: failures are logged and yield an empty list.
    #[instrument(skip(self))]
    pub async fn fetch_headlines(&self, symbol: &str) -> Vec<String> {
        let Some(api_key) = self.config.news_api_key.as_deref() else {
            return Vec::new();
        };
        if self.config.headline_limit == 0 {
            return Vec::new();
        }

        match self.request_headlines(symbol, api_key).await {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!(symbol, error = %e, "News fetch failed, continuing without headlines");
                Vec::new()
            }
        }
    }

    async fn request_headlines(&self, symbol: &str, api_key: &str) -> Result<Vec<String>> {
        let mut url = Url::parse(&self.config.news_url)?;
        url.query_pairs_mut()
            .append_pair("q", symbol)
            .append_pair("language", "en")
            .append_pair("sortBy", "publishedAt")
            .append_pair("pageSize", &self.config.headline_limit.to_string());

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArenaError::InvalidResponse(format!(
                "news returned status {}",
                status
            )));
        }

        let news: NewsResponse = response.json().await?;
        if news.status != "ok" {
            return Err(ArenaError::InvalidResponse(format!(
                "news status '{}': {}",
                news.status,
                news.message.unwrap_or_default()
            )));
        }

        Ok(news
            .articles
            .into_iter()
            .filter_map(|a| a.title)
            .filter(|t| !t.trim().is_empty())
            .take(self.config.headline_limit)
            .collect())
    }
}

fn parse_chart(symbol: &str, envelope: ChartEnvelope) -> Result<ChartData> {
    if let Some(error) = envelope.chart.error {
        return Err(ArenaError::market_data(
            symbol,
            format!(
                "{}: {}",
                error.code.unwrap_or_default(),
                error.description.unwrap_or_default()
            ),
        ));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ArenaError::market_data(symbol, "empty chart result"))?;

    let closes: Vec<Decimal> = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| q.close)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(Decimal::from_f64)
        .map(|d| d.round_dp(6))
        .collect();

    let quoted = result
        .meta
        .regular_market_price
        .and_then(Decimal::from_f64)
        .map(|d| d.round_dp(6))
        .filter(|p| *p > Decimal::ZERO);

    let current_price = quoted
        .or_else(|| closes.last().copied())
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| ArenaError::market_data(symbol, "no usable price"))?;

    Ok(ChartData {
        current_price,
        closes,
    })
}

#[async_trait]
impl MarketDataProvider for YahooMarketData {
    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot> {
        let chart = self.fetch_chart(symbol).await?;
        let headlines = self.fetch_headlines(symbol).await;

        let indicators = indicators::compute(
            &chart.closes,
            self.config.sma_short,
            self.config.sma_long,
            self.config.rsi_period,
        );

        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            current_price: chart.current_price,
            price_history: vec![PriceSeries::new(self.config.interval.clone(), chart.closes)],
            news_headlines: headlines,
            indicators,
            timestamp: Utc::now(),
        })
    }

    async fn latest_price(&self, symbol: &str) -> Result<Decimal> {
        Ok(self.fetch_chart(symbol).await?.current_price)
    }
}
