//! Alpaca-compatible REST broker

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::common::errors::{ArenaError, Result};
use crate::common::traits::Broker;
use crate::common::types::{Fill, OrderRequest};
use crate::config::types::BrokerConfig;

const CLIENT_ORDER_ID_MAX: usize = 128;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct NewOrder<'a> {
    symbol: &'a str,
    qty: String,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    time_in_force: &'a str,
    client_order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OrderStatus {
    id: String,
    status: String,
    #[serde(default)]
    filled_avg_price: Option<Decimal>,
    #[serde(default)]
    filled_qty: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    equity: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    qty: Decimal,
}

/// Where an order ended up after the bounded wait
#[derive(Debug, Clone, PartialEq)]
enum OrderOutcome {
    Filled { price: Decimal, order_id: String },
    Dead(String),
    TimedOut(String),
}

// ============================================================================
// Broker
// ============================================================================

/// REST broker for Alpaca's trading API (paper or live)
///
/// When not connected, orders are either simulated (if
/// `dry_run_when_disconnected`) or dropped.
#[derive(Debug, Clone)]
pub struct AlpacaBroker {
    client: Client,
    config: BrokerConfig,
    base_url: String,
    fill_timeout: Duration,
    connected: bool,
}

impl AlpacaBroker {
    pub fn new(config: BrokerConfig, fill_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ArenaError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            fill_timeout,
            connected: false,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        match (&self.config.api_key, &self.config.api_secret) {
            (Some(key), Some(secret)) => Ok(builder
                .header("APCA-API-KEY-ID", key)
                .header("APCA-API-SECRET-KEY", secret)),
            _ => Err(ArenaError::Configuration(
                "broker.api_key and broker.api_secret are required".to_string(),
            )),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.authed(self.client.get(&url))?.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArenaError::Broker(format!(
                "GET {} returned status {}: {}",
                path, status, body
            )));
        }
        Ok(Some(response.json().await?))
    }

    #[instrument(skip(self))]
    async fn submit(&self, order: &OrderRequest) -> Result<OrderStatus> {
        let body = NewOrder {
            symbol: &order.symbol,
            qty: order.quantity.to_string(),
            side: order.side.as_lower(),
            order_type: "market",
            time_in_force: "day",
            client_order_id: client_order_id(&order.tag),
        };

        let url = format!("{}/v2/orders", self.base_url);
        let response = self.authed(self.client.post(&url))?.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ArenaError::Broker(format!(
                "order rejected with status {}: {}",
                status, text
            )));
        }
        Ok(response.json().await?)
    }

    async fn wait_for_fill(&self, submitted: OrderStatus) -> Result<OrderOutcome> {
        let deadline = Instant::now() + self.fill_timeout;
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut current = submitted;

        loop {
            match current.status.as_str() {
                "filled" => {
                    let price = current.filled_avg_price.ok_or_else(|| {
                        ArenaError::InvalidResponse(format!(
                            "order {} filled without an average price",
                            current.id
                        ))
                    })?;
                    return Ok(OrderOutcome::Filled {
                        price,
                        order_id: current.id,
                    });
                }
                "canceled" | "expired" | "rejected" | "suspended" | "done_for_day" => {
                    return Ok(OrderOutcome::Dead(current.status));
                }
                _ => {}
            }

            if Instant::now() + poll > deadline {
                return Ok(OrderOutcome::TimedOut(current.status));
            }
            sleep(poll).await;

            let path = format!("/v2/orders/{}", current.id);
            current = self
                .get_json::<OrderStatus>(&path)
                .await?
                .ok_or_else(|| ArenaError::Broker(format!("order {} disappeared", current.id)))?;
            debug!(order_id = %current.id, status = %current.status, filled_qty = ?current.filled_qty, "Order status");
        }
    }
}

/// Client order ids must be unique per account, so the tag gets a suffix
fn client_order_id(tag: &str) -> String {
    let suffix = format!("-{}", Utc::now().timestamp_micros());
    let room = CLIENT_ORDER_ID_MAX.saturating_sub(suffix.len());
    let base: String = tag.chars().take(room).collect();
    format!("{}{}", base, suffix)
}

#[async_trait]
impl Broker for AlpacaBroker {
    #[instrument(skip(self))]
    async fn connect(&mut self) -> bool {
        match self.get_json::<AccountResponse>("/v2/account").await {
            Ok(Some(account)) => {
                info!(base_url = %self.base_url, status = ?account.status, equity = ?account.equity, "Connected to broker");
                self.connected = true;
            }
            Ok(None) => {
                warn!("Broker account endpoint not found");
                self.connected = false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to broker");
                self.connected = false;
            }
        }
        self.connected
    }

    async fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            info!("Disconnected from broker");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn execute(&self, order: &OrderRequest) -> Option<Fill> {
        if order.quantity == 0 {
            return None;
        }

        if !self.connected {
            if self.config.dry_run_when_disconnected && order.reference_price > Decimal::ZERO {
                let fill = Fill::simulated(order);
                info!(
                    tag = %order.tag,
                    side = %fill.side,
                    quantity = fill.quantity,
                    symbol = %fill.symbol,
                    price = %fill.price,
                    simulated = true,
                    "[SIMULATED] broker disconnected, dry-run fill"
                );
                return Some(fill);
            }
            warn!(symbol = %order.symbol, "Broker not connected, order dropped");
            return None;
        }

        let submitted = match self.submit(order).await {
            Ok(status) => status,
            Err(e) => {
                error!(tag = %order.tag, symbol = %order.symbol, error = %e, "Order submission failed");
                return None;
            }
        };
        info!(order_id = %submitted.id, tag = %order.tag, status = %submitted.status, "Order submitted");

        match self.wait_for_fill(submitted).await {
            Ok(OrderOutcome::Filled { price, order_id }) => {
                info!(
                    tag = %order.tag,
                    side = %order.side,
                    quantity = order.quantity,
                    symbol = %order.symbol,
                    price = %price,
                    order_id = %order_id,
                    "Order filled"
                );
                Some(Fill {
                    symbol: order.symbol.clone(),
                    side: order.side,
                    quantity: order.quantity,
                    price,
                    order_id: Some(order_id),
                    simulated: false,
                    filled_at: Utc::now(),
                })
            }
            Ok(OrderOutcome::Dead(status)) => {
                warn!(tag = %order.tag, symbol = %order.symbol, status = %status, "Order not filled");
                None
            }
            Ok(OrderOutcome::TimedOut(status)) => {
                warn!(tag = %order.tag, symbol = %order.symbol, status = %status, timeout = ?self.fill_timeout, "Order fill wait timed out");
                None
            }
            Err(e) => {
                error!(tag = %order.tag, symbol = %order.symbol, error = %e, "Order status polling failed");
                None
            }
        }
    }

    async fn position(&self, symbol: &str) -> Decimal {
        if !self.connected {
            return Decimal::ZERO;
        }
        match self.get_json::<PositionResponse>(&format!("/v2/positions/{}", symbol)).await {
            Ok(position) => position.map(|p| p.qty).unwrap_or_default(),
            Err(e) => {
                warn!(symbol, error = %e, "Position lookup failed");
                Decimal::ZERO
            }
        }
    }

    async fn account_value(&self) -> Decimal {
        if !self.connected {
            return Decimal::ZERO;
        }
        match self.get_json::<AccountResponse>("/v2/account").await {
            Ok(account) => account.and_then(|a| a.equity).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Account lookup failed");
                Decimal::ZERO
            }
        }
    }

    fn broker_name(&self) -> &'static str {
        "alpaca"
    }
}
