use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::errors::Result;
use crate::common::types::MarketSnapshot;
use crate::config::types::ReversionSignal;
use crate::market::indicators::sma;
use crate::strategy::sizing::PositionSizer;
use crate::strategy::types::{Decision, StrategyContext};

const RSI_NEUTRAL: Decimal = dec!(50);

/// Where the reference statistic puts the current price
enum Reading {
    Oversold { ratio: Decimal, detail: String },
    Overbought { ratio: Decimal, detail: String },
    Neutral { detail: String },
}

/// Threshold mean-reversion
///
/// Buys when the reference statistic reads oversold and the strategy is not
/// already long; sells the whole long when it reads overbought. Confidence
/// is `ratio * confidence_scale` clamped to [0, 1], where `ratio` is the
/// distance from neutral relative to the threshold distance (so exactly at
/// the threshold, `ratio == 1`).
#[derive(Debug, Clone)]
pub struct MeanReversion {
    sizer: PositionSizer,
    signal: ReversionSignal,
    confidence_scale: f64,
}

impl MeanReversion {
    pub fn new(sizer: PositionSizer, signal: ReversionSignal, confidence_scale: f64) -> Self {
        Self {
            sizer,
            signal,
            confidence_scale,
        }
    }

    pub fn decide(&mut self, snapshot: &MarketSnapshot, ctx: &StrategyContext) -> Result<Decision> {
        let reading = match self.read(snapshot) {
            Ok(reading) => reading,
            Err(reason) => return Ok(Decision::unavailable(reason)),
        };
        let symbol = &snapshot.symbol;

        match reading {
            Reading::Oversold { ratio, detail } => {
                if ctx.has_long(symbol) {
                    return Ok(Decision::hold(0.5, format!("{}, already long", detail)));
                }
                let quantity = self.sizer.buy_quantity(snapshot)?;
                if quantity == 0 {
                    return Ok(Decision::unavailable(format!(
                        "{}, but notional buys less than one unit",
                        detail
                    )));
                }
                Ok(Decision::buy(
                    quantity,
                    self.confidence(ratio),
                    format!("{}, expecting reversion up", detail),
                ))
            }
            Reading::Overbought { ratio, detail } => {
                let quantity = self.sizer.exit_quantity(ctx, symbol);
                if quantity == 0 {
                    return Ok(Decision::hold(0.5, format!("{}, no long position to exit", detail)));
                }
                Ok(Decision::sell(
                    quantity,
                    self.confidence(ratio),
                    format!("{}, expecting reversion down", detail),
                ))
            }
            Reading::Neutral { detail } => Ok(Decision::hold(0.5, detail)),
        }
    }

    fn confidence(&self, ratio: Decimal) -> f64 {
        ratio.to_f64().unwrap_or(0.0) * self.confidence_scale
    }

    fn read(&self, snapshot: &MarketSnapshot) -> std::result::Result<Reading, String> {
        match &self.signal {
            ReversionSignal::SmaDeviation { lookback, threshold } => {
                let mean = sma(snapshot.primary_closes(), *lookback).ok_or_else(|| {
                    "Not enough price history for mean reversion".to_string()
                })?;
                if mean <= Decimal::ZERO || *threshold <= Decimal::ZERO {
                    return Err(format!("Unusable SMA({}) of {}", lookback, mean));
                }

                let deviation = (snapshot.current_price - mean) / mean;
                let pct = (deviation * dec!(100)).round_dp(3);
                let ratio = deviation.abs() / *threshold;

                Ok(if deviation < -*threshold {
                    Reading::Oversold {
                        ratio,
                        detail: format!("Price {}% below SMA({})", pct.abs(), lookback),
                    }
                } else if deviation > *threshold {
                    Reading::Overbought {
                        ratio,
                        detail: format!("Price {}% above SMA({})", pct, lookback),
                    }
                } else {
                    Reading::Neutral {
                        detail: format!(
                            "Price within {}% of SMA({}), no clear signal",
                            (*threshold * dec!(100)).normalize(),
                            lookback
                        ),
                    }
                })
            }
            ReversionSignal::Rsi {
                oversold,
                overbought,
            } => {
                let rsi = snapshot
                    .indicators
                    .rsi
                    .ok_or_else(|| "RSI unavailable, not enough price history".to_string())?;
                if *oversold >= RSI_NEUTRAL || *overbought <= RSI_NEUTRAL {
                    return Err(format!(
                        "RSI bands {}/{} do not straddle {}",
                        oversold, overbought, RSI_NEUTRAL
                    ));
                }

                let shown = rsi.round_dp(1);
                Ok(if rsi < *oversold {
                    Reading::Oversold {
                        ratio: (RSI_NEUTRAL - rsi) / (RSI_NEUTRAL - *oversold),
                        detail: format!("RSI {} below {} (oversold)", shown, oversold),
                    }
                } else if rsi > *overbought {
                    Reading::Overbought {
                        ratio: (rsi - RSI_NEUTRAL) / (*overbought - RSI_NEUTRAL),
                        detail: format!("RSI {} above {} (overbought)", shown, overbought),
                    }
                } else {
                    Reading::Neutral {
                        detail: format!("RSI {} inside {}-{}, no clear signal", shown, oversold, overbought),
                    }
                })
            }
        }
    }
}
