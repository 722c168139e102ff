//! Technical indicators over closing prices
//!
//! Every function returns `None` when the series is too short; a missing
//! indicator is never reported as zero.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::types::Indicators;

/// Simple moving average of the last `period` closes
pub fn sma(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let sum: Decimal = closes[closes.len() - period..].iter().sum();
    Some(sum / Decimal::from(period))
}

/// Relative strength index with Wilder smoothing, latest value
///
/// Needs `period + 1` closes. A window with no losses reads 100, a window
/// with no movement at all reads 50.
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let n = Decimal::from(period);
    let changes: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (mut avg_gain, mut avg_loss) = changes[..period]
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(gain, loss), &change| {
            if change > Decimal::ZERO {
                (gain + change, loss)
            } else {
                (gain, loss - change)
            }
        });
    avg_gain /= n;
    avg_loss /= n;

    for &change in &changes[period..] {
        let (gain, loss) = if change > Decimal::ZERO {
            (change, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -change)
        };
        avg_gain = (avg_gain * (n - Decimal::ONE) + gain) / n;
        avg_loss = (avg_loss * (n - Decimal::ONE) + loss) / n;
    }

    if avg_loss.is_zero() {
        return Some(if avg_gain.is_zero() { dec!(50) } else { dec!(100) });
    }
    let rs = avg_gain / avg_loss;
    Some(dec!(100) - dec!(100) / (Decimal::ONE + rs))
}

/// Compute the snapshot indicator set for the configured periods
pub fn compute(closes: &[Decimal], sma_short: usize, sma_long: usize, rsi_period: usize) -> Indicators {
    Indicators {
        rsi: rsi(closes, rsi_period),
        sma_short: sma(closes, sma_short),
        sma_long: sma(closes, sma_long),
    }
}
