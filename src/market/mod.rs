//! Market data collaborator and indicator math

pub mod indicators;
pub mod yahoo;

pub use yahoo::{ChartData, YahooMarketData};
