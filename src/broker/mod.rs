//! Order execution collaborators
//!
//! - [`AlpacaBroker`]: live/paper REST broker with a bounded fill wait
//! - [`SimulatedBroker`]: dry-run fills at the snapshot price

mod alpaca;
mod simulated;

pub use alpaca::AlpacaBroker;
pub use simulated::SimulatedBroker;
