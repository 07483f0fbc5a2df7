//! Pure computation for settlement. No I/O.

pub mod commission;

pub use commission::{CommissionCalculator, CommissionError, CommissionRates, CommissionSplit};
