//! Investment Strategies
//!
//! Timing rules for dollar-cost averaging.

mod dca;

pub use dca::SignalClassifier;
