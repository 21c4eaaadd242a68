//! Analysis Engines
//!
//! Two independent, pure analyzers: the classical scenario engine over a
//! normalized indicator snapshot, and the SMC analyzer over OHLC candles.

pub mod classical;
pub mod smc;

pub use classical::{ClassicalAnalyst, ClassicalConfig};
pub use smc::{Action, Decision, SmcAnalyzer, SmcConfig};
