//! Attempt ledger
//!
//! Every exercise submission is appended here, pass or fail. Nothing is ever
//! rewritten; other components derive their state from this history.

pub mod ledger;
pub mod models;

pub use ledger::AttemptLedger;
pub use models::*;
