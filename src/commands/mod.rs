//! Commands exposed to the UI
//!
//! Each command locks the shared engine, parses its string arguments and
//! maps every failure to a serializable [`CommandError`].

mod progress;
mod review;

pub use progress::*;
pub use review::*;
