// Library interface for smallsh
// The binary is a thin line-reading loop over these modules; tests and
// benchmarks use them directly.

pub mod builtins;
pub mod config;
pub mod error;
pub mod executor;
pub mod expansion;
pub mod input;
pub mod jobs;
pub mod parser;
pub mod runtime;
pub mod signal;
