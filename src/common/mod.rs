// Common Module
//
// Shared pieces used across the engine: runtime configuration and the
// cancellation signal observed by running queries.

pub mod cancel;
pub mod config;

pub use self::cancel::CancellationToken;
pub use self::config::EngineConfig;
