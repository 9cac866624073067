pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// Factory helpers, one typed context per command
pub fn run() -> LogCtx<ops::run::Run> { LogCtx::new(config::logs_are_json()) }
pub fn cache() -> LogCtx<ops::cache::Cache> { LogCtx::new(config::logs_are_json()) }
pub fn canon() -> LogCtx<ops::canon::Canon> { LogCtx::new(config::logs_are_json()) }
