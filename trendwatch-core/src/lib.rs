//! Trendwatch Core: Supertrend signal engine and alerting.
//!
//! - Domain types (bars, validated candle series)
//! - Indicators: true range, ATR, volume average, Supertrend band engine
//! - Dual-Supertrend signal generator and volume classifier
//! - Alert gate with persisted last-signal state
//! - Candle providers (Delta Exchange, synthetic, static)
//! - Alert sinks (Telegram, CSV journal, terminal bell)
//! - Check cycle, fixed-interval scheduler and TOML configuration

pub mod alerts;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod notify;
pub mod signals;
