//! Candle sources: the provider trait, the exchange client and offline providers.

pub mod delta;
pub mod provider;
pub mod synthetic;

pub use delta::{DeltaProvider, DEFAULT_BASE_URL};
pub use provider::{CandleProvider, CandleRequest, DataError, Resolution, StaticProvider};
pub use synthetic::SyntheticProvider;
