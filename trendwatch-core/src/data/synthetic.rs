//! Offline candle source: a deterministic random walk.
//!
//! The seed is the BLAKE3 hash of the symbol and the request's end bucket, so
//! two fetches for the same window return identical candles and a later
//! window continues with fresh ones.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{CandleProvider, CandleRequest, DataError};
use crate::domain::{Bar, CandleSeries};

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    start_price: f64,
    /// Maximum absolute per-candle return.
    step: f64,
    base_volume: f64,
}

impl SyntheticProvider {
    pub fn new(start_price: f64) -> Self {
        Self {
            start_price,
            ..Self::default()
        }
    }

    /// Set the maximum absolute per-candle return.
    ///
    /// # Panics
    /// Panics if `step` is not a positive finite number.
    pub fn with_step(mut self, step: f64) -> Self {
        assert!(step.is_finite() && step > 0.0, "step must be positive, got {step}");
        self.step = step;
        self
    }

    fn rng_for(request: &CandleRequest, last_open: DateTime<Utc>) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(request.symbol.as_bytes());
        hasher.update(&request.resolution.seconds().to_le_bytes());
        hasher.update(&last_open.timestamp().to_le_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            step: 0.004,
            base_volume: 1_000.0,
        }
    }
}

impl CandleProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &CandleRequest) -> Result<CandleSeries, DataError> {
        if request.limit == 0 {
            return Err(DataError::DataUnavailable("requested zero candles".into()));
        }

        // Align to the open of the last candle inside the window.
        let width = request.resolution.seconds();
        let end = request.end.timestamp();
        let last_open = DateTime::from_timestamp(end - end.rem_euclid(width), 0)
            .ok_or_else(|| DataError::DataUnavailable(format!("end time {end} out of range")))?;
        let first_open = last_open - Duration::seconds(width * (request.limit as i64 - 1));

        let mut rng = Self::rng_for(request, last_open);
        let mut bars = Vec::with_capacity(request.limit);
        let mut price = self.start_price;

        for k in 0..request.limit {
            let ret: f64 = rng.gen_range(-self.step..self.step);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..self.step / 2.0));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..self.step / 2.0));
            // Occasional bursts and lulls so the volume classifier has events to flag.
            let volume = self.base_volume
                * match rng.gen_range(0..20u8) {
                    0 => rng.gen_range(1.6..3.0),
                    1 => rng.gen_range(0.1..0.45),
                    _ => rng.gen_range(0.7..1.3),
                };

            bars.push(Bar {
                timestamp: first_open + Duration::seconds(width * k as i64),
                open,
                high,
                low,
                close,
                volume,
            });
            price = close;
        }

        Ok(CandleSeries::new(bars)?)
    }
}
