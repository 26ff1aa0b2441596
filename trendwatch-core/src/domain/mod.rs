//! Domain types: bars and candle series.

pub mod bar;
pub mod series;

pub use bar::{Bar, BarError};
pub use series::{CandleSeries, SeriesError};

/// Symbol type alias
pub type Symbol = String;
