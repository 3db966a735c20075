//! Exchange rate outbound adapters.
//!
//! This module provides an HTTP implementation of the `RateSource` port
//! reading the central-bank daily JSON document.

mod dto;
mod http_source;

pub use http_source::RatesHttpSource;
