//! Configuration handling.
//!
//! `trellis.config.json` is loaded with figment, with layered priority:
//! defaults < config file < `TRELLIS_`-prefixed environment variables <
//! CLI arguments.

mod conversions;
mod loading;
mod types;

pub use types::{DevSection, IndexConfig, LocaleConfig, ServiceWorkerConfig, TrellisConfig};

#[cfg(test)]
mod tests;
