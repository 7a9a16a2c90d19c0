//! Sentiment prediction gateway.
//!
//! `POST /api/predict` validates `{ "text": ... }`, hands the text to a
//! [`predictor::Predictor`] (by default an external script run once per
//! request) and relays its `{ prediction, confidence }` answer. The [`form`]
//! module is the client side of the same exchange.

pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod models;
pub mod predictor;
pub mod server;

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, honouring `RUST_LOG`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
