//! Streaming technical-indicator calculators over OHLCV bars.
//!
//! A [`Calculator`](indicator::Calculator) is fed one [`Bar`](model::Bar) at a
//! time through an [`Engine`](engine::Engine), which keeps a
//! [`BoundedHistory`](history::BoundedHistory) of prior bars for lookback.
//! Each bar yields a [`CalculatorResult`](indicator::CalculatorResult) with
//! plot values, style overrides and optional [`graphics`].

pub mod config;
pub mod engine;
pub mod error;
pub mod graphics;
pub mod history;
pub mod indicator;
pub mod model;
