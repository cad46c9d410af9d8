//! Exports Kubernetes component status health as Prometheus gauges
//!
//! A background poll loop lists `componentstatuses`, classifies each
//! component and writes the verdict to an owned Prometheus registry served
//! on `/metrics`.

pub mod config;
pub mod controller;
pub mod logging;
pub mod server;
