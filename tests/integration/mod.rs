//! Integration tests for the arbor access engine

mod properties;
mod scenarios;
mod service_flow;
mod store_integration;
mod support;
