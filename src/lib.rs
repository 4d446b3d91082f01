// Open Data Exporter - scheduled analytics report pipelines
// Copyright (c) 2025 Open Data Exporter Contributors
// Licensed under the MIT License

//! # Open Data Exporter
//!
//! Runs named, configuration-defined jobs that pull data from a contact-center
//! analytics API, reshape it, render it and deliver it to sinks, either on a
//! cron schedule or on demand.
//!
//! ## Overview
//!
//! A job is an ordered list of stages over a per-run [`domain::DataBag`]:
//! - **Requests** call the API (with auth, pagination and retry) and store the
//!   result under the request's name
//! - **Transforms** reshape the bag with builtins or registered extension
//!   functions, such as the bundled daily report card
//! - **Templates** render handlebars views of the bag
//! - **Exports** deliver a rendered artifact to a file, an HTTP endpoint or stdout
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Stages, extensions, job runner, scheduler and the [`core::Exporter`] facade
//! - [`adapters`] - API transport and export sinks
//! - [`auth`] - Bearer credentials, token providers, PKCE login helpers
//! - [`domain`] - Job definitions, DataBag, identifiers and errors
//! - [`config`] - Configuration loading and validation
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use open_data_exporter::auth::ClientCredentialsProvider;
//! use open_data_exporter::config::load_config;
//! use open_data_exporter::core::Exporter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("exporter.json")?;
//!     let tokens = Arc::new(ClientCredentialsProvider::from_config(&config.credentials)?);
//!     let exporter = Exporter::from_config(config, tokens)?;
//!
//!     for result in exporter.run_now(&["daily_report_card".to_string()]).await {
//!         result.log_summary();
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Extensions
//!
//! Custom transforms are plain functions over the DataBag:
//!
//! ```rust
//! use open_data_exporter::core::extensions::ExtensionRegistry;
//! use open_data_exporter::domain::DataBag;
//! use serde_json::{json, Map, Value};
//!
//! let mut registry = ExtensionRegistry::with_defaults();
//! registry.register("mine.count_queues", |bag: &mut DataBag, _: &Map<String, Value>| {
//!     let count = bag
//!         .pointer("/get_queues/entities")
//!         .and_then(Value::as_array)
//!         .map_or(0, Vec::len);
//!     bag.insert("queue_count", json!(count));
//!     Ok(())
//! });
//! assert!(registry.contains("mine.count_queues"));
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`], whose error is [`domain::ExporterError`]:
//!
//! ```rust,no_run
//! use open_data_exporter::domain::ExporterError;
//!
//! fn example() -> Result<(), ExporterError> {
//!     let config = open_data_exporter::config::load_config("exporter.json")?;
//!     println!("{} jobs", config.jobs.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
