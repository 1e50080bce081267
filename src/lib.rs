//! # wordflow
//!
//! Word counting and top-10 word frequency analysis for uploaded files, plus a
//! small self-hosted workflow runner that reacts to storage events and records
//! one analysis row per object.
//!
//! ## Usage
//!
//! ```bash
//! wordflow analyze notes.txt
//! wordflow run --bucket uploads --object notes.txt
//! wordflow serve --bind 0.0.0.0:8080
//! ```
//!
//! ## Modules
//!
//! - `analyzer` - Pure text analysis: tokenization, totals, ranked frequencies
//! - `app` - Logging, fatal error reporting and component wiring for the binary
//! - `config` - YAML/TOML configuration with environment overrides
//! - `error` - Error type with numeric codes and transient/permanent classification
//! - `retry` - Bounded exponential backoff for collaborator calls
//! - `server` - axum HTTP service exposing the analyzer and the event trigger
//! - `sink` - Analysis table backends (HTTP `insertAll`, JSON lines)
//! - `storage` - Object storage backends (HTTP JSON API, local directory)
//! - `workflow` - Workflow definitions, storage events, step journal and executor

pub mod analyzer;
pub mod app;
pub mod config;
pub mod error;
pub mod retry;
pub mod server;
pub mod sink;
pub mod storage;
pub mod workflow;

pub use analyzer::{AnalysisResult, TextAnalyzer, WordFrequencyEntry};
pub use error::{Result, WordflowError};
