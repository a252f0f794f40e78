//! # Dealer Catalog
//!
//! Ingests heterogeneous per-dealer product exports (JSON arrays or
//! line-delimited JSON) into one in-memory catalog, normalizes every record
//! into a stable shape, and answers search and aggregation queries over it
//! from a CLI, an HTTP tool API, or MCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │   Loader    │──▶│  Normalize  │──▶│   Catalog    │
//! │ glob + JSON │   │ locale/attr │   │ seq + indexes│
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ query
//!                      ┌─────────────────────┤
//!                      ▼                     ▼
//!                 ┌──────────┐        ┌─────────────┐
//!                 │   CLI    │        │ HTTP / MCP  │
//!                 │  (dcat)  │        │   tools     │
//!                 └──────────┘        └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dcat --path './exports/*.jsonl' summary
//! dcat --path './exports/*.jsonl' search claw --dc-code 10 --region US
//! dcat --config dcat.toml serve http
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Product record and attribute value types |
//! | [`normalize`] | Raw record → [`models::ProductRecord`] |
//! | [`loader`] | Pattern expansion, file parsing, ingestion |
//! | [`catalog`] | Append-only store with per-dealer indexes |
//! | [`query`] | Filtering, pagination, aggregations |
//! | [`service`] | Locked catalog facade exposing every operation |
//! | [`traits`] | Tool trait, built-in tools, registry |
//! | [`server`] | HTTP tool API and MCP Streamable HTTP |
//! | [`mcp`] | MCP bridge and stdio transport |
//! | [`config`] | TOML configuration |
//! | [`cli`] | Terminal output for `dcat` |
//! | [`error`] | Library error type |

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod query;
pub mod server;
pub mod service;
pub mod traits;
