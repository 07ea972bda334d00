//! # Notelens
//!
//! A local PDF knowledge base served as an agent tool, with a
//! vision-capable query client.
//!
//! Notelens answers natural-language questions from a directory of PDF
//! documents ("study notes"). Pages are ranked by keyword relevance, the
//! top pages are rasterized to PNG, and a tool-calling agent loop decides
//! whether to answer from text, from a second tool round, or from a vision
//! completion over the rendered page images.
//!
//! ## Architecture
//!
//! ```text
//! query ──▶ orchestrator ──▶ completion API (round 1)
//!               │                   │ tool call
//!               │                   ▼
//!               │            tool server ──▶ ranker ──▶ renderer
//!               │                   │                     │
//!               │                   └──── image set ◀─────┘
//!               ▼
//!        completion API (round 2: vision or tool results) ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! nlens serve                       # start the tool server
//! nlens ask "What is policy optimization?"
//! nlens rank "policy optimization"  # local ranking debug, no network
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and model → endpoint mapping |
//! | [`models`] | Core data types |
//! | [`score`] | Page relevance scoring and excerpt extraction |
//! | [`rank`] | Corpus-wide page ranking |
//! | [`pdf`] | PDF text extraction and rasterizer binding |
//! | [`render`] | Page-to-PNG rendering |
//! | [`tools`] | Tool trait, registry, and the knowledge-base tool |
//! | [`server`] | HTTP tool server |
//! | [`client`] | Tool transport client |
//! | [`llm`] | Completion API client |
//! | [`agent`] | Tool-calling orchestration |

pub mod agent;
pub mod client;
pub mod config;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod rank;
pub mod render;
pub mod score;
pub mod server;
pub mod tools;
