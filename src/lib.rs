//! # docqa
//!
//! A retrieval-augmented question answering service for local document
//! knowledge bases.
//!
//! docqa ingests documents (txt, Markdown, PDF, DOCX), splits them into
//! overlapping chunks, embeds and indexes them, and answers questions by
//! retrieving the most similar chunks and handing them to an LLM as
//! grounding context — with conversation history windowed into the request.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Loader   │──▶│   Splitter    │──▶│  VectorStore  │
//! │ txt/md/   │   │ overlapping   │   │ embed + index │
//! │ pdf/docx  │   │ chunks        │   └──────┬────────┘
//! └───────────┘   └──────────────┘          │ top-K
//!                                           ▼
//!                    ┌──────────┐     ┌──────────┐     ┌───────┐
//!                    │   CLI    │────▶│  Agent   │────▶│  LLM  │
//!                    │  / HTTP  │     │ context+ │     │       │
//!                    └──────────┘     │ history  │     └───────┘
//!                                     └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`splitter`] | Boundary-aware overlapping text splitter |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Similarity-index abstraction and in-memory backend |
//! | [`store`] | Retrieval client (add / query / clear / count) |
//! | [`llm`] | LLM provider adapters |
//! | [`prompt`] | Context assembly, templates, conversation window |
//! | [`agent`] | Query orchestration |
//! | [`loader`] | Document loading and text extraction |
//! | [`ingest`] | Load → split → index pipeline |
//! | [`server`] | HTTP API |

pub mod agent;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod models;
pub mod prompt;
pub mod server;
pub mod splitter;
pub mod store;

pub use error::{Error, Result};
