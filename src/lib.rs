//! Retrieval-augmented question answering over a remote vector index.
//!
//! Documents are split into fragments, embedded through an
//! OpenAI-compatible model service, and upserted into a Pinecone-style
//! index; questions are answered from the closest fragments while a
//! value-semantic conversation history carries prior turns.

pub mod chunker;
pub mod cli;
pub mod core;
pub mod document;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod logging;
pub mod pipeline;

pub use crate::core::config::{Credentials, Settings};
pub use crate::core::errors::{RagError, Result};
