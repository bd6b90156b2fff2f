//! promptstream streams chat replies from Ollama-style `/api/chat` endpoints.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the ingestion pipeline: [`core::framer`] turns response
//!   chunks into lines, [`core::decoder`] turns lines into text fragments,
//!   and [`core::session`] runs requests and keeps the reply text for the
//!   current one.
//! - [`api`] defines the request and envelope payloads exchanged with the
//!   server.
//! - [`cli`] implements the `promptstream` binary on top of
//!   [`core::session::StreamSession`].
//! - [`utils`] holds URL handling and logging.

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
