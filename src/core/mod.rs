pub mod accumulator;
pub mod builtin_models;
pub mod chat_stream;
pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod framer;
pub mod ndjson;
pub mod session;
