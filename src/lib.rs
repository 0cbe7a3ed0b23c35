// classify-cache - Bounded TTL/LRU response cache in front of an LLM book-query classifier
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod utils;
