//! Integration tests for the publishing engine

mod test_utils;

mod callbacks;
mod commit;
mod config;
mod discovery;
mod engine;
mod legacy;
mod process_registry;
mod publishing;
