//! Integration tests for the content-addressed archive

mod cli;
mod content_store;
mod indexer;
mod reconstruct;
mod support;
mod virtual_fs;
