//! Integration tests for docweave workspaces

mod aggregation;
mod config_layers;
mod incremental;
mod manifest;
mod resolution;
mod test_utils;
