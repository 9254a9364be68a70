// Library modules for scrobblify
// This allows tests to access internal modules

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod lastfm;
pub mod models;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub mod test_utils;
