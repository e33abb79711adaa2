pub mod camelot;
pub mod config;
pub mod export;
pub mod groups;
pub mod key;
pub mod library;
pub mod scoring;
pub mod sequencer;
pub mod session;

/// Application name for XDG paths
pub const APP_NAME: &str = "setmix";
