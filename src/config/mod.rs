//! Per-vault configuration loaded from `config.toml`.

pub mod settings;

pub use settings::{KdfChoice, Settings};
