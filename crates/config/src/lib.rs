// Configuration loading

pub mod settings;

pub use settings::{SavePolicy, Settings, SettingsError};
