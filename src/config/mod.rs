// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

pub use loader::{apply_env, default_config_path, load_config};
pub use settings::{CallSettings, Config, LimitSettings, ModelSection, ServerSettings, VapiSettings};
