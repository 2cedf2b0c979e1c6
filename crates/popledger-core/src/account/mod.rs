//! Account management module.
//!
//! Provides account configuration, loading, and validation.

mod model;
mod store;
mod validation;

pub use model::{AccountConfig, ConnectionOptions};
pub use store::{CONFIG_ENV_VAR, default_config_path, load_config, save_config};
pub use validation::{ValidationError, ValidationResult, validate_account};
