pub mod data;
pub mod io;
pub mod printing;
pub mod settings;


pub use data::{Config, Overrides, ResolvedConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use io::ConfigError;
pub use settings::SettingError;
