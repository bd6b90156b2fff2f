//! Built-in model catalog
//!
//! The list shipped in `builtin_models.toml` is what `promptstream models`
//! shows. It is a menu, not a whitelist.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuiltinModel {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuiltinModelsConfig {
    models: Vec<BuiltinModel>,
}

/// Load built-in models from the embedded configuration
pub fn load_builtin_models() -> Vec<BuiltinModel> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_models.toml");

    let config: BuiltinModelsConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_models.toml");

    config.models
}

/// Find a built-in model by ID (case-insensitive)
pub fn find_builtin_model(id: &str) -> Option<BuiltinModel> {
    load_builtin_models()
        .into_iter()
        .find(|m| m.id.eq_ignore_ascii_case(id.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_MODEL;

    #[test]
    fn test_load_builtin_models() {
        let models = load_builtin_models();
        assert_eq!(models.len(), 17);
        assert_eq!(models[0].id, "codegemma:latest");
    }

    #[test]
    fn default_model_is_in_catalog() {
        assert!(find_builtin_model(DEFAULT_MODEL).is_some());
    }

    #[test]
    fn test_find_builtin_model() {
        let model = find_builtin_model(" Gemma2:9B ").expect("case-insensitive match");
        assert_eq!(model.display_name, "Gemma 2: 9B");
        assert!(find_builtin_model("nonexistent").is_none());
    }
}
