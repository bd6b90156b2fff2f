//! Model listing functionality

use crate::core::builtin_models::{load_builtin_models, BuiltinModel};

pub(crate) fn format_model_line(model: &BuiltinModel, current: &str) -> String {
    let marker = if model.id.eq_ignore_ascii_case(current) {
        "🎯"
    } else {
        "  "
    };
    format!("{marker} {:<28} {}", model.id, model.display_name)
}

pub fn list_models(current: &str) {
    let models = load_builtin_models();

    println!("🤖 Built-in models");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for model in &models {
        println!("{}", format_model_line(model, current));
    }
    println!();
    if !models.iter().any(|m| m.id.eq_ignore_ascii_case(current)) {
        println!("🎯 Current model: {current} (not in the catalog)");
    }
    println!("💡 Pick one with: promptstream -m <model> say <prompt>");
}
