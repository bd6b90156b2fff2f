use crate::core::config::data::{Config, ResolvedConfig};

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

impl Config {
    pub fn print_all(&self, resolved: &ResolvedConfig) {
        println!("Current configuration:");
        println!("  endpoint: {}", or_unset(self.endpoint.as_deref()));
        println!("  default-model: {}", or_unset(self.default_model.as_deref()));
        match self.inject_context {
            Some(true) => println!("  context: on"),
            Some(false) => println!("  context: off"),
            None => println!("  context: (unset)"),
        }
        println!("  user-name: {}", or_unset(self.user_name.as_deref()));
        println!("  timezone: {}", or_unset(self.timezone.as_deref()));
        match self.timeout_secs {
            Some(secs) => println!("  timeout: {secs}s"),
            None => println!("  timeout: (unset)"),
        }
        println!();
        println!("Effective settings:");
        println!("  endpoint: {}", resolved.endpoint);
        println!("  model: {}", resolved.model);
        println!(
            "  context: {}",
            if resolved.inject_context { "on" } else { "off" }
        );
        println!(
            "  timezone: {}",
            resolved.timezone.map_or("local", |tz| tz.name())
        );
    }
}
