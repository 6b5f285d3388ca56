use crate::support::{exit_with, load_config_or_exit, print_json};
use serde_json::json;

pub fn run(config: String, json_output: bool) {
    let config = load_config_or_exit(&config);
    let inventory = config.inventory().unwrap_or_else(|e| exit_with(e));
    let required = config.required_variables(&inventory);

    if json_output {
        print_json(&json!({
            "parameters": inventory.entries().collect::<Vec<_>>(),
            "required": required,
        }));
    } else {
        println!("auvworld inventory");
        for entry in inventory.entries() {
            let marker = if required.contains(&entry.canonical) {
                "*"
            } else {
                " "
            };
            let kind = if entry.optional { "optional" } else { "required" };
            println!(
                "  {marker} {} ({kind}, surface default {}): {}",
                entry.canonical,
                entry.surface_default,
                entry.aliases.join(", ")
            );
            if !entry.alternates.is_empty() {
                println!("      alternates: {}", entry.alternates.join(", "));
            }
        }
    }
}
