//! CLI presentation: formatting for `list`.

use crate::error::InvokeError;
use crate::metadata::Registration;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

/// Table of handlers; required parameters are marked with `*`.
pub fn format_command_table(registration: &Registration) -> String {
    if registration.commands.is_empty() {
        return "No command handlers registered".to_string();
    }

    let mut commands: Vec<_> = registration.commands.iter().collect();
    commands.sort_by(|a, b| a.name.cmp(&b.name));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Command", "Description", "Parameters", "Mapped"]);

    for command in commands {
        let parameters: Vec<String> = command
            .parameters
            .iter()
            .filter(|p| p.displayable)
            .map(|p| {
                if p.required {
                    format!("{}*", p.name)
                } else {
                    p.name.clone()
                }
            })
            .collect();
        let mapped: Vec<&str> = command
            .mapped_parameters
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        table.add_row(vec![
            command.name.clone(),
            command.description.clone(),
            parameters.join(", "),
            mapped.join(", "),
        ]);
    }

    let mut output = String::new();
    if !registration.name.is_empty() {
        output.push_str(&format!("{} {}\n", registration.name, registration.version));
    }
    output.push_str(&table.to_string());
    output
}

pub fn format_registration_json(registration: &Registration) -> Result<String, InvokeError> {
    serde_json::to_string_pretty(&registration.commands)
        .map_err(|e| InvokeError::Configuration(format!("Failed to render JSON: {}", e)))
}
