//! CLI domain: parse, route, help, output, and presentation only.
//! Orchestration lives in the library modules; the route table wires them together.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::{map_error, ConsoleMessages, CommandOutput};
pub use parse::{parse_key_value, Cli, Commands, ConfigCommands};
pub use presentation::{format_command_table, format_registration_json};
pub use route::RunContext;
