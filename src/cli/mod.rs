//! CLI module for command-line argument parsing and command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prompt-templates")]
#[command(about = "Manage reusable prompt templates with fill-in placeholders")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Use this data directory instead of the configured one
    #[arg(long, global = true, env = "PROMPT_TEMPLATES_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List templates
    List {
        /// Filter by name, description or body
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show a template with its placeholders
    Show {
        /// Template id (defaults to the active template)
        id: Option<String>,
        /// Show the body split into `## ` sections
        #[arg(long)]
        sections: bool,
    },
    /// Create a new template
    Create {
        /// Template name
        name: String,
        /// Template description
        #[arg(short, long)]
        description: Option<String>,
        /// Template body; opens an editor when omitted
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Create the starter template
    New,
    /// Edit an existing template
    Edit {
        /// Template id
        id: String,
    },
    /// Delete a template
    Delete {
        /// Template id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Normalize the `## ` section layout of a template body
    Tidy {
        /// Template id
        id: String,
    },
    /// Make a template the active one
    Activate {
        /// Template id
        id: String,
    },
    /// Fill in a template's placeholders and print the result
    Render {
        /// Template id (defaults to the active template)
        id: Option<String>,
        /// Variable value as key=value, for `{{key}}`
        #[arg(long = "var", value_parser = parse_assignment)]
        vars: Vec<(String, String)>,
        /// Block value as key=value, for `{key}`
        #[arg(long = "block", value_parser = parse_assignment)]
        blocks: Vec<(String, String)>,
        /// Prompt for each placeholder, starting from saved values
        #[arg(short, long)]
        interactive: bool,
    },
    /// Print a share link for templates (all when no id is given)
    Export {
        /// Template ids
        ids: Vec<String>,
    },
    /// Import templates from a share link
    Import {
        /// A prompttemplate:// link
        link: String,
    },
    /// Validate a JSON import payload file without importing it
    Validate {
        /// Path to a JSON file shaped like {"templates": [...]}
        file: PathBuf,
    },
    /// Compare a template's variables with its declared fields
    Lint {
        /// Template id
        id: String,
    },
    /// Change the color theme
    Theme {
        #[arg(value_enum)]
        mode: ThemeMode,
    },
    /// Pin a template to a host
    Pin {
        /// Host key, e.g. chat.example.com
        host: String,
        /// Template id
        id: String,
    },
    /// Remove a host pin
    Unpin {
        /// Host key
        host: String,
    },
    /// Show the template pinned to a host
    Pinned {
        /// Host key
        host: String,
    },
    /// Print the path of the data file
    Path,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Store templates in another directory
    SetDataDir {
        /// Directory path
        path: PathBuf,
    },
    /// Reset configuration to defaults
    Reset,
}

/// Theme selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeMode {
    Light,
    Dark,
    Toggle,
}

/// Parse `key=value`; the key is trimmed, the value kept as given
pub fn parse_assignment(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment(" name =Ada = Lovelace"),
            Ok(("name".to_string(), "Ada = Lovelace".to_string()))
        );
        assert_eq!(parse_assignment("empty="), Ok(("empty".to_string(), String::new())));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::try_parse_from([
            "prompt-templates",
            "render",
            "email-reply",
            "--var",
            "Tone=warm",
            "--block",
            "Context=Late shipment",
        ])
        .unwrap();
        match cli.command {
            Commands::Render { id, vars, blocks, interactive } => {
                assert_eq!(id.as_deref(), Some("email-reply"));
                assert_eq!(vars, vec![("Tone".to_string(), "warm".to_string())]);
                assert_eq!(blocks, vec![("Context".to_string(), "Late shipment".to_string())]);
                assert!(!interactive);
            }
            _ => panic!("expected render"),
        }
    }
}
