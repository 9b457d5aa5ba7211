//! Prompt Templates - a terminal manager for reusable prompt templates
//!
//! Templates hold `{{variable}}` and `{block}` placeholders that are filled in
//! to produce the final prompt text. Templates can be shared as
//! `prompttemplate://` links.

use anyhow::{anyhow, Result};
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, Editor, Input};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod templates;

use cli::{Cli, Commands, ConfigAction, ThemeMode};
use config::Config;
use templates::sections::{compose_sections, split_sections};
use templates::share::{encode_share_link, parse_share_link};
use templates::validate::{lint_fields, validate};
use templates::{AutoSaver, InputValues, Template, TemplateManager, TemplatePatch, TemplateStorage};

/// Environment variable holding the log filter
const LOG_ENV: &str = "PROMPT_TEMPLATES_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::load().await?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Config { action } => handle_config_command(action, config).await,
        command => {
            let storage = Arc::new(TemplateStorage::new(&config.data_dir).await?);
            let manager = TemplateManager::new(storage).await?;
            handle_template_command(command, manager, &config).await
        }
    }
}

/// Log to stderr, filtered by `PROMPT_TEMPLATES_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Handle configuration commands
async fn handle_config_command(action: ConfigAction, mut config: Config) -> Result<()> {
    match action {
        ConfigAction::Show => config.display(),
        ConfigAction::SetDataDir { path } => {
            config.set_data_dir(path).await?;
            println!("✅ Data directory set to {}", config.data_dir.display());
        }
        ConfigAction::Reset => {
            config.reset().await?;
            println!("✅ Configuration reset successfully!");
        }
    }
    Ok(())
}

/// Handle template commands
async fn handle_template_command(command: Commands, mut manager: TemplateManager, config: &Config) -> Result<()> {
    match command {
        Commands::List { search } => {
            let templates = match search {
                Some(query) => manager.search(&query),
                None => manager.list_all(),
            };

            if templates.is_empty() {
                println!("📭 No templates found");
                return Ok(());
            }

            let active = manager.active().map(|t| t.id.clone());
            println!("📋 Templates:");
            println!();
            for template in templates {
                let marker = if active.as_deref() == Some(template.id.as_str()) {
                    "*".bright_green().bold()
                } else {
                    " ".normal()
                };
                println!("{} {} {}", marker, template.id.bright_cyan(), template.display_name());
                if !template.description.is_empty() {
                    println!("    {}", template.description.bright_black());
                }
            }
        }

        Commands::Show { id, sections } => {
            let template = resolve_template(&manager, id.as_deref())?;
            print_template(template, sections);
        }

        Commands::Create { name, description, body } => {
            let description = match description {
                Some(desc) => desc,
                None => Input::new()
                    .with_prompt("Template description")
                    .allow_empty(true)
                    .interact_text()?,
            };

            let body = match body {
                Some(body) => body,
                None => Editor::new()
                    .edit("Enter the template text. Use {{variable}} and {block} placeholders.")?
                    .ok_or_else(|| anyhow!("Template body is required"))?,
            };

            let template = manager.create(name, description, body).await?;
            println!("✅ Template '{}' created successfully!", template.id);
        }

        Commands::New => {
            let template = manager.create_starter().await?;
            println!("✅ Template '{}' created successfully!", template.id);
        }

        Commands::Edit { id } => {
            let Some(existing) = manager.get(&id).cloned() else {
                println!("❌ Template '{id}' not found");
                return Ok(());
            };

            let name: String = Input::new()
                .with_prompt("Template name")
                .default(existing.name.clone())
                .interact_text()?;

            let description: String = Input::new()
                .with_prompt("Template description")
                .default(existing.description.clone())
                .allow_empty(true)
                .interact_text()?;

            // Edit body via editor
            let body = Editor::new().edit(&existing.body)?.unwrap_or(existing.body);

            let patch = TemplatePatch {
                name: Some(name),
                description: Some(description),
                body: Some(body),
            };
            manager.update(&id, patch).await?;
            println!("✅ Template '{id}' updated successfully!");
        }

        Commands::Delete { id, force } => {
            let Some(template) = manager.get(&id) else {
                println!("❌ Template '{id}' not found");
                return Ok(());
            };

            let should_delete = force
                || Confirm::new()
                    .with_prompt(format!("Delete template \"{}\"?", template.display_name()))
                    .default(false)
                    .interact()?;

            if should_delete {
                manager.delete(&id).await?;
                println!("✅ Template '{id}' deleted successfully!");
                match manager.active() {
                    Some(active) => println!("Active template: {}", active.id.bright_cyan()),
                    None => println!("No templates left"),
                }
            } else {
                println!("❌ Template deletion cancelled");
            }
        }

        Commands::Tidy { id } => {
            let template = resolve_template(&manager, Some(id.as_str()))?;
            let tidied = compose_sections(&split_sections(&template.body));
            if tidied == template.body {
                println!("✅ Template '{id}' is already tidy");
                return Ok(());
            }
            let patch = TemplatePatch {
                body: Some(tidied),
                ..Default::default()
            };
            manager.update(&id, patch).await?;
            println!("✅ Template '{id}' tidied");
        }

        Commands::Activate { id } => {
            manager.set_active(&id).await?;
            println!("✅ Active template: {}", id.bright_cyan());
        }

        Commands::Render { id, vars, blocks, interactive } => {
            let template = resolve_template(&manager, id.as_deref())?.clone();
            let mut values = manager.input_values(&template.id);
            values.variables.extend(vars);
            values.blocks.extend(blocks);

            if interactive {
                values = prompt_for_values(&mut manager, &template, values, config.autosave_delay(), prompt_value).await?;
            }

            let output = manager
                .render(&template.id, &values)
                .ok_or_else(|| anyhow!("Template '{}' not found", template.id))?;
            println!("{output}");
        }

        Commands::Export { ids } => {
            let selected = manager.export(&ids);
            if selected.is_empty() {
                println!("❌ No matching templates");
                return Ok(());
            }
            println!("{}", encode_share_link(&selected)?);
        }

        Commands::Import { link } => match parse_share_link(&link, &config.import_limits) {
            Ok(imported) => {
                let count = imported.len();
                let ids = manager.import(imported).await?;
                let message = if count == 1 { "Template imported." } else { "Templates imported." };
                println!("✅ {} {}", message, ids.join(", ").bright_cyan());
            }
            Err(e) => println!("❌ {e}"),
        },

        Commands::Validate { file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let payload: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| anyhow!("{} is not valid JSON: {}", file.display(), e))?;
            let outcome = validate(&payload, &config.import_limits);
            if outcome.valid {
                println!("✅ Payload is valid");
            } else {
                println!("❌ {}", outcome.error);
            }
        }

        Commands::Lint { id } => {
            let template = resolve_template(&manager, Some(id.as_str()))?;
            let lint = lint_fields(&template.body, &template.fields);
            if lint.is_clean() {
                println!("✅ Fields and placeholders agree");
            } else {
                if !lint.unknown_placeholders.is_empty() {
                    println!("Placeholders without a field: {}", lint.unknown_placeholders.join(", ").bright_yellow());
                }
                if !lint.unused_fields.is_empty() {
                    println!("Fields never used: {}", lint.unused_fields.join(", ").bright_yellow());
                }
            }
        }

        Commands::Theme { mode } => {
            let theme = match mode {
                ThemeMode::Light => {
                    manager.set_theme("light").await?;
                    "light".to_string()
                }
                ThemeMode::Dark => {
                    manager.set_theme("dark").await?;
                    "dark".to_string()
                }
                ThemeMode::Toggle => manager.toggle_theme().await?,
            };
            println!("✅ Theme: {theme}");
        }

        Commands::Pin { host, id } => {
            manager.pin(&host, &id).await?;
            println!("📌 Pinned '{}' to {}", id, host.bright_cyan());
        }

        Commands::Unpin { host } => match manager.unpin(&host).await? {
            Some(id) => println!("✅ Unpinned '{id}' from {host}"),
            None => println!("Nothing pinned to {host}"),
        },

        Commands::Pinned { host } => match manager.pinned_for(&host) {
            Some(template) => println!("{} {}", template.id.bright_cyan(), template.display_name()),
            None => println!("Nothing pinned to {host}"),
        },

        Commands::Path => println!("{}", manager.data_path().display()),

        Commands::Config { action } => return handle_config_command(action, config.clone()).await,
    }

    Ok(())
}

/// Look up a template by id, or the active template when no id is given
fn resolve_template<'a>(manager: &'a TemplateManager, id: Option<&str>) -> Result<&'a Template> {
    match id {
        Some(id) => manager
            .get(id)
            .ok_or_else(|| anyhow!("Template '{}' not found", id)),
        None => manager.active().ok_or_else(|| anyhow!("No templates available")),
    }
}

/// Print a template with its detected placeholders
fn print_template(template: &Template, sections: bool) {
    let scan = templates::tokens::scan(&template.body);

    println!("📄 Template: {}", template.display_name().bright_green().bold());
    println!("Id: {}", template.id.bright_cyan());
    if !template.description.is_empty() {
        println!("Description: {}", template.description);
    }
    println!("Variables: {}", scan.variables.join(", ").bright_yellow());
    println!("Blocks: {}", scan.blocks.join(", ").bright_yellow());
    println!();

    if sections {
        for section in split_sections(&template.body) {
            println!("{}", format!("## {}", section.title).bright_cyan().bold());
            println!("{}", section.content);
        }
        return;
    }

    println!("{}", "─".repeat(60).bright_black());
    for part in &scan.parts {
        match part {
            templates::tokens::Token::Text(text) => print!("{text}"),
            templates::tokens::Token::Variable(_) => print!("{}", part.label().bright_green()),
            templates::tokens::Token::Block(_) => print!("{}", part.label().bright_magenta()),
        }
    }
    println!();
    println!("{}", "─".repeat(60).bright_black());
}

/// Prompt for every placeholder, saving values through the autosaver as they change.
///
/// Values answered before an interrupted prompt are still written.
async fn prompt_for_values(
    manager: &mut TemplateManager,
    template: &Template,
    mut values: InputValues,
    delay: Duration,
    mut ask: impl FnMut(&str, Option<&String>, bool) -> Result<String>,
) -> Result<InputValues> {
    let scan = templates::tokens::scan(&template.body);
    let saver = AutoSaver::spawn(manager.storage(), delay);

    let prompted: Result<()> = async {
        for key in &scan.variables {
            let answer = ask(key, values.variables.get(key), false)?;
            values.variables.insert(key.clone(), answer);
            manager.set_input_values(&template.id, values.clone());
            saver.schedule(manager.state().clone());
        }
        for key in &scan.blocks {
            let answer = ask(key, values.blocks.get(key), true)?;
            values.blocks.insert(key.clone(), answer);
            manager.set_input_values(&template.id, values.clone());
            saver.schedule(manager.state().clone());
        }
        Ok(())
    }
    .await;

    let flushed = saver.flush().await;
    saver.shutdown().await?;
    prompted?;
    flushed?;
    debug!("Saved input values for '{}'", template.id);
    Ok(values)
}

fn prompt_value(key: &str, current: Option<&String>, multiline: bool) -> Result<String> {
    if multiline {
        let seed = current.cloned().unwrap_or_default();
        let edited = Editor::new().edit(&seed)?;
        return Ok(edited.map(|s| s.trim_end_matches('\n').to_string()).unwrap_or(seed));
    }

    let mut input = Input::<String>::new().with_prompt(key).allow_empty(true);
    if let Some(current) = current {
        input = input.default(current.clone());
    }
    Ok(input.interact_text()?)
}
