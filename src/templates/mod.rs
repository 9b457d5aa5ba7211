//! Prompt template management module
//!
//! Provides the template data model, the persisted application state and the
//! manager that applies CRUD operations to it.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

pub mod autosave;
pub mod builtin;
pub mod render;
pub mod sections;
pub mod share;
pub mod storage;
pub mod tokens;
pub mod validate;

pub use autosave::AutoSaver;
pub use builtin::default_state;
pub use storage::{StateStore, TemplateStorage};

/// Body used by the "new template" action
pub const NEW_TEMPLATE_BODY: &str = "Hi {{name}},\n\nThanks for reaching out about {{topic}}.";

const ID_BASE: &str = "template";

/// A reusable prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier, never changed after assignment
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Raw template text containing placeholder tokens
    #[serde(rename = "template")]
    pub body: String,
    /// Declared input fields (legacy schema)
    #[serde(default)]
    pub fields: Vec<TemplateField>,
}

impl Template {
    /// Create a new template without declared fields
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            body: body.into(),
            fields: Vec::new(),
        }
    }

    /// Check if template matches search query
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.body.to_lowercase().contains(&query)
    }

    /// Name shown in listings; falls back to the id for unnamed templates
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// A declared input descriptor attached to a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(rename = "default")]
    pub default_value: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Input widget kind for a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "select" => Ok(FieldType::Select),
            other => Err(anyhow!("Unknown field type '{}'", other)),
        }
    }
}

/// Saved form values for one template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValues {
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub blocks: BTreeMap<String, String>,
}

/// Persisted application state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub templates: Vec<Template>,
    #[serde(default)]
    pub active_template_id: Option<String>,
    #[serde(default)]
    pub template_input_values: BTreeMap<String, InputValues>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub pinned_templates_by_host: BTreeMap<String, String>,
}

fn default_theme() -> String {
    "light".to_string()
}

/// Partial update applied by [`AppState::update_template`]
#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

impl AppState {
    /// Get a template by id
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Ids of every stored template
    pub fn ids(&self) -> HashSet<String> {
        self.templates.iter().map(|t| t.id.clone()).collect()
    }

    /// The active template, or the first template when the saved id is stale
    pub fn active(&self) -> Option<&Template> {
        self.active_template_id
            .as_deref()
            .and_then(|id| self.get(id))
            .or_else(|| self.templates.first())
    }

    /// Select a template. Returns false when the id is unknown.
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active_template_id = Some(id.to_string());
        true
    }

    /// Append a template with a freshly assigned id and select it
    pub fn add_template(&mut self, name: String, description: String, body: String) -> &Template {
        let id = next_template_id(&self.ids());
        self.active_template_id = Some(id.clone());
        self.templates.push(Template::new(id, name, description, body));
        &self.templates[self.templates.len() - 1]
    }

    /// Apply a patch to an existing template; the id is never changed
    pub fn update_template(&mut self, id: &str, patch: TemplatePatch) -> Option<&Template> {
        let template = self.templates.iter_mut().find(|t| t.id == id)?;
        if let Some(name) = patch.name {
            template.name = name;
        }
        if let Some(description) = patch.description {
            template.description = description;
        }
        if let Some(body) = patch.body {
            template.body = body;
        }
        Some(template)
    }

    /// Remove a template together with every reference to it
    pub fn delete_template(&mut self, id: &str) -> Option<Template> {
        let pos = self.templates.iter().position(|t| t.id == id)?;
        let removed = self.templates.remove(pos);

        self.template_input_values.remove(id);
        self.pinned_templates_by_host.retain(|_, pinned| pinned.as_str() != id);
        if self.active_template_id.as_deref() == Some(id) {
            self.active_template_id = self.templates.first().map(|t| t.id.clone());
        }

        Some(removed)
    }

    /// Append imported templates, reassigning colliding ids. Returns the final ids.
    pub fn import_templates(&mut self, templates: Vec<Template>) -> Vec<String> {
        let mut existing = self.ids();
        let mut imported = Vec::with_capacity(templates.len());

        for mut template in templates {
            if existing.contains(&template.id) {
                let id = next_template_id(&existing);
                debug!("Reassigning imported template '{}' to '{}'", template.id, id);
                template.id = id;
            }
            existing.insert(template.id.clone());
            imported.push(template.id.clone());
            self.templates.push(template);
        }

        if let Some(first) = imported.first() {
            self.active_template_id = Some(first.clone());
        }
        imported
    }

    /// Templates to export; an empty id list selects every template
    pub fn export_templates(&self, ids: &[String]) -> Vec<Template> {
        if ids.is_empty() {
            return self.templates.clone();
        }
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.templates
            .iter()
            .filter(|t| wanted.contains(t.id.as_str()))
            .cloned()
            .collect()
    }

    /// Saved form values for a template (empty when none were saved)
    pub fn input_values(&self, id: &str) -> InputValues {
        self.template_input_values.get(id).cloned().unwrap_or_default()
    }

    /// Switch between the light and dark theme
    pub fn toggle_theme(&mut self) -> &str {
        self.theme = if self.theme == "dark" { "light" } else { "dark" }.to_string();
        &self.theme
    }
}

/// Generate `template-{n}` with `n` starting at `existing.len() + 1`, skipping taken ids
pub fn next_template_id(existing: &HashSet<String>) -> String {
    let mut index = existing.len() + 1;
    loop {
        let candidate = format!("{ID_BASE}-{index}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

/// Length as counted by the share-link and import limits (UTF-16 code units)
pub(crate) fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Template manager for handling all template operations
pub struct TemplateManager {
    storage: Arc<TemplateStorage>,
    state: AppState,
}

impl TemplateManager {
    /// Create a new template manager over an opened store
    pub async fn new(storage: Arc<TemplateStorage>) -> Result<Self> {
        let state = storage.load().await?;
        debug!("Loaded {} templates", state.templates.len());
        Ok(Self { storage, state })
    }

    /// Current in-memory state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Shared handle to the backing store
    pub fn storage(&self) -> Arc<TemplateStorage> {
        Arc::clone(&self.storage)
    }

    /// Path of the backing data file
    pub fn data_path(&self) -> &Path {
        self.storage.data_file()
    }

    async fn persist(&self) -> Result<()> {
        self.storage.save(&self.state).await
    }

    /// Get all templates in store order
    pub fn list_all(&self) -> Vec<&Template> {
        self.state.templates.iter().collect()
    }

    /// Search templates by query
    pub fn search(&self, query: &str) -> Vec<&Template> {
        self.state
            .templates
            .iter()
            .filter(|t| t.matches_search(query))
            .collect()
    }

    /// Get a template by id
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.state.get(id)
    }

    /// The active template, if any
    pub fn active(&self) -> Option<&Template> {
        self.state.active()
    }

    /// Create a new template and make it active
    pub async fn create(&mut self, name: String, description: String, body: String) -> Result<Template> {
        let template = self.state.add_template(name, description, body).clone();
        self.persist().await?;
        info!("Created template '{}'", template.id);
        Ok(template)
    }

    /// Create the starter template offered by the "new" action
    pub async fn create_starter(&mut self) -> Result<Template> {
        self.create(
            "New template".to_string(),
            String::new(),
            NEW_TEMPLATE_BODY.to_string(),
        )
        .await
    }

    /// Update an existing template. Returns `None` for an unknown id.
    pub async fn update(&mut self, id: &str, patch: TemplatePatch) -> Result<Option<Template>> {
        let Some(updated) = self.state.update_template(id, patch).cloned() else {
            return Ok(None);
        };
        self.persist().await?;
        info!("Updated template '{}'", id);
        Ok(Some(updated))
    }

    /// Delete a template. Returns `None` for an unknown id.
    pub async fn delete(&mut self, id: &str) -> Result<Option<Template>> {
        let Some(removed) = self.state.delete_template(id) else {
            return Ok(None);
        };
        self.persist().await?;
        info!(
            "Deleted template '{}', active is now {:?}",
            id, self.state.active_template_id
        );
        Ok(Some(removed))
    }

    /// Make a template active
    pub async fn set_active(&mut self, id: &str) -> Result<()> {
        if !self.state.set_active(id) {
            return Err(anyhow!("Template '{}' not found", id));
        }
        self.persist().await
    }

    /// Merge validated templates into the store
    pub async fn import(&mut self, templates: Vec<Template>) -> Result<Vec<String>> {
        let ids = self.state.import_templates(templates);
        self.persist().await?;
        info!("Imported {} template(s)", ids.len());
        Ok(ids)
    }

    /// Templates selected for export
    pub fn export(&self, ids: &[String]) -> Vec<Template> {
        self.state.export_templates(ids)
    }

    /// Saved form values for a template
    pub fn input_values(&self, id: &str) -> InputValues {
        self.state.input_values(id)
    }

    /// Record form values in memory; persistence is left to the caller
    pub fn set_input_values(&mut self, id: &str, values: InputValues) {
        self.state.template_input_values.insert(id.to_string(), values);
    }

    /// Set the theme explicitly
    pub async fn set_theme(&mut self, theme: &str) -> Result<()> {
        match theme {
            "light" | "dark" => {
                self.state.theme = theme.to_string();
                self.persist().await
            }
            other => Err(anyhow!("Unknown theme '{}', expected 'light' or 'dark'", other)),
        }
    }

    /// Toggle between light and dark
    pub async fn toggle_theme(&mut self) -> Result<String> {
        let theme = self.state.toggle_theme().to_string();
        self.persist().await?;
        Ok(theme)
    }

    /// Pin a template to a host key
    pub async fn pin(&mut self, host: &str, id: &str) -> Result<()> {
        if self.state.get(id).is_none() {
            return Err(anyhow!("Template '{}' not found", id));
        }
        self.state
            .pinned_templates_by_host
            .insert(host.to_string(), id.to_string());
        self.persist().await
    }

    /// Remove a host pin. Returns the previously pinned id.
    pub async fn unpin(&mut self, host: &str) -> Result<Option<String>> {
        let removed = self.state.pinned_templates_by_host.remove(host);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Template pinned to a host, if it still exists
    pub fn pinned_for(&self, host: &str) -> Option<&Template> {
        self.state
            .pinned_templates_by_host
            .get(host)
            .and_then(|id| self.state.get(id))
    }

    /// Render a template with the given values
    pub fn render(&self, id: &str, values: &InputValues) -> Option<String> {
        self.state.get(id).map(|t| render::render(&t.body, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn state_with(ids: &[&str]) -> AppState {
        AppState {
            templates: ids
                .iter()
                .map(|id| Template::new(*id, format!("Name {id}"), "", "Body {{x}}"))
                .collect(),
            active_template_id: ids.first().map(|id| id.to_string()),
            template_input_values: BTreeMap::new(),
            theme: default_theme(),
            pinned_templates_by_host: BTreeMap::new(),
        }
    }

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_next_template_id_starts_after_count() {
        assert_eq!(next_template_id(&HashSet::new()), "template-1");
        assert_eq!(next_template_id(&ids(&["a", "b"])), "template-3");
        assert_eq!(
            next_template_id(&ids(&["a", "template-2", "template-3"])),
            "template-4"
        );
    }

    #[test]
    fn test_import_reassigns_colliding_ids() {
        let mut state = state_with(&["email-reply", "template-3"]);
        let original = state.get("email-reply").cloned().unwrap();

        let imported = state.import_templates(vec![
            Template::new("email-reply", "Imported", "", "{{a}}"),
            Template::new("fresh", "Fresh", "", "{{b}}"),
            Template::new("email-reply", "Again", "", "{{c}}"),
        ]);

        // template-3 is already taken, so the first collision skips to template-4
        assert_eq!(imported, vec!["template-4", "fresh", "template-5"]);
        assert_eq!(state.get("email-reply"), Some(&original));
        assert_eq!(state.templates.len(), 5);
        assert_eq!(state.active_template_id.as_deref(), Some("template-4"));
    }

    #[test]
    fn test_delete_active_selects_next_and_prunes_values() {
        let mut state = state_with(&["a", "b"]);
        state
            .template_input_values
            .insert("a".to_string(), InputValues::default());
        state
            .pinned_templates_by_host
            .insert("example.com".to_string(), "a".to_string());

        let removed = state.delete_template("a");

        assert_eq!(removed.map(|t| t.id), Some("a".to_string()));
        assert_eq!(state.active_template_id.as_deref(), Some("b"));
        assert!(!state.template_input_values.contains_key("a"));
        assert!(state.pinned_templates_by_host.is_empty());
    }

    #[test]
    fn test_delete_last_template_clears_active() {
        let mut state = state_with(&["only"]);
        state.delete_template("only");
        assert!(state.templates.is_empty());
        assert_eq!(state.active_template_id, None);
        assert!(state.active().is_none());
    }

    #[test]
    fn test_delete_unknown_is_none() {
        let mut state = state_with(&["a"]);
        assert!(state.delete_template("missing").is_none());
        assert_eq!(state.templates.len(), 1);
    }

    #[test]
    fn test_delete_inactive_keeps_selection() {
        let mut state = state_with(&["a", "b", "c"]);
        state.set_active("c");
        state.delete_template("b");
        assert_eq!(state.active_template_id.as_deref(), Some("c"));
    }

    #[test]
    fn test_update_never_changes_id() {
        let mut state = state_with(&["a"]);
        let updated = state
            .update_template(
                "a",
                TemplatePatch {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .cloned()
            .unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.body, "Body {{x}}");
        assert!(state.update_template("zzz", TemplatePatch::default()).is_none());
    }

    #[test]
    fn test_export_empty_selects_all() {
        let state = state_with(&["a", "b", "c"]);
        assert_eq!(state.export_templates(&[]).len(), 3);
        let picked = state.export_templates(&["c".to_string(), "a".to_string()]);
        let picked: Vec<_> = picked.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(picked, vec!["a", "c"]);
    }

    #[test]
    fn test_active_falls_back_to_first() {
        let mut state = state_with(&["a", "b"]);
        state.active_template_id = Some("gone".to_string());
        assert_eq!(state.active().map(|t| t.id.as_str()), Some("a"));
        assert!(!state.set_active("gone"));
    }

    #[test]
    fn test_toggle_theme() {
        let mut state = state_with(&[]);
        assert_eq!(state.toggle_theme(), "dark");
        assert_eq!(state.toggle_theme(), "light");
    }

    #[test]
    fn test_state_wire_names() {
        let state = state_with(&["a"]);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("activeTemplateId").is_some());
        assert!(json.get("templateInputValues").is_some());
        assert!(json.get("pinnedTemplatesByHost").is_some());
        assert_eq!(json["templates"][0]["template"], "Body {{x}}");
    }

    #[test]
    fn test_field_wire_names() {
        let field: TemplateField = serde_json::from_str(
            r#"{"key":"tone","label":"Tone","type":"select","default":"","options":["warm"]}"#,
        )
        .unwrap();
        assert_eq!(field.kind, FieldType::Select);
        assert_eq!(field.default_value, "");
        assert!("dropdown".parse::<FieldType>().is_err());
    }

    #[tokio::test]
    async fn test_manager_persists_crud() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(TemplateStorage::new(dir.path()).await.unwrap());
        let mut manager = TemplateManager::new(Arc::clone(&storage)).await.unwrap();
        let defaults = manager.list_all().len();

        let created = manager.create_starter().await.unwrap();
        assert_eq!(created.id, format!("template-{}", defaults + 1));
        assert_eq!(created.body, NEW_TEMPLATE_BODY);

        assert_ok!(manager.pin("example.com", &created.id).await);
        assert!(manager.pin("example.com", "missing").await.is_err());

        let reopened = TemplateManager::new(Arc::clone(&storage)).await.unwrap();
        assert_eq!(reopened.active().map(|t| t.id.clone()), Some(created.id.clone()));
        assert_eq!(
            reopened.pinned_for("example.com").map(|t| t.id.clone()),
            Some(created.id.clone())
        );

        assert!(manager.delete(&created.id).await.unwrap().is_some());
        assert!(manager.delete(&created.id).await.unwrap().is_none());
        assert!(manager.pinned_for("example.com").is_none());
    }

    #[tokio::test]
    async fn test_manager_render_uses_saved_values() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(TemplateStorage::new(dir.path()).await.unwrap());
        let mut manager = TemplateManager::new(storage).await.unwrap();
        let template = manager
            .create("Greeting".into(), String::new(), "{greeting}, {{name}}".into())
            .await
            .unwrap();

        let mut values = InputValues::default();
        values.blocks.insert("greeting".into(), "Hi".into());
        values.variables.insert("name".into(), "Ada".into());
        manager.set_input_values(&template.id, values.clone());

        assert_eq!(manager.input_values(&template.id), values);
        assert_eq!(manager.render(&template.id, &values).as_deref(), Some("Hi, Ada"));
        assert!(manager.render("missing", &values).is_none());
    }

    #[tokio::test]
    async fn test_manager_rejects_unknown_theme() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(TemplateStorage::new(dir.path()).await.unwrap());
        let mut manager = TemplateManager::new(storage).await.unwrap();
        assert!(manager.set_theme("solarized").await.is_err());
        assert_ok!(manager.set_theme("dark").await);
        assert_eq!(manager.toggle_theme().await.unwrap(), "light");
    }
}
