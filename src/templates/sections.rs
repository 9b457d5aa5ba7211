//! `## ` heading sections of a template body

use serde::{Deserialize, Serialize};

const HEADING: &str = "## ";
const LEADING_TITLE: &str = "Overview";

/// One titled section of a template body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// Split a body at `## ` headings. Text before the first heading goes into an
/// "Overview" section.
pub fn split_sections(body: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for line in body.split('\n') {
        if let Some(title) = line.strip_prefix(HEADING) {
            sections.extend(current.take());
            current = Some(Section {
                title: title.trim().to_string(),
                content: String::new(),
            });
            continue;
        }

        let section = current.get_or_insert_with(|| Section {
            title: LEADING_TITLE.to_string(),
            content: String::new(),
        });
        if section.content.is_empty() {
            section.content = line.to_string();
        } else {
            section.content.push('\n');
            section.content.push_str(line);
        }
    }

    sections.extend(current);
    sections
}

/// Join sections back into a body, trimming each section's content
pub fn compose_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|section| {
            let body = section.content.trim();
            if body.is_empty() {
                format!("{HEADING}{}", section.title)
            } else {
                format!("{HEADING}{}\n{}", section.title, body)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
