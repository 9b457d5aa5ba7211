//! Built-in prompt templates
//!
//! The default template set seeded into a fresh store.

use super::{AppState, Template};
use std::collections::BTreeMap;

/// Get all built-in templates
pub fn get_builtin_templates() -> Vec<Template> {
    vec![
        angular_commit_from_diff(),
        role_instruction_architect(),
        role_instruction_executor(),
        role_instruction_reviewer(),
        role_instruction_editor(),
        daily_standup(),
        email_reply(),
        meeting_recap(),
        task_planning(),
    ]
}

/// State used on first run and whenever the stored state is unusable
pub fn default_state() -> AppState {
    AppState {
        templates: get_builtin_templates(),
        active_template_id: None,
        template_input_values: BTreeMap::new(),
        theme: "light".to_string(),
        pinned_templates_by_host: BTreeMap::new(),
    }
}

/// Angular commit message from a pasted diff
fn angular_commit_from_diff() -> Template {
    Template::new(
        "angular-commit-from-diff",
        "Generate Angular Commit (from git diff)",
        "Generate a strict Angular-style git commit message using ONLY a pasted git diff. Use git diff | clip to copy the diff to clipboard.",
        "## Task
Generate a Git commit message that strictly follows the Angular commit conventions.

Rules you MUST follow:
- Format:
  <type>(<scope>): <subject>
  
  <body>
  
  <footer>
- Scope is optional.
- Subject:
  - imperative, present tense
  - no capital first letter
  - no trailing period
- Wrap all lines to max 100 characters.
- Body explains motivation and contrasts previous behavior.
- Footer includes BREAKING CHANGE and/or issue references if applicable.
- Only include BREAKING CHANGE if the diff truly introduces one.
- Infer type and scope from the diff; do not guess wildly.

Allowed types:
feat, fix, docs, style, refactor, perf, test, chore

## Input (git diff)
{Diff}

## Output
Return ONLY the final commit message text.
Do NOT explain your reasoning.
Do NOT include markdown or code fences.
Do NOT mention the diff explicitly in the output.",
    )
}

/// Architect role instruction
fn role_instruction_architect() -> Template {
    Template::new(
        "role-instruction-architect",
        "Role Instruction (Architect / Functionality Author)",
        "Direct a primary author to design and explain full, ordered batches.",
        "Role Instruction (Architect / Functionality Author)

You are the primary code author and functionality designer.
Your responsibility is to design and generate correct, high-quality code and explain what files must be updated and how.
If the total output is large, do not reduce quality or decide to give other code in next prompt. Instead, divide the output into clear batches,
each containing a list of complete files (never partial files). Always provide the recommended batch order (e.g. Batch 1, Batch 2, Batch 3) so the implementation agent can apply them sequentially without context overflow. Do not optimize for tool execution or minimal diffs\u{2014}optimize for clarity, correctness, and completeness.

{ Task }

",
    )
}

/// Executor role instruction
fn role_instruction_executor() -> Template {
    Template::new(
        "role-instruction-executor",
        "Role Instruction (Executor / Paster)",
        "Strictly apply provided batches without inventing new behavior.",
        "Role Instruction (Executor / Paster)

You are an implementation-only agent.
Your job is to apply code exactly as provided, file by file, in the specified batch order.
You are not allowed to invent functionality, refactor logic, or reinterpret intent.
You may only:

create or overwrite files exactly as given

fix obvious compiler errors (e.g. undefined types, missing imports) without changing runtime behavior
If anything is ambiguous or missing, stop and report it instead of guessing.
Your goal is faithful application, not design.

{ Task }

",
    )
}

/// Reviewer role instruction
fn role_instruction_reviewer() -> Template {
    Template::new(
        "role-instruction-reviewer",
        "Role Instruction (Reviewer / QA)",
        "Guide a reviewer to validate outputs for correctness and gaps.",
        "Role Instruction (Reviewer / QA)

You are responsible for reviewing the work before it ships.
You must validate correctness, completeness, and potential risks.
Provide clear feedback grouped by severity and include steps to reproduce any issues.
If something is ambiguous, call it out explicitly and request clarification.

{ Task }

",
    )
}

/// Editor role instruction
fn role_instruction_editor() -> Template {
    Template::new(
        "role-instruction-editor",
        "Role Instruction (Editor / Clarity)",
        "Focus on rewriting for clarity, tone, and user friendliness.",
        "Role Instruction (Editor / Clarity)

You improve wording for clarity, brevity, and tone without changing meaning.
You may reorder sections for flow, but keep the intent and required constraints intact.
Return the rewritten content plus a brief list of notable changes.

{ Task }

",
    )
}

/// Daily standup template
fn daily_standup() -> Template {
    Template::new(
        "daily-standup",
        "Daily Standup Update",
        "Share progress, next steps, and blockers in a tight format.",
        "## Yesterday\n{Yesterday}\n\n## Today\n{Today}\n\n## Blockers\n{Blockers}\n\n## Help Needed\n{HelpNeeded}",
    )
}

/// Email reply template
fn email_reply() -> Template {
    Template::new(
        "email-reply",
        "Email Reply",
        "Draft a clear, friendly response with action items.",
        "## Context\n{Context}\n\n## Recipient\n{{Recipient}}\n\n## Goal\n{Goal}\n\n## Key Points\n{KeyPoints}\n\n## Tone\n{{Tone}}\n\n## Draft Reply\n{Draft}",
    )
}

/// Meeting recap template
fn meeting_recap() -> Template {
    Template::new(
        "meeting-recap",
        "Meeting Recap",
        "Summarize decisions and action items for follow-up.",
        "## Summary\n{Summary}\n\n## Decisions\n{Decisions}\n\n## Action Items\n{Actions}\n\n## Open Questions\n{Questions}",
    )
}

/// Task planning template
fn task_planning() -> Template {
    Template::new(
        "task-planning",
        "Task Planning",
        "Break down a task with steps, owners, and deadlines.",
        "## Objective\n{Objective}\n\n## Steps\n{Steps}\n\n## Owners\n{Owners}\n\n## Due Dates\n{DueDates}\n\n## Risks\n{Risks}",
    )
}
