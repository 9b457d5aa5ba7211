//! Placeholder substitution

use super::tokens::{Scanner, Segment, Syntax};
use super::InputValues;
use std::collections::BTreeMap;

/// Replace `{{key}}` occurrences whose key is in `values`; others stay verbatim
pub fn render_variables(text: &str, values: &BTreeMap<String, String>) -> String {
    let mut output = String::with_capacity(text.len());
    for segment in Scanner::new(text, Syntax::VariablesOnly) {
        match segment {
            Segment::Text(value) => output.push_str(value),
            Segment::Variable { raw, key } => output.push_str(lookup(values, key, raw)),
            Segment::Block { raw, .. } => output.push_str(raw),
        }
    }
    output
}

/// Replace `{key}` occurrences whose key is in `values`; others stay verbatim.
///
/// Double-brace variables are never touched, so a block and a variable sharing
/// a key do not interfere.
pub fn render_blocks(text: &str, values: &BTreeMap<String, String>) -> String {
    let mut output = String::with_capacity(text.len());
    for segment in Scanner::new(text, Syntax::Combined) {
        match segment {
            Segment::Text(value) => output.push_str(value),
            Segment::Block { raw, key } => output.push_str(lookup(values, key, raw)),
            Segment::Variable { raw, .. } => output.push_str(raw),
        }
    }
    output
}

/// Final text for a template body: blocks first, then variables.
///
/// Block content may itself contain `{{variable}}` markers meant for the
/// variable pass.
pub fn render(body: &str, values: &InputValues) -> String {
    render_variables(&render_blocks(body, &values.blocks), &values.variables)
}

fn lookup<'a>(values: &'a BTreeMap<String, String>, key: &str, raw: &'a str) -> &'a str {
    values.get(key).map(String::as_str).unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_text_round_trips() {
        let text = "No placeholders here.\nJust prose, commas; and symbols #@!";
        let empty = BTreeMap::new();
        assert_eq!(render_variables(&render_blocks(text, &empty), &empty), text);
    }

    #[test]
    fn test_unknown_variable_passes_through() {
        assert_eq!(render_variables("Hi {{name}}", &BTreeMap::new()), "Hi {{name}}");
    }

    #[test]
    fn test_variables_substitute_trimmed_keys() {
        let values = map(&[("name", "Ada"), ("topic", "engines")]);
        assert_eq!(
            render_variables("Hi {{ name }}, about {{topic}} and {{other}}.", &values),
            "Hi Ada, about engines and {{other}}."
        );
    }

    #[test]
    fn test_variable_pass_leaves_blocks() {
        let values = map(&[("x", "X")]);
        assert_eq!(render_variables("{x} {{x}}", &values), "{x} X");
    }

    #[test]
    fn test_block_pass_leaves_variables() {
        let values = map(&[("x", "BLOCK")]);
        assert_eq!(render_blocks("{x} {{x}}", &values), "BLOCK {{x}}");
    }

    #[test]
    fn test_blocks_render_before_variables() {
        let values = InputValues {
            variables: map(&[("name", "Ada")]),
            blocks: map(&[("greeting", "Hi")]),
        };
        assert_eq!(render("{greeting}, {{name}}", &values), "Hi, Ada");
    }

    #[test]
    fn test_block_content_feeds_variable_pass() {
        let values = InputValues {
            variables: map(&[("Recipient", "Grace")]),
            blocks: map(&[("Draft", "Dear {{Recipient}},\nThanks!")]),
        };
        assert_eq!(render("{Draft}", &values), "Dear Grace,\nThanks!");
    }

    #[test]
    fn test_empty_value_erases_token() {
        let values = InputValues {
            variables: BTreeMap::new(),
            blocks: map(&[("Blockers", "")]),
        };
        assert_eq!(render("## Blockers\n{Blockers}", &values), "## Blockers\n");
    }

    #[test]
    fn test_values_are_not_rescanned_in_same_pass() {
        let values = map(&[("a", "{{b}}"), ("b", "nope")]);
        assert_eq!(render_variables("{{a}}", &values), "{{b}}");
    }
}
