//! Placeholder scanning for template bodies
//!
//! Recognizes `{{variable}}` and `{block}` tokens in one left-to-right pass.
//! Unbalanced braces are literal text, a double brace always wins over a single
//! brace at the same position, and the first `}` after an opening brace ends the
//! token.

/// A parsed unit of template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Variable(String),
    Block(String),
}

impl Token {
    /// Text shown for the token in an overview, e.g. `{{name}}`
    pub fn label(&self) -> String {
        match self {
            Token::Text(value) => value.clone(),
            Token::Variable(key) => format!("{{{{{key}}}}}"),
            Token::Block(key) => format!("{{{key}}}"),
        }
    }
}

/// Output of [`scan`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Every segment in source order
    pub parts: Vec<Token>,
    /// Distinct variable keys in first-seen order
    pub variables: Vec<String>,
    /// Distinct block keys in first-seen order
    pub blocks: Vec<String>,
}

/// Which token forms the scanner recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Syntax {
    /// Both `{{variable}}` and `{block}`
    Combined,
    /// Only `{{variable}}`; a lone `{` is literal
    VariablesOnly,
}

/// A borrowed segment of the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Variable { raw: &'a str, key: &'a str },
    Block { raw: &'a str, key: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InText,
    InVariable { open: usize },
    InBlock { open: usize },
}

/// Finite-state scanner yielding [`Segment`]s.
///
/// Works on bytes: `{` and `}` are ASCII, so every slice boundary the scanner
/// produces is also a char boundary.
pub(crate) struct Scanner<'a> {
    text: &'a str,
    syntax: Syntax,
    state: State,
    pos: usize,
    literal_start: usize,
    // `}` that ended the last rejected token; no `}` exists between a later
    // opening brace and this index.
    known_close: usize,
    pending: Option<Segment<'a>>,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(text: &'a str, syntax: Syntax) -> Self {
        Self {
            text,
            syntax,
            state: State::InText,
            pos: 0,
            literal_start: 0,
            known_close: 0,
            pending: None,
        }
    }

    fn open_at(&mut self, open: usize) {
        let double = self.text.as_bytes().get(open + 1) == Some(&b'{');
        let body_start = match (double, self.syntax) {
            (true, _) => {
                self.state = State::InVariable { open };
                open + 2
            }
            (false, Syntax::Combined) => {
                self.state = State::InBlock { open };
                open + 1
            }
            (false, Syntax::VariablesOnly) => {
                self.pos = open + 1;
                return;
            }
        };
        self.pos = body_start.max(self.known_close);
    }

    fn accept(&mut self, open: usize, end: usize, token: Segment<'a>) -> Segment<'a> {
        let literal = &self.text[self.literal_start..open];
        self.state = State::InText;
        self.pos = end;
        self.literal_start = end;
        if literal.is_empty() {
            token
        } else {
            self.pending = Some(token);
            Segment::Text(literal)
        }
    }

    // The opening brace becomes literal and scanning resumes right after it.
    fn reject(&mut self, open: usize, close: usize) {
        self.state = State::InText;
        self.known_close = close;
        self.pos = open + 1;
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }

        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            match self.state {
                State::InText => {
                    if bytes[self.pos] == b'{' {
                        self.open_at(self.pos);
                    } else {
                        self.pos += 1;
                    }
                }
                State::InVariable { open } => {
                    if bytes[self.pos] != b'}' {
                        self.pos += 1;
                        continue;
                    }
                    let close = self.pos;
                    if close > open + 2 && bytes.get(close + 1) == Some(&b'}') {
                        let raw = &self.text[open..close + 2];
                        let key = self.text[open + 2..close].trim();
                        return Some(self.accept(open, close + 2, Segment::Variable { raw, key }));
                    }
                    self.reject(open, close);
                }
                State::InBlock { open } => {
                    if bytes[self.pos] != b'}' {
                        self.pos += 1;
                        continue;
                    }
                    let close = self.pos;
                    if close > open + 1 {
                        let raw = &self.text[open..close + 1];
                        let key = self.text[open + 1..close].trim();
                        return Some(self.accept(open, close + 1, Segment::Block { raw, key }));
                    }
                    self.reject(open, close);
                }
            }
        }

        // Whatever is left, including an unterminated token, is literal.
        self.state = State::InText;
        if self.literal_start < bytes.len() {
            let rest = &self.text[self.literal_start..];
            self.literal_start = bytes.len();
            return Some(Segment::Text(rest));
        }
        None
    }
}

fn push_unique(keys: &mut Vec<String>, key: &str) {
    if !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
    }
}

/// Scan template text into ordered parts plus the distinct variable and block keys
pub fn scan(text: &str) -> ScanResult {
    let mut result = ScanResult::default();
    for segment in Scanner::new(text, Syntax::Combined) {
        match segment {
            Segment::Text(value) => result.parts.push(Token::Text(value.to_string())),
            Segment::Variable { key, .. } => {
                push_unique(&mut result.variables, key);
                result.parts.push(Token::Variable(key.to_string()));
            }
            Segment::Block { key, .. } => {
                push_unique(&mut result.blocks, key);
                result.parts.push(Token::Block(key.to_string()));
            }
        }
    }
    result
}

/// Distinct `{{variable}}` keys in first-seen order, ignoring block syntax
pub fn placeholders(text: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for segment in Scanner::new(text, Syntax::VariablesOnly) {
        if let Segment::Variable { key, .. } = segment {
            push_unique(&mut keys, key);
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Token {
        Token::Text(value.to_string())
    }

    fn var(key: &str) -> Token {
        Token::Variable(key.to_string())
    }

    fn block(key: &str) -> Token {
        Token::Block(key.to_string())
    }

    #[test]
    fn test_double_brace_takes_precedence() {
        let result = scan("{{x}} {x}");
        assert_eq!(result.parts, vec![var("x"), text(" "), block("x")]);
        assert_eq!(result.variables, vec!["x"]);
        assert_eq!(result.blocks, vec!["x"]);
    }

    #[test]
    fn test_empty_text_has_no_parts() {
        assert_eq!(scan(""), ScanResult::default());
    }

    #[test]
    fn test_keys_are_trimmed_and_deduplicated() {
        let result = scan("{{ name }} and {{name}} then { Task }{Task}");
        assert_eq!(
            result.parts,
            vec![
                var("name"),
                text(" and "),
                var("name"),
                text(" then "),
                block("Task"),
                block("Task"),
            ]
        );
        assert_eq!(result.variables, vec!["name"]);
        assert_eq!(result.blocks, vec!["Task"]);
    }

    #[test]
    fn test_first_seen_order() {
        let result = scan("{{b}} {{a}} {{b}} {z} {y}");
        assert_eq!(result.variables, vec!["b", "a"]);
        assert_eq!(result.blocks, vec!["z", "y"]);
    }

    #[test]
    fn test_unbalanced_braces_are_literal() {
        for input in ["{", "}", "{}", "{{}}", "{{", "a { b", "x }} y", "{{name"] {
            let result = scan(input);
            assert_eq!(result.parts, vec![text(input)], "input: {input:?}");
            assert!(result.variables.is_empty() && result.blocks.is_empty());
        }
    }

    #[test]
    fn test_failed_variable_falls_back_to_block() {
        // `{{x}` cannot close as a variable; the inner `{x}` is a block.
        assert_eq!(scan("{{x}").parts, vec![text("{"), block("x")]);
        assert_eq!(scan("{{a}b}}").parts, vec![text("{"), block("a"), text("b}}")]);
        assert_eq!(scan("{{x} }}").parts, vec![text("{"), block("x"), text(" }}")]);
    }

    #[test]
    fn test_first_closing_brace_terminates() {
        assert_eq!(scan("{a{b}c}").parts, vec![block("a{b"), text("c}")]);
        assert_eq!(scan("{{{a}}}").parts, vec![var("{a"), text("}")]);
    }

    #[test]
    fn test_multiline_and_unicode_text() {
        let result = scan("## Input\n{Diff}\n\nRésumé for {{Recipient}} \u{2014} done");
        assert_eq!(
            result.parts,
            vec![
                text("## Input\n"),
                block("Diff"),
                text("\n\nRésumé for "),
                var("Recipient"),
                text(" \u{2014} done"),
            ]
        );
    }

    #[test]
    fn test_block_key_may_span_lines() {
        assert_eq!(scan("{line one\nline two}").parts, vec![block("line one\nline two")]);
    }

    #[test]
    fn test_parts_reassemble_original_text() {
        let input = "Hi {{ name }}, {{x} see { Task } and {{}} {}";
        let rebuilt: String = Scanner::new(input, Syntax::Combined)
            .map(|segment| match segment {
                Segment::Text(value) => value,
                Segment::Variable { raw, .. } | Segment::Block { raw, .. } => raw,
            })
            .collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_long_run_of_open_braces() {
        let input = format!("{}x}}", "{".repeat(20_000));
        let result = scan(&input);
        assert_eq!(result.variables.len() + result.blocks.len(), 1);
    }

    #[test]
    fn test_placeholders_ignore_blocks() {
        assert_eq!(placeholders("{a} {{b}} {{ c }} {{b}}"), vec!["b", "c"]);
        assert_eq!(placeholders("{{x}"), Vec::<String>::new());
    }

    #[test]
    fn test_labels() {
        assert_eq!(var("name").label(), "{{name}}");
        assert_eq!(block("Task").label(), "{Task}");
        assert_eq!(text("plain").label(), "plain");
    }
}
