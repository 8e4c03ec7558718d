//! JSON Repair Strategies
//!
//! Pure text-to-text transforms applied to completion output before parsing.
//! Each strategy returns `None` when it does not apply to the input.
//!
//! Handles common completion output issues:
//! - Extra data after a complete document (chatter, a second document)
//! - Markdown code fences, comment lines, BOM, surrounding prose
//! - Trailing commas
//! - Output cut off before the final closers
//!
//! Balancing never closes a dangling string and never invents a value: the
//! unfinished element is dropped and only closers are appended.

use serde_json::Value;

// =============================================================================
// Lexing
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// Outside any string literal
    Structural,
    StringStart,
    InString,
    StringEnd,
}

/// String/escape-aware character walk
struct Lexer<'a> {
    chars: std::str::CharIndices<'a>,
    in_string: bool,
    escape: bool,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            in_string: false,
            escape: false,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = (usize, char, Token);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, c) = self.chars.next()?;

        if self.in_string {
            if self.escape {
                self.escape = false;
            } else if c == '\\' {
                self.escape = true;
            } else if c == '"' {
                self.in_string = false;
                return Some((i, c, Token::StringEnd));
            }
            return Some((i, c, Token::InString));
        }

        if c == '"' {
            self.in_string = true;
            return Some((i, c, Token::StringStart));
        }
        Some((i, c, Token::Structural))
    }
}

fn closer_for(opener: char) -> char {
    if opener == '{' { '}' } else { ']' }
}

// =============================================================================
// Strategies
// =============================================================================

/// Parse the text as-is
pub fn direct(raw: &str) -> Option<String> {
    Some(raw.to_string())
}

/// Keep only the first complete JSON document when extra data follows it.
pub fn truncate_trailing(raw: &str) -> Option<String> {
    let text = raw.trim_start();
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();

    match stream.next() {
        Some(Ok(_)) => {
            let end = stream.byte_offset();
            if text[end..].trim().is_empty() {
                None
            } else {
                Some(text[..end].to_string())
            }
        }
        _ => None,
    }
}

/// Number of complete JSON documents at the start of `rest`
pub fn count_documents(rest: &str) -> usize {
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .take_while(|v| v.is_ok())
        .count()
}

/// Remove fences, comment lines, BOM, surrounding prose and trailing commas.
pub fn strip_decoration(raw: &str) -> Option<String> {
    let cleaned = drop_decoration_lines(raw.trim_start_matches('\u{feff}'));
    let document = slice_document(&cleaned)?;
    let result = remove_trailing_commas(document).trim().to_string();

    if result == raw.trim() {
        None
    } else {
        Some(result)
    }
}

/// First balancing candidate; see [`balance_candidates`]
pub fn balance_delimiters(raw: &str) -> Option<String> {
    balance_candidates(raw).into_iter().next()
}

/// Candidates for output that ends with containers still open.
///
/// The first candidate drops only the unfinished element of the innermost
/// open container; each following candidate also drops the next enclosing
/// unfinished container. Returns an empty list when nothing is left open.
pub fn balance_candidates(raw: &str) -> Vec<String> {
    let cleaned = drop_decoration_lines(raw.trim_start_matches('\u{feff}'));
    let Some(start) = cleaned.find(['{', '[']) else {
        return Vec::new();
    };

    let text = remove_trailing_commas(&cleaned[start..]);
    let frames = open_frames(&text);

    let mut candidates: Vec<String> = Vec::new();
    for depth in (0..frames.len()).rev() {
        let mut candidate = text[..frames[depth].cut].trim_end().to_string();
        if candidate.ends_with(',') {
            candidate.pop();
        }
        for frame in frames[..=depth].iter().rev() {
            candidate.push(closer_for(frame.opener));
        }
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Leniently parse a JSON value: direct, stripped, then balanced
pub fn parse_lenient(raw: &str) -> Option<Value> {
    let parse = |text: &str| serde_json::from_str::<Value>(text).ok();

    parse(raw)
        .or_else(|| truncate_trailing(raw).as_deref().and_then(parse))
        .or_else(|| strip_decoration(raw).as_deref().and_then(parse))
        .or_else(|| balance_candidates(raw).iter().find_map(|c| parse(c)))
}

// =============================================================================
// Helpers
// =============================================================================

/// Drop code-fence, `//` and `#` lines that start outside a string literal
fn drop_decoration_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if !in_string
            && (trimmed.starts_with("```") || trimmed.starts_with("//") || trimmed.starts_with('#'))
        {
            continue;
        }
        in_string = ends_in_string(line, in_string);
        out.push_str(line);
    }

    out
}

fn ends_in_string(line: &str, mut in_string: bool) -> bool {
    let mut escape = false;
    for c in line.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }
    }
    in_string
}

/// From the first opener to its matching closer, or to the last closer seen
/// when the document never balances.
fn slice_document(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let body = &text[start..];

    let mut depth: usize = 0;
    let mut last_closer = None;

    for (i, c, token) in Lexer::new(body) {
        if token != Token::Structural {
            continue;
        }
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                last_closer = Some(i + 1);
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&body[..i + 1]);
                }
            }
            _ => {}
        }
    }

    Some(match last_closer {
        Some(end) => &body[..end],
        None => body,
    })
}

/// Remove commas directly followed (ignoring whitespace) by `}` or `]`
fn remove_trailing_commas(text: &str) -> String {
    let tokens: Vec<(usize, char, Token)> = Lexer::new(text).collect();
    let mut out = String::with_capacity(text.len());

    for (idx, &(_, c, token)) in tokens.iter().enumerate() {
        if token == Token::Structural && c == ',' {
            let next = tokens[idx + 1..]
                .iter()
                .find(|(_, ch, _)| !ch.is_whitespace())
                .map(|&(_, ch, t)| (ch, t));
            if matches!(next, Some(('}' | ']', Token::Structural))) {
                continue;
            }
        }
        out.push(c);
    }

    out
}

/// Open container at end of input
#[derive(Debug)]
struct Frame {
    opener: char,
    /// Byte offset just past the last complete element (or the opener)
    cut: usize,
    /// Object frames: a `:` was seen for the current member
    expect_value: bool,
}

impl Frame {
    fn holds_value_next(&self) -> bool {
        self.opener == '[' || self.expect_value
    }
}

/// Containers still open when the text ends, outermost first.
/// Empty when the first document closes.
fn open_frames(text: &str) -> Vec<Frame> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut scalar_start: Option<usize> = None;
    let mut string_is_value = false;

    for (i, c, token) in Lexer::new(text) {
        match token {
            Token::StringStart => {
                string_is_value = stack.last().is_some_and(Frame::holds_value_next);
            }
            Token::InString => {}
            Token::StringEnd => {
                if string_is_value && let Some(frame) = stack.last_mut() {
                    frame.cut = i + 1;
                }
            }
            Token::Structural => {
                if scalar_start.is_some() {
                    if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.') {
                        continue;
                    }
                    scalar_start = None;
                    if let Some(frame) = stack.last_mut() {
                        frame.cut = i;
                    }
                }

                match c {
                    '{' | '[' => stack.push(Frame {
                        opener: c,
                        cut: i + 1,
                        expect_value: false,
                    }),
                    '}' | ']' => match stack.pop() {
                        Some(frame) if closer_for(frame.opener) == c => match stack.last_mut() {
                            Some(parent) => parent.cut = i + 1,
                            None => return Vec::new(),
                        },
                        // Mismatched closer: treat as end of input
                        Some(frame) => {
                            stack.push(frame);
                            break;
                        }
                        None => break,
                    },
                    ':' => {
                        if let Some(frame) = stack.last_mut() {
                            frame.expect_value = true;
                        }
                    }
                    ',' => {
                        if let Some(frame) = stack.last_mut() {
                            frame.expect_value = false;
                        }
                    }
                    c if c.is_whitespace() => {}
                    _ => {
                        if stack.last().is_some_and(Frame::holds_value_next) {
                            scalar_start = Some(i);
                        }
                    }
                }
            }
        }
    }

    // A bare literal running to end of input is complete; a number may be cut short
    if let Some(start) = scalar_start
        && matches!(text[start..].trim_end(), "true" | "false" | "null")
        && let Some(frame) = stack.last_mut()
    {
        frame.cut = text.trim_end().len();
    }

    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parses(text: &str) -> bool {
        serde_json::from_str::<Value>(text).is_ok()
    }

    #[test]
    fn test_truncate_trailing_garbage() {
        let out = truncate_trailing(r#"{"a": 1} garbage"#).unwrap();
        assert_eq!(out, r#"{"a": 1}"#);
    }

    #[test]
    fn test_truncate_trailing_second_document() {
        let raw = r#"{"a": 1}{"b": 2} [3]"#;
        let out = truncate_trailing(raw).unwrap();
        assert_eq!(out, r#"{"a": 1}"#);
        assert_eq!(count_documents(&raw[out.len()..]), 2);
    }

    #[test]
    fn test_truncate_trailing_not_applicable() {
        assert!(truncate_trailing(r#"{"a": 1}   "#).is_none());
        assert!(truncate_trailing("not json").is_none());
    }

    #[test]
    fn test_strip_code_fences_and_prose() {
        let raw = "Here is your pathway:\n```json\n{\"a\": [1, 2,]}\n```\nLet me know!";
        let out = strip_decoration(raw).unwrap();
        assert_eq!(out, r#"{"a": [1, 2]}"#);
    }

    #[test]
    fn test_strip_comment_lines_outside_strings() {
        let raw = "{\n// generated\n\"a\": \"# not a comment\",\n# note\n\"b\": 2\n}";
        let out = strip_decoration(raw).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["a"], "# not a comment");
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn test_strip_bom() {
        let out = strip_decoration("\u{feff}{\"a\": 1}").unwrap();
        assert!(parses(&out));
    }

    #[test]
    fn test_strip_keeps_commas_inside_strings() {
        let out = remove_trailing_commas(r#"{"a": "x, }", "b": [1,],}"#);
        assert_eq!(out, r#"{"a": "x, }", "b": [1]}"#);
    }

    #[test]
    fn test_strip_not_applicable() {
        assert!(strip_decoration(r#"{"a": 1}"#).is_none());
        assert!(strip_decoration("no json here").is_none());
    }

    #[test]
    fn test_balance_missing_closers() {
        let out = balance_delimiters(r#"{"a": [1, 2], "b": {"c": "d""#).unwrap();
        assert_eq!(out, r#"{"a": [1, 2], "b": {"c": "d"}}"#);
    }

    #[test]
    fn test_balance_drops_dangling_string() {
        let out = balance_delimiters(r#"{"a": "done", "b": "half"#).unwrap();
        assert_eq!(out, r#"{"a": "done"}"#);
    }

    #[test]
    fn test_balance_drops_dangling_key_and_number() {
        assert_eq!(
            balance_delimiters(r#"{"a": 1, "b""#).unwrap(),
            r#"{"a": 1}"#
        );
        assert_eq!(balance_delimiters(r#"[1, 2, 3"#).unwrap(), "[1, 2]");
        assert_eq!(balance_delimiters(r#"[1, true"#).unwrap(), "[1, true]");
    }

    #[test]
    fn test_balance_candidates_drop_outer_partial_elements() {
        let raw = r#"{"s": [{"title": "M1", "content": "C1"}, {"title": "M2", "content": "C"#;
        let candidates = balance_candidates(raw);

        assert_eq!(candidates[0], r#"{"s": [{"title": "M1", "content": "C1"}, {"title": "M2"}]}"#);
        assert_eq!(candidates[1], r#"{"s": [{"title": "M1", "content": "C1"}]}"#);
        assert!(candidates.iter().all(|c| parses(c)));
    }

    #[test]
    fn test_balance_not_applicable_when_closed() {
        assert!(balance_candidates(r#"{"a": 1}"#).is_empty());
        assert!(balance_candidates("plain prose").is_empty());
    }

    #[test]
    fn test_parse_lenient_array() {
        let value = parse_lenient("```json\n[{\"front\": \"a\", \"back\": \"b\"},\n{\"front\": \"c\"").unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["back"], "b");
        assert!(items[1].get("back").is_none());
    }
}
