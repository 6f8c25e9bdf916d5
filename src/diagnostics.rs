//! Runtime diagnostics.
//!
//! - [`RuntimeError`]: the payload of the first-class error value; message,
//!   position, optional hint, call-stack snapshot and source snippet.
//! - [`CallStack`] / [`CallFrame`]: live frames of user function calls with
//!   the depth limit checked on `push`.
//! - [`edit_distance`] / [`rank_similar`]: "did you mean" suggestions.

use std::fmt;

use log::debug;

use crate::token::Position;

const MAX_RENDERED_FRAMES: usize = 16;

/// One active call: the callee's name, where it was called from and the
/// inspected arguments it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub name: String,
    pub position: Position,
    pub arguments: Vec<String>,
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) ({})",
            self.name,
            self.arguments.join(", "),
            self.position
        )
    }
}

#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a frame; the frame is not pushed when the limit is reached.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.max_depth {
            debug!("Call depth limit {} reached at {}", self.max_depth, frame.name);
            return Err(RuntimeError::new(
                format!("maximum call depth of {} exceeded", self.max_depth),
                frame.position,
            ));
        }

        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames, most recent call first.
    pub fn capture(&self) -> Vec<CallFrame> {
        self.frames.iter().rev().cloned().collect()
    }
}

/// Source lines around an error with the offending column marked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// `(line number, text)`, at most the line before and the error line.
    pub lines: Vec<(usize, String)>,
    pub column: usize,
}

impl Snippet {
    /// `None` if `position` lies outside `source`.
    pub fn from_source(source: &str, position: Position) -> Option<Self> {
        if position.line == 0 {
            return None;
        }

        let all: Vec<&str> = source.lines().collect();
        let text = all.get(position.line - 1)?;

        let mut lines = Vec::with_capacity(2);

        if position.line > 1 {
            if let Some(prev) = all.get(position.line - 2) {
                lines.push((position.line - 1, (*prev).to_string()));
            }
        }

        lines.push((position.line, (*text).to_string()));

        Some(Self {
            lines,
            column: position.column.max(1),
        })
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .lines
            .iter()
            .map(|(n, _)| n.to_string().len())
            .max()
            .unwrap_or(1);

        for (n, text) in &self.lines {
            writeln!(f, "  {:>width$} | {}", n, text, width = width)?;
        }

        write!(
            f,
            "  {:>width$} | {}^",
            "",
            " ".repeat(self.column - 1),
            width = width
        )
    }
}

/// A runtime failure.  Wrapped by `Object::Error` when it reaches the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
    pub position: Position,
    pub hint: Option<String>,
    /// Most recent call first.
    pub stack: Vec<CallFrame>,
    pub snippet: Option<Snippet>,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(message: S, position: Position) -> Self {
        let message: String = message.into();

        debug!("Creating runtime error: {} at {}", message, position);

        Self {
            message,
            position,
            hint: None,
            stack: Vec::new(),
            snippet: None,
        }
    }

    pub fn with_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a call-stack snapshot unless one is already present.
    pub fn with_stack(mut self, stack: &CallStack) -> Self {
        if self.stack.is_empty() {
            self.stack = stack.capture();
        }
        self
    }

    /// Attach the source window unless one is already present.
    pub fn with_source(mut self, source: Option<&str>) -> Self {
        if self.snippet.is_none() {
            self.snippet = source.and_then(|src| Snippet::from_source(src, self.position));
        }
        self
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;
        write!(f, " --> {}", self.position)?;

        if let Some(snippet) = &self.snippet {
            write!(f, "\n{}", snippet)?;
        }

        if let Some(hint) = &self.hint {
            write!(f, "\n  = help: {}", hint)?;
        }

        if !self.stack.is_empty() {
            write!(f, "\nstack trace:")?;
            for frame in self.stack.iter().take(MAX_RENDERED_FRAMES) {
                write!(f, "\n  at {}", frame)?;
            }
            if self.stack.len() > MAX_RENDERED_FRAMES {
                write!(
                    f,
                    "\n  ... {} more frames",
                    self.stack.len() - MAX_RENDERED_FRAMES
                )?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Levenshtein distance in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a.chars().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b.chars().enumerate() {
            let cost = usize::from(a_char != b_char);

            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

fn default_threshold(name_len: usize) -> usize {
    match name_len {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        n => (n / 2).min(5),
    }
}

/// Candidates within the edit-distance threshold of `name`, closest first
/// (ties keep candidate order), at most `limit` of them.
pub fn rank_similar<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<&'a str> {
    if name.is_empty() {
        return Vec::new();
    }

    let threshold = default_threshold(name.chars().count());

    let mut ranked: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .filter(|candidate| name.len().abs_diff(candidate.len()) <= threshold)
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= threshold)
        .collect();

    ranked.sort_by_key(|(distance, _)| *distance);
    ranked.dedup_by(|a, b| a.1 == b.1);
    ranked.truncate(limit);

    ranked.into_iter().map(|(_, candidate)| candidate).collect()
}

/// "did you mean `a` or `b`?" for the closest candidates, if any.
pub fn did_you_mean<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let ranked = rank_similar(name, candidates, 3);

    if ranked.is_empty() {
        return None;
    }

    let quoted: Vec<String> = ranked.iter().map(|c| format!("`{}`", c)).collect();

    Some(format!("did you mean {}?", quoted.join(" or ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("hello", "hello"), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("", "ab"), 2);
    }

    #[test]
    fn ranking_orders_by_distance() {
        let candidates = ["name", "vaule", "value"];
        assert_eq!(rank_similar("valu", candidates, 3), vec!["value", "vaule"]);
    }

    #[test]
    fn unrelated_names_are_not_suggested() {
        assert_eq!(did_you_mean("x", ["completely", "different"]), None);
        assert_eq!(
            did_you_mean("lenght", ["length", "width"]),
            Some("did you mean `length`?".to_string())
        );
    }

    #[test]
    fn snippet_shows_previous_line_and_caret() {
        let source = "let a = 1;\nlet b = a + c;\n";
        let snippet = Snippet::from_source(source, Position::new(2, 13)).unwrap();

        assert_eq!(
            snippet.to_string(),
            "  1 | let a = 1;\n  2 | let b = a + c;\n    |             ^"
        );
    }

    #[test]
    fn call_stack_enforces_depth() {
        let mut stack = CallStack::new(1);
        let frame = CallFrame {
            name: "f".into(),
            position: Position::new(1, 1),
            arguments: vec![],
        };

        assert!(stack.push(frame.clone()).is_ok());
        assert!(stack.push(frame).is_err());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn error_renders_all_sections() {
        let mut stack = CallStack::new(10);
        stack
            .push(CallFrame {
                name: "f".into(),
                position: Position::new(1, 1),
                arguments: vec!["1".into()],
            })
            .unwrap();

        let err = RuntimeError::new("boom", Position::new(1, 5))
            .with_hint("did you mean `b`?")
            .with_stack(&stack)
            .with_source(Some("f(a);"));

        assert_eq!(
            err.to_string(),
            "error: boom\n --> line 1, column 5\n  1 | f(a);\n    |     ^\n  = help: did you mean `b`?\nstack trace:\n  at f(1) (line 1, column 1)"
        );
    }
}
