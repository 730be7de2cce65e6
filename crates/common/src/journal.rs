//! # Journal Model
//!
//! In-memory representation of a journal file and the pure algorithms that
//! operate on it: line numbering, index padding, tag probing and tailing.
//!
//! ## Line Format
//!
//! ```text
//! <index>. <timestamp> - [<signature> - ]<content>.
//! 0007. 2022-08-01 14:03:22 - Installed package.
//! 0008. 2022-08-01 14:05:10 - Installed package. #Setup3.
//! ```
//!
//! The index is zero-padded to the width of the largest index currently in
//! the journal. The width is recomputed on every render, so crossing an
//! order of magnitude re-pads every entry.
//!
//! Lines that do not start with `<digits>. ` are kept verbatim. They usually
//! are a Markdown header written by hand above the first entry.

use chrono::NaiveDateTime;

use crate::errors::{JourError, JourResult};

/// Timestamp layout used for new entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Content of the entry that seeds a freshly created journal.
pub const SEED_CONTENT: &str = "Create this journal";

/// Number of lines `tail` returns by default.
pub const DEFAULT_TAIL_LINES: usize = 10;

const FIELD_SEPARATOR: &str = " - ";
const COMMAND_DELIMITER: char = '`';

/// A new entry as requested by the caller, before it gets an index and a
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub content: String,
    pub signature: Option<String>,
    pub as_command: bool,
}

impl NewEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            signature: None,
            as_command: false,
        }
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn as_command(mut self, as_command: bool) -> Self {
        self.as_command = as_command;
        self
    }

    fn validate(&self) -> JourResult<()> {
        validate_text("content", &self.content)?;
        if let Some(signature) = &self.signature {
            if signature.contains(is_line_break) {
                return Err(JourError::invalid_input("signature contains a line break"));
            }
        }
        Ok(())
    }
}

/// A numbered entry. The index is kept as a number so it can be re-padded;
/// everything after `"<index>. "` is kept as text, exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalLine {
    index: u64,
    body: String,
}

impl JournalLine {
    /// Builds the canonical line for `entry`.
    pub fn compose(index: u64, timestamp: NaiveDateTime, entry: &NewEntry) -> Self {
        let mut body = timestamp.format(TIMESTAMP_FORMAT).to_string();
        body.push_str(FIELD_SEPARATOR);
        if let Some(signature) = &entry.signature {
            body.push_str(signature);
            body.push_str(FIELD_SEPARATOR);
        }
        body.push_str(&format_content(&entry.content, entry.as_command));
        Self { index, body }
    }

    /// Parses `<digits>. <body>`; returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let (index, body) = raw.split_once(". ")?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = index.parse().ok()?;
        Some(Self {
            index,
            body: body.to_string(),
        })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Text after the index separator.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Renders the line with the index padded to `width` digits.
    pub fn render(&self, width: usize) -> String {
        format!("{:0width$}. {}", self.index, self.body, width = width)
    }
}

/// One line of the journal file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Entry(JournalLine),
    Verbatim(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        match JournalLine::parse(raw) {
            Some(entry) => Line::Entry(entry),
            None => Line::Verbatim(raw.to_string()),
        }
    }

    pub fn render(&self, width: usize) -> String {
        match self {
            Line::Entry(entry) => entry.render(width),
            Line::Verbatim(text) => text.clone(),
        }
    }

    pub fn as_entry(&self) -> Option<&JournalLine> {
        match self {
            Line::Entry(entry) => Some(entry),
            Line::Verbatim(_) => None,
        }
    }

    fn push_suffix(&mut self, suffix: &str) {
        match self {
            Line::Entry(entry) => entry.body.push_str(suffix),
            Line::Verbatim(text) => text.push_str(suffix),
        }
    }
}

/// Ordered sequence of journal lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    lines: Vec<Line>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new journal holding only the creation entry.
    pub fn seeded(timestamp: NaiveDateTime, signature: Option<String>) -> Self {
        let mut journal = Self::new();
        let seed = NewEntry::new(SEED_CONTENT).with_signature(signature);
        journal
            .lines
            .push(Line::Entry(JournalLine::compose(1, timestamp, &seed)));
        journal
    }

    /// Loads a journal from file text, preserving every line.
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(Line::parse).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&Line> {
        self.lines.last()
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalLine> {
        self.lines.iter().filter_map(Line::as_entry)
    }

    /// Width of the largest index, at least one digit.
    pub fn index_width(&self) -> usize {
        self.entries()
            .map(|entry| entry.index)
            .max()
            .map(|max| max.to_string().len())
            .unwrap_or(1)
    }

    /// Renders every line with the current padding.
    pub fn rendered_lines(&self) -> Vec<String> {
        let width = self.index_width();
        self.lines.iter().map(|line| line.render(width)).collect()
    }

    /// Canonical file content, one newline-terminated line per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.rendered_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Index for the next entry.
    ///
    /// The error carries the reason the last line could not be read.
    pub fn next_index(&self) -> Result<u64, String> {
        match self.lines.last() {
            None => Ok(1),
            Some(Line::Entry(entry)) => entry
                .index
                .checked_add(1)
                .ok_or_else(|| format!("index {} cannot be incremented", entry.index)),
            Some(Line::Verbatim(text)) => {
                if self.entries().next().is_none() {
                    Ok(1)
                } else {
                    Err(format!("no index in '{}'", text))
                }
            }
        }
    }

    /// Appends a composed entry.
    pub fn push_entry(
        &mut self,
        index: u64,
        timestamp: NaiveDateTime,
        entry: &NewEntry,
    ) -> JourResult<&Line> {
        entry.validate()?;
        self.lines
            .push(Line::Entry(JournalLine::compose(index, timestamp, entry)));
        self.lines.last().ok_or(JourError::EmptyJournal)
    }

    /// Extends the last line with `" <content>."`.
    pub fn append_to_last(&mut self, content: &str, as_command: bool) -> JourResult<&Line> {
        validate_text("content", content)?;
        let suffix = format!(" {}", format_content(content, as_command));
        self.push_suffix(&suffix)
    }

    /// Extends the last line with `" #<tag>."`.
    pub fn tag_last(&mut self, tag: &str) -> JourResult<&Line> {
        let suffix = format!(" #{}.", tag);
        self.push_suffix(&suffix)
    }

    fn push_suffix(&mut self, suffix: &str) -> JourResult<&Line> {
        let last = self.lines.last_mut().ok_or(JourError::EmptyJournal)?;
        last.push_suffix(suffix);
        Ok(&*last)
    }

    /// Drops the last line; indices of the remaining lines are left alone.
    pub fn remove_last(&mut self) -> JourResult<Line> {
        self.lines.pop().ok_or(JourError::EmptyJournal)
    }

    /// Next free tag for `tag_name`: probes `"<tag_name>1"`, `"<tag_name>2"`,
    /// ... against the whole journal text and returns the first absent one.
    pub fn next_tag(&self, tag_name: &str) -> JourResult<String> {
        validate_tag_name(tag_name)?;
        let text = self.render();
        let mut index: u64 = 1;
        while text.contains(&format!("{}{}", tag_name, index)) {
            index += 1;
        }
        Ok(format!("{}{}", tag_name, index))
    }

    /// Last `count` rendered lines in original order.
    pub fn tail(&self, count: usize) -> JourResult<Vec<String>> {
        if self.lines.is_empty() {
            return Err(JourError::EmptyJournal);
        }
        let width = self.index_width();
        let start = self.lines.len().saturating_sub(count);
        Ok(self.lines[start..]
            .iter()
            .map(|line| line.render(width))
            .collect())
    }
}

/// Wraps command content in backticks and terminates it with a period.
pub fn format_content(content: &str, as_command: bool) -> String {
    let mut out = if as_command {
        format!("{}{}{}", COMMAND_DELIMITER, content, COMMAND_DELIMITER)
    } else {
        content.to_string()
    };
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn validate_text(field: &str, text: &str) -> JourResult<()> {
    if text.trim().is_empty() {
        return Err(JourError::invalid_input(format!("{field} can't be empty")));
    }
    if text.contains(is_line_break) {
        return Err(JourError::invalid_input(format!(
            "{field} contains a line break"
        )));
    }
    Ok(())
}

fn validate_tag_name(tag_name: &str) -> JourResult<()> {
    if tag_name.is_empty() {
        return Err(JourError::invalid_input("tag name can't be empty"));
    }
    if tag_name.chars().any(char::is_whitespace) {
        return Err(JourError::invalid_input(format!(
            "tag name '{tag_name}' contains whitespace"
        )));
    }
    Ok(())
}
