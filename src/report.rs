use derive_more::Constructor;
use itertools::Itertools;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Entry {
    pub message: String,
    pub line: usize,
}

/// Ordered log of everything an assembly run had to say. Appending never
/// aborts the caller; consumers read the log once the run completes.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<Entry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, message: impl Into<String>, line: usize) {
        self.entries.push(Entry::new(message.into(), line));
    }

    pub fn error(&mut self, message: impl Display, line: usize) {
        self.log(format!("ERROR -- {}", message), line);
    }

    pub fn unexpected_token(&mut self, token: impl Display, line: usize) {
        self.error(format!("Unexpected token '{}'", token), line);
    }

    pub fn expecting_token(&mut self, expected: impl Display, got: impl Display, line: usize) {
        self.error(
            format!("Expecting token '{}' but got '{}'", expected, got),
            line,
        );
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.entries
                .iter()
                .map(|entry| format!("{}: {}", entry.line, entry.message))
                .join("\n")
        )
    }
}
