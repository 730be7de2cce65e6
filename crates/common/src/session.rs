//! # Journal Session
//!
//! Scoped handle binding one invocation to one journal file.
//!
//! A session is created empty, opened (loading or creating the file),
//! mutated, then closed. Closing renders the whole journal and replaces the
//! file atomically. Nothing reaches the disk before `close`, so a failed
//! operation leaves the file exactly as it was. Any operation outside the
//! open state fails with [`JourError::SessionState`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::errors::{JourError, JourResult};
use crate::fs::{backup_path_for, SafeFileWriter, WriteMode};
use crate::journal::{Journal, Line, NewEntry, DEFAULT_TAIL_LINES};

#[derive(Debug)]
enum State {
    Idle,
    Open { path: PathBuf, journal: Journal },
    Closed,
}

/// Options fixed for the lifetime of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Signature of the seed entry when the journal gets created.
    pub seed_signature: Option<String>,
    /// Copy the file to `<file>.bup` on open and drop the copy on clean close.
    pub backup: bool,
}

#[derive(Debug)]
pub struct JournalSession {
    state: State,
    options: SessionOptions,
    backup: Option<PathBuf>,
}

impl Default for JournalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalSession {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            state: State::Idle,
            options,
            backup: None,
        }
    }

    /// Loads the journal at `path`.
    ///
    /// A missing file is created with a seed entry when `create_if_missing`
    /// is set; otherwise [`JourError::JournalUnreachable`] is returned and
    /// nothing is created.
    pub fn open(&mut self, path: &Path, create_if_missing: bool) -> JourResult<()> {
        if !matches!(self.state, State::Idle) {
            return Err(JourError::SessionState { operation: "open" });
        }

        // A symlinked journal is rewritten through its target.
        let resolved;
        let path = if path.is_file() {
            resolved = fs::canonicalize(path)
                .map_err(|e| JourError::io(Some(path.to_path_buf()), "resolve journal path", e))?;
            resolved.as_path()
        } else {
            path
        };

        let journal = if path.is_file() {
            let text = fs::read_to_string(path)
                .map_err(|e| JourError::io(Some(path.to_path_buf()), "read journal", e))?;
            if self.options.backup {
                let backup = backup_path_for(path);
                fs::copy(path, &backup)
                    .map_err(|e| JourError::io(Some(backup.clone()), "write journal backup", e))?;
                self.backup = Some(backup);
            }
            Journal::parse(&text)
        } else if path.exists() {
            return Err(JourError::config(format!(
                "'{}' exists but is not a regular file",
                path.display()
            )));
        } else if create_if_missing {
            let journal = Journal::seeded(now(), self.options.seed_signature.clone());
            SafeFileWriter::new()
                .with_create_parents(true)
                .write_text(path, &journal.render(), WriteMode::CreateNew)?;
            tracing::info!("created journal {}", path.display());
            journal
        } else {
            return Err(JourError::JournalUnreachable {
                path: path.to_path_buf(),
            });
        };

        tracing::debug!(
            "opened journal {} with {} lines",
            path.display(),
            journal.len()
        );
        self.state = State::Open {
            path: path.to_path_buf(),
            journal,
        };
        Ok(())
    }

    /// Dumps the journal to disk and ends the session.
    pub fn close(&mut self) -> JourResult<()> {
        let (path, journal) = match &self.state {
            State::Open { path, journal } => (path, journal),
            _ => return Err(JourError::SessionState { operation: "close" }),
        };

        SafeFileWriter::new().write_text(path, &journal.render(), WriteMode::Atomic)?;
        tracing::debug!("dumped {} lines to {}", journal.len(), path.display());

        self.remove_backup();
        self.state = State::Closed;
        Ok(())
    }

    /// Ends the session without writing. The file keeps its content from
    /// before `open`.
    pub fn discard(&mut self) {
        if !self.is_open() {
            return;
        }
        self.remove_backup();
        self.state = State::Closed;
        tracing::debug!("discarded session changes");
    }

    fn remove_backup(&mut self) {
        if let Some(backup) = self.backup.take() {
            if let Err(e) = fs::remove_file(&backup) {
                tracing::warn!("failed to remove backup {}: {}", backup.display(), e);
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }

    /// Path the session is bound to.
    pub fn path(&self) -> JourResult<&Path> {
        match &self.state {
            State::Open { path, .. } => Ok(path),
            _ => Err(JourError::SessionState { operation: "path" }),
        }
    }

    pub fn journal(&self) -> JourResult<&Journal> {
        match &self.state {
            State::Open { journal, .. } => Ok(journal),
            _ => Err(JourError::SessionState {
                operation: "read journal",
            }),
        }
    }

    fn open_parts(&mut self, operation: &'static str) -> JourResult<(&Path, &mut Journal)> {
        match &mut self.state {
            State::Open { path, journal } => Ok((path.as_path(), journal)),
            _ => Err(JourError::SessionState { operation }),
        }
    }

    /// Last lines of the journal, rendered, oldest first.
    pub fn print_journal(&self) -> JourResult<Vec<String>> {
        match &self.state {
            State::Open { journal, .. } => journal.tail(DEFAULT_TAIL_LINES),
            _ => Err(JourError::SessionState {
                operation: "print journal",
            }),
        }
    }

    /// Adds a new numbered entry and returns it rendered.
    pub fn write_line(&mut self, entry: &NewEntry) -> JourResult<String> {
        self.write_line_at(entry, now())
    }

    pub fn write_line_at(
        &mut self,
        entry: &NewEntry,
        timestamp: NaiveDateTime,
    ) -> JourResult<String> {
        let (path, journal) = self.open_parts("write line")?;
        let index = journal
            .next_index()
            .map_err(|reason| JourError::MalformedJournal {
                path: path.to_path_buf(),
                reason,
            })?;
        journal.push_entry(index, timestamp, entry)?;
        tracing::info!("wrote entry {}", index);
        last_rendered(journal)
    }

    /// Extends the last line with more content.
    pub fn append_to_last_line(&mut self, content: &str, as_command: bool) -> JourResult<String> {
        let (_, journal) = self.open_parts("append to last line")?;
        journal.append_to_last(content, as_command)?;
        last_rendered(journal)
    }

    /// Drops the last line and returns it rendered.
    pub fn remove_last_line(&mut self) -> JourResult<String> {
        let (_, journal) = self.open_parts("remove last line")?;
        let width = journal.index_width();
        let removed = journal.remove_last()?;
        tracing::info!("removed last line");
        Ok(removed.render(width))
    }

    /// Tags the last line with the next free index of `tag_name`.
    /// Returns the tag and the tagged line.
    pub fn tag_last_line(&mut self, tag_name: &str) -> JourResult<(String, String)> {
        let (_, journal) = self.open_parts("tag last line")?;
        if journal.is_empty() {
            return Err(JourError::EmptyJournal);
        }
        let tag = journal.next_tag(tag_name)?;
        journal.tag_last(&tag)?;
        tracing::info!("tagged last line with {}", tag);
        Ok((tag, last_rendered(journal)?))
    }

    /// Next free tag for `tag_name`, without writing it.
    pub fn get_next_tag(&self, tag_name: &str) -> JourResult<String> {
        self.journal()?.next_tag(tag_name)
    }
}

fn last_rendered(journal: &Journal) -> JourResult<String> {
    let width = journal.index_width();
    journal
        .last()
        .map(|line: &Line| line.render(width))
        .ok_or(JourError::EmptyJournal)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
