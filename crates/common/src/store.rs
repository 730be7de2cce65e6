//! # Journal Store
//!
//! Runs one operation per invocation: take the named lock, open a session on
//! the resolved journal, apply the operation, close the session, release the
//! lock. All operations take the lock, read-only ones included.

use crate::config::JourConfig;
use crate::errors::{JourError, JourResult};
use crate::journal::NewEntry;
use crate::lock::{self, LockSpec};
use crate::paths::{JournalKind, PathResolver, ResolvedJournal};
use crate::session::{JournalSession, SessionOptions};

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Print,
    Write(NewEntry),
    Append { content: String, as_command: bool },
    Remove,
    Tag { tag_name: String },
    ReturnTag { tag_name: String },
    SaveAndTag { tag_name: String, entry: NewEntry },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Print => "print",
            Operation::Write(_) => "write",
            Operation::Append { .. } => "append",
            Operation::Remove => "remove",
            Operation::Tag { .. } => "tag",
            Operation::ReturnTag { .. } => "return-tag",
            Operation::SaveAndTag { .. } => "save-and-tag",
        }
    }

    /// Whether the operation writes a tag.
    pub fn tags(&self) -> bool {
        matches!(self, Operation::Tag { .. } | Operation::SaveAndTag { .. })
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Last lines of the journal, oldest first.
    Printed(Vec<String>),
    /// Print on a journal without lines.
    Empty,
    /// A line was added or changed; carries the rendered line.
    Line(String),
    /// The last line was dropped; carries what it said.
    Removed(String),
    /// The next tag, not written.
    NextTag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub journal: ResolvedJournal,
    pub outcome: Outcome,
}

pub struct JournalStore {
    resolver: PathResolver,
    lock: LockSpec,
    session_options: SessionOptions,
    signature: Option<String>,
}

impl JournalStore {
    pub fn new(
        resolver: PathResolver,
        lock: LockSpec,
        session_options: SessionOptions,
        signature: Option<String>,
    ) -> Self {
        Self {
            resolver,
            lock,
            session_options,
            signature,
        }
    }

    pub fn from_config(config: &JourConfig) -> JourResult<Self> {
        Ok(Self::new(
            config.resolver()?,
            config.lock_spec(),
            config.session_options(),
            config.signature.clone(),
        ))
    }

    /// Runs `operation` under the lock. The journal file is rewritten only
    /// when the operation succeeded.
    pub fn run(&self, operation: Operation) -> JourResult<Report> {
        let _guard = lock::acquire(&self.lock)?;
        tracing::debug!("running {} under lock '{}'", operation.name(), self.lock.name);

        let mut session = JournalSession::with_options(self.session_options.clone());
        let journal = self.resolver.open_session(&mut session)?;
        if journal.kind == JournalKind::Emergency && operation.tags() {
            tracing::warn!(
                "Tagging in the emergency journal in `{}`. Tag numbers may repeat the default journal's after merging.",
                journal.path.display()
            );
        }
        let outcome = match self.apply(&mut session, operation) {
            Ok(outcome) => outcome,
            Err(e) => {
                session.discard();
                return Err(e);
            }
        };
        session.close()?;

        Ok(Report { journal, outcome })
    }

    fn apply(&self, session: &mut JournalSession, operation: Operation) -> JourResult<Outcome> {
        match operation {
            Operation::Print => match session.print_journal() {
                Ok(lines) => Ok(Outcome::Printed(lines)),
                Err(JourError::EmptyJournal) => {
                    tracing::warn!("{}", JourError::EmptyJournal);
                    Ok(Outcome::Empty)
                }
                Err(e) => Err(e),
            },
            Operation::Write(entry) => session.write_line(&self.signed(entry)).map(Outcome::Line),
            Operation::Append {
                content,
                as_command,
            } => session
                .append_to_last_line(&content, as_command)
                .map(Outcome::Line),
            Operation::Remove => session.remove_last_line().map(Outcome::Removed),
            Operation::Tag { tag_name } => session
                .tag_last_line(&tag_name)
                .map(|(_, line)| Outcome::Line(line)),
            Operation::ReturnTag { tag_name } => {
                session.get_next_tag(&tag_name).map(Outcome::NextTag)
            }
            Operation::SaveAndTag { tag_name, entry } => {
                session.write_line(&self.signed(entry))?;
                let (_, line) = session.tag_last_line(&tag_name)?;
                Ok(Outcome::Line(line))
            }
        }
    }

    fn signed(&self, entry: NewEntry) -> NewEntry {
        if entry.signature.is_some() {
            entry
        } else {
            entry.with_signature(self.signature.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    fn store(dir: &Path, create: bool, timeout: Duration) -> JournalStore {
        JournalStore::new(
            PathResolver::new(
                dir.join("journal.md"),
                dir.join("journal_emergency.md"),
                create,
            ),
            LockSpec {
                name: "journal_writer".into(),
                dir: dir.join("locks"),
                timeout,
            },
            SessionOptions::default(),
            Some("test_user".into()),
        )
    }

    fn journal_path(dir: &TempDir) -> PathBuf {
        dir.path().join("journal.md")
    }

    #[test]
    fn write_uses_default_signature() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), true, Duration::from_secs(5));
        let report = store
            .run(Operation::Write(NewEntry::new("Message")))
            .unwrap();
        assert_eq!(report.journal.kind, JournalKind::Primary);
        let Outcome::Line(line) = report.outcome else {
            panic!("expected a line");
        };
        assert!(line.ends_with(" - test_user - Message."));
    }

    #[test]
    fn explicit_signature_is_kept() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), true, Duration::from_secs(5));
        let entry = NewEntry::new("Message").with_signature(Some("CustomSignature".into()));
        let report = store.run(Operation::Write(entry)).unwrap();
        assert!(matches!(
            report.outcome,
            Outcome::Line(ref l) if l.contains(" - CustomSignature - ")
        ));
    }

    #[test]
    fn save_and_tag_is_one_session() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), true, Duration::from_secs(5));
        store
            .run(Operation::SaveAndTag {
                tag_name: "Setup".into(),
                entry: NewEntry::new("Installed package"),
            })
            .unwrap();
        let report = store
            .run(Operation::SaveAndTag {
                tag_name: "Setup".into(),
                entry: NewEntry::new("Installed another"),
            })
            .unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Line(
                fs::read_to_string(journal_path(&dir))
                    .unwrap()
                    .lines()
                    .last()
                    .unwrap()
                    .to_string()
            )
        );
        let text = fs::read_to_string(journal_path(&dir)).unwrap();
        assert!(text.contains("Installed package. #Setup1.\n"));
        assert!(text.contains("Installed another. #Setup2.\n"));

        let next = store
            .run(Operation::ReturnTag {
                tag_name: "Setup".into(),
            })
            .unwrap();
        assert_eq!(next.outcome, Outcome::NextTag("Setup3".into()));
    }

    #[test]
    fn only_tagging_operations_tag() {
        let tag = Operation::Tag {
            tag_name: "Setup".into(),
        };
        let save_and_tag = Operation::SaveAndTag {
            tag_name: "Setup".into(),
            entry: NewEntry::new("x"),
        };
        let return_tag = Operation::ReturnTag {
            tag_name: "Setup".into(),
        };
        assert!(tag.tags());
        assert!(save_and_tag.tags());
        assert!(!return_tag.tags());
        assert!(!Operation::Print.tags());
    }

    #[test]
    fn print_on_empty_journal_is_informational() {
        let dir = TempDir::new().unwrap();
        fs::write(journal_path(&dir), "").unwrap();
        let store = store(dir.path(), false, Duration::from_secs(5));
        let report = store.run(Operation::Print).unwrap();
        assert_eq!(report.outcome, Outcome::Empty);
    }

    #[test]
    fn failed_mutation_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(journal_path(&dir), "").unwrap();
        let store = store(dir.path(), false, Duration::from_secs(5));
        let err = store.run(Operation::Remove).unwrap_err();
        assert!(matches!(err, JourError::EmptyJournal));
        assert_eq!(fs::read_to_string(journal_path(&dir)).unwrap(), "");
        assert!(!dir.path().join("journal.md.bup").exists());
    }

    #[test]
    fn missing_primary_writes_to_emergency() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), false, Duration::from_secs(5));
        let report = store
            .run(Operation::Write(NewEntry::new("Test message")))
            .unwrap();
        assert_eq!(report.journal.kind, JournalKind::Emergency);
        assert!(!journal_path(&dir).exists());
        let text = fs::read_to_string(dir.path().join("journal_emergency.md")).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("Test message.\n"));
    }

    #[test]
    fn held_lock_times_out_without_touching_the_journal() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), true, Duration::from_millis(200));
        store.run(Operation::Write(NewEntry::new("first"))).unwrap();
        let before = fs::read_to_string(journal_path(&dir)).unwrap();

        let _held = lock::acquire(&store.lock).unwrap();
        let err = store
            .run(Operation::Write(NewEntry::new("second")))
            .unwrap_err();

        assert!(matches!(err, JourError::Concurrency { .. }));
        assert_eq!(fs::read_to_string(journal_path(&dir)).unwrap(), before);
    }

    #[test]
    fn concurrent_writers_get_distinct_indices() {
        let dir = TempDir::new().unwrap();
        store(dir.path(), true, Duration::from_secs(5))
            .run(Operation::Print)
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let root = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    store(&root, false, Duration::from_secs(30))
                        .run(Operation::Write(NewEntry::new(format!("writer {i}"))))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = fs::read_to_string(journal_path(&dir)).unwrap();
        let indices: Vec<u64> = text
            .lines()
            .map(|l| l.split('.').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(indices, (1..=9).collect::<Vec<u64>>());
    }
}
