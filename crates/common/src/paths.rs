//! Journal path selection: primary, custom, or emergency fallback.

use std::path::{Path, PathBuf};

use crate::errors::{JourError, JourResult};
use crate::session::JournalSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalKind {
    Primary,
    Custom,
    Emergency,
}

/// The file a session ended up bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedJournal {
    pub path: PathBuf,
    pub kind: JournalKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    primary: PathBuf,
    emergency: Option<PathBuf>,
    create_primary: bool,
}

impl PathResolver {
    pub fn new(primary: PathBuf, emergency: PathBuf, create_primary: bool) -> Self {
        Self {
            primary,
            emergency: Some(emergency),
            create_primary,
        }
    }

    /// A user-chosen journal. It must exist and is never replaced by the
    /// emergency journal.
    pub fn custom(path: PathBuf) -> Self {
        Self {
            primary: path,
            emergency: None,
            create_primary: false,
        }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn emergency(&self) -> Option<&Path> {
        self.emergency.as_deref()
    }

    /// Opens `session` on the primary journal, falling back to the emergency
    /// journal (created if needed) when the primary is unreachable.
    pub fn open_session(&self, session: &mut JournalSession) -> JourResult<ResolvedJournal> {
        let err = match session.open(&self.primary, self.create_primary) {
            Ok(()) => return Ok(self.opened_primary()),
            Err(err) => err,
        };

        if !matches!(err, JourError::JournalUnreachable { .. }) {
            return Err(err);
        }

        let Some(emergency) = &self.emergency else {
            return Err(JourError::config(format!(
                "Custom set journal file in '{}' unreachable. Aborted.",
                self.primary.display()
            )));
        };

        tracing::warn!(
            "Using emergency journal file in `{}`. Manually merge this journal with the default journal file when possible.",
            emergency.display()
        );
        session.open(emergency, true).map_err(|e| {
            JourError::config(format!(
                "Emergency journal file in '{}' unreachable ({}). Original journal in '{}' also unreachable. Aborted.",
                emergency.display(),
                e,
                self.primary.display()
            ))
        })?;

        Ok(ResolvedJournal {
            path: emergency.clone(),
            kind: JournalKind::Emergency,
        })
    }

    fn opened_primary(&self) -> ResolvedJournal {
        match &self.emergency {
            Some(emergency) => {
                if emergency.is_file() {
                    tracing::warn!(
                        "Emergency journal file in '{}' pending to be merged with main journal.",
                        emergency.display()
                    );
                }
                ResolvedJournal {
                    path: self.primary.clone(),
                    kind: JournalKind::Primary,
                }
            }
            None => ResolvedJournal {
                path: self.primary.clone(),
                kind: JournalKind::Custom,
            },
        }
    }
}
