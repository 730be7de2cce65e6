// # -----------------------------
// # crates/common/src/lib.rs
// # -----------------------------
//! Journal core: an append-mostly, numbered, timestamped text journal whose
//! mutations are serialized across processes by a named lock.

pub mod config;
pub mod errors;
pub mod fs;
pub mod journal;
pub mod lock;
pub mod paths;
pub mod session;
pub mod store;

pub use config::JourConfig;
pub use errors::{JourError, JourResult};
pub use journal::{Journal, JournalLine, Line, NewEntry};
pub use lock::{LockGuard, LockSpec};
pub use paths::{JournalKind, PathResolver, ResolvedJournal};
pub use session::{JournalSession, SessionOptions};
pub use store::{JournalStore, Operation, Outcome, Report};
