mod safe_write;

pub use safe_write::{backup_path_for, temp_path_for, SafeFileWriter, WriteMode};
