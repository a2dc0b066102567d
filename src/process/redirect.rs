//! # Standard stream targets.
//!
//! An OS stdio handle belongs to exactly one child, so a [`Redirect`] describes
//! the target and is turned into a fresh [`Stdio`] for every launch.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

/// Where a child's standard stream goes (or comes from, for stdin).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Redirect {
    /// Share the supervisor's own stream.
    #[default]
    Inherit,
    /// Discard output / empty input.
    Null,
    /// A file on disk. Output is appended when `append` is set, truncated otherwise.
    File {
        /// File location.
        path: PathBuf,
        /// Append instead of truncating (output streams only).
        append: bool,
    },
}

impl Redirect {
    /// Appending file target.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Redirect::File {
            path: path.into(),
            append: true,
        }
    }

    pub(crate) fn input(&self) -> io::Result<Stdio> {
        match self {
            Redirect::Inherit => Ok(Stdio::inherit()),
            Redirect::Null => Ok(Stdio::null()),
            Redirect::File { path, .. } => File::open(path).map(Stdio::from),
        }
    }

    pub(crate) fn output(&self) -> io::Result<Stdio> {
        match self {
            Redirect::Inherit => Ok(Stdio::inherit()),
            Redirect::Null => Ok(Stdio::null()),
            Redirect::File { path, append } => OpenOptions::new()
                .create(true)
                .write(true)
                .append(*append)
                .truncate(!*append)
                .open(path)
                .map(Stdio::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_file_is_an_error() {
        let r = Redirect::file("/definitely/not/here.txt");
        assert!(r.input().is_err());
    }

    #[test]
    fn output_file_is_created() {
        let path = std::env::temp_dir().join(format!("procvisor-redirect-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        Redirect::file(&path).output().unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
