//! Process lock so only one process streams frames to the keyboard at a time

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Holds the lock file open. Released when dropped.
pub struct Lock {
    _file: File,
    path: PathBuf,
}

impl Lock {
    /// Lock the per-user animation slot
    pub fn acquire() -> io::Result<Self> {
        let dirs = ProjectDirs::from("", "", "gmmk-rgb").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not determine lock directory")
        })?;
        Self::acquire_in(dirs.config_dir())
    }

    /// Lock `animate.lock` inside `dir`, failing if another process holds it
    pub fn acquire_in(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("animate.lock");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock().is_err() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "another gmmk-rgb animation is already driving the keyboard",
            ));
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { _file: file, path })
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
