// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Local staging of attachments before they are handed to the spooler.
//!
//! Files are written into one flat directory. A save never overwrites an
//! existing file: on a name collision `report.pdf` becomes `report(1).pdf`,
//! then `report(2).pdf`, and so on.

use log::{debug, error, info};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),
}

/// A staged copy of an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    path: PathBuf,
    file_name: String,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name inside the staging directory, after disambiguation.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    /// Nothing was there to delete. Logged, not an error.
    Missing,
}

/// Reduce a sender-supplied filename to a single safe path component.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_start_matches("..")
        .chars()
        .take(200)
        .collect()
}

/// Splits `name` into stem and extension, keeping the dot with the extension.
/// Leading dots belong to the stem, so `.profile` has no extension.
fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

fn candidate_name(filename: &str, counter: u32) -> String {
    if counter == 0 {
        return filename.to_string();
    }
    let (stem, ext) = split_extension(filename);
    format!("{}({}){}", stem, counter, ext)
}

#[derive(Debug, Clone)]
pub struct StagingStore {
    directory: PathBuf,
}

impl StagingStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes `bytes` under `filename` in the staging directory, creating the
    /// directory if needed.
    ///
    /// The returned path did not exist before the call and now holds exactly
    /// `bytes`.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<StagedFile, StagingError> {
        self.save_with(filename, |file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
    }

    /// Creates a fresh file for `filename` and fills it with `write`. If
    /// `write` fails the file is removed again before the error is returned.
    fn save_with<F>(&self, filename: &str, mut write: F) -> Result<StagedFile, StagingError>
    where
        F: FnMut(&mut File) -> io::Result<()>,
    {
        let filename = sanitize_filename(filename);
        if filename.is_empty() || filename == "." {
            return Err(StagingError::InvalidFilename(filename));
        }

        fs::create_dir_all(&self.directory)?;

        let mut counter = 0u32;
        loop {
            let file_name = candidate_name(&filename, counter);
            let path = self.directory.join(&file_name);

            // create_new makes the existence check and the creation one step
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = write(&mut file) {
                        error!("Failed to write {}: {}", path.display(), e);
                        drop(file);
                        if let Err(remove_err) = fs::remove_file(&path) {
                            error!("Failed to remove partial file {}: {}", path.display(), remove_err);
                        }
                        return Err(e.into());
                    }
                    info!("File saved: {}", path.display());
                    return Ok(StagedFile { path, file_name });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, trying next name", path.display());
                    counter += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Removes `file_name` from the staging directory.
    ///
    /// A missing file is logged and reported as [`DeleteOutcome::Missing`];
    /// only other I/O failures are errors.
    pub fn delete(&self, file_name: &str) -> Result<DeleteOutcome, StagingError> {
        let path = self.directory.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted file: {}", path.display());
                Ok(DeleteOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("File not found for deletion: {}", path.display());
                Ok(DeleteOutcome::Missing)
            }
            Err(e) => Err(e.into()),
        }
    }
}
