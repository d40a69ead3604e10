// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("File {0} does not exist")]
    FileNotFound(PathBuf),

    #[error("Printer {0} not found")]
    PrinterUnavailable(String),

    #[error("Spooler error: {0}")]
    Spooler(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
