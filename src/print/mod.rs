// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod cups;
pub mod dispatcher;
pub mod error;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

pub use cups::LpPrintService;
pub use dispatcher::{job_options, PrintDispatcher};
pub use error::PrintError;

/// Spooler options, keyed by IPP attribute name.
pub type PrintOptions = BTreeMap<String, String>;

/// Identifier the spooler assigned to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The print spooling backend.
///
/// Implementations enumerate the printers the spooler knows about and submit
/// a file with a set of options. Jobs are fire-and-forget: nothing tracks them
/// after submission.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PrintService: Send + Sync {
    /// Names of all printers currently known to the spooler.
    async fn printers(&self) -> Result<Vec<String>, PrintError>;

    /// Queues `file` on `printer` and returns the spooler's job id.
    async fn print_file(
        &self,
        printer: &str,
        file: &Path,
        title: &str,
        options: &PrintOptions,
    ) -> Result<JobId, PrintError>;
}
