// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use log::{debug, error, info};
use std::path::Path;

use super::{JobId, PrintError, PrintOptions, PrintService};
use crate::config::Settings;
use crate::directive::PrintJobSpec;

/// Maps a job spec to spooler options.
pub fn job_options(job: &PrintJobSpec) -> PrintOptions {
    let mut options = PrintOptions::new();
    options.insert("media".to_string(), job.media_size.clone());
    options.insert("copies".to_string(), job.copies.to_string());
    options.insert("fit-to-page".to_string(), "true".to_string());
    options.insert(
        "sides".to_string(),
        if job.duplex { "two-sided-long-edge" } else { "one-sided" }.to_string(),
    );
    options.insert(
        "print-color-mode".to_string(),
        if job.monochrome { "monochrome" } else { "color" }.to_string(),
    );
    if let Some(ranges) = &job.page_ranges {
        options.insert("page-ranges".to_string(), ranges.clone());
    }
    options
}

/// Sends staged files to the configured printer.
pub struct PrintDispatcher {
    service: Box<dyn PrintService>,
    printer_name: String,
    job_title: String,
}

impl PrintDispatcher {
    pub fn new(
        service: Box<dyn PrintService>,
        printer_name: impl Into<String>,
        job_title: impl Into<String>,
    ) -> Self {
        Self {
            service,
            printer_name: printer_name.into(),
            job_title: job_title.into(),
        }
    }

    pub fn from_settings(service: Box<dyn PrintService>, settings: &Settings) -> Self {
        Self::new(service, settings.printer_name.clone(), settings.job_title.clone())
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    /// Submits `file_path` with the options derived from `job`.
    ///
    /// The file must exist and the configured printer must appear in the
    /// spooler's live printer list; otherwise nothing is submitted.
    pub async fn submit(&self, file_path: &Path, job: &PrintJobSpec) -> Result<JobId, PrintError> {
        if !file_path.exists() {
            error!("File {} does not exist.", file_path.display());
            return Err(PrintError::FileNotFound(file_path.to_path_buf()));
        }

        let printers = self.service.printers().await?;
        if !printers.iter().any(|name| name == &self.printer_name) {
            error!("Printer {} not found.", self.printer_name);
            return Err(PrintError::PrinterUnavailable(self.printer_name.clone()));
        }

        let options = job_options(job);
        debug!("Submitting {} to {} with {:?}", file_path.display(), self.printer_name, options);

        let job_id = self
            .service
            .print_file(&self.printer_name, file_path, &self.job_title, &options)
            .await?;
        info!("Print job sent. Job ID: {}", job_id);
        Ok(job_id)
    }
}
