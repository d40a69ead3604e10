// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! CUPS backend driven through the `lp` and `lpstat` command line tools.

use async_trait::async_trait;
use log::debug;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

use super::{JobId, PrintError, PrintOptions, PrintService};

#[derive(Debug, Clone)]
pub struct LpPrintService {
    lp_program: String,
    lpstat_program: String,
}

impl Default for LpPrintService {
    fn default() -> Self {
        Self {
            lp_program: "lp".to_string(),
            lpstat_program: "lpstat".to_string(),
        }
    }
}

impl LpPrintService {
    pub fn new(lp_program: impl Into<String>, lpstat_program: impl Into<String>) -> Self {
        Self {
            lp_program: lp_program.into(),
            lpstat_program: lpstat_program.into(),
        }
    }
}

fn check_status(program: &str, output: &Output) -> Result<(), PrintError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(PrintError::Spooler(format!(
        "{} exited with {}: {}",
        program,
        output.status,
        stderr.trim()
    )))
}

/// Parses `lpstat -e` output: one destination name per line.
pub fn parse_printer_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts the job id from `lp` output such as
/// `request id is Office-42 (1 file(s))`.
pub fn parse_request_id(stdout: &str) -> Option<JobId> {
    stdout.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("request id is ")?;
        rest.split_whitespace().next().map(|id| JobId(id.to_string()))
    })
}

/// Builds the argument list for `lp`.
pub fn lp_args(printer: &str, file: &Path, title: &str, options: &PrintOptions) -> Vec<String> {
    let mut args = vec![
        "-d".to_string(),
        printer.to_string(),
        "-t".to_string(),
        title.to_string(),
    ];
    for (key, value) in options {
        args.push("-o".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push("--".to_string());
    args.push(file.to_string_lossy().into_owned());
    args
}

#[async_trait]
impl PrintService for LpPrintService {
    async fn printers(&self) -> Result<Vec<String>, PrintError> {
        let output = Command::new(&self.lpstat_program).arg("-e").output().await?;
        check_status(&self.lpstat_program, &output)?;
        let printers = parse_printer_list(&String::from_utf8_lossy(&output.stdout));
        debug!("Spooler knows {} printer(s): {:?}", printers.len(), printers);
        Ok(printers)
    }

    async fn print_file(
        &self,
        printer: &str,
        file: &Path,
        title: &str,
        options: &PrintOptions,
    ) -> Result<JobId, PrintError> {
        let args = lp_args(printer, file, title, options);
        debug!("Running {} {:?}", self.lp_program, args);

        let output = Command::new(&self.lp_program).args(&args).output().await?;
        check_status(&self.lp_program, &output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_request_id(&stdout).ok_or_else(|| {
            PrintError::Spooler(format!("Unexpected {} output: {}", self.lp_program, stdout.trim()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_printer_list() {
        let printers = parse_printer_list("Kyocera_TASKalfa_4054ci\nOffice\n\n  Lobby \n");
        assert_eq!(printers, vec!["Kyocera_TASKalfa_4054ci", "Office", "Lobby"]);
        assert!(parse_printer_list("").is_empty());
    }

    #[test]
    fn test_parse_request_id() {
        assert_eq!(
            parse_request_id("request id is Office-42 (1 file(s))\n"),
            Some(JobId("Office-42".to_string()))
        );
        assert_eq!(parse_request_id("lp: error - no default destination"), None);
    }

    #[test]
    fn test_lp_args() {
        let mut options = PrintOptions::new();
        options.insert("copies".to_string(), "2".to_string());
        options.insert("media".to_string(), "A4".to_string());

        let args = lp_args("Office", Path::new("attachments/report.pdf"), "Email Print Job", &options);
        assert_eq!(
            args,
            vec![
                "-d", "Office", "-t", "Email Print Job", "-o", "copies=2", "-o", "media=A4", "--",
                "attachments/report.pdf",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_is_a_spooler_error() {
        let service = LpPrintService::new("false", "false");
        assert!(matches!(service.printers().await, Err(PrintError::Spooler(_))));
    }

    #[tokio::test]
    async fn test_missing_program_is_an_io_error() {
        let service = LpPrintService::new("mailprint-no-such-lp", "mailprint-no-such-lpstat");
        assert!(matches!(service.printers().await, Err(PrintError::Io(_))));
    }
}
