// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One polling cycle against the mailbox.
//!
//! ```text
//! Idle -> Connected -> Searching -> NoMatches  -------------------> Closed
//!                                -> Processing -> Cleanup -------> Closed
//! ```
//!
//! Every failure inside the cycle is logged and absorbed; the caller only
//! receives a [`CycleReport`]. Cleanup always runs after every print attempt
//! of the cycle has been made.

use log::{error, info, warn};

use crate::attachment::{self, Attachment};
use crate::config::Settings;
use crate::directive::PrintJobSpec;
use crate::imap::{self, Mailbox, MailboxError, SearchCriteria};
use crate::print::{JobId, PrintDispatcher};
use crate::staging::StagingStore;

/// Where a cycle ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Connecting, selecting or searching failed; retried next cycle.
    Aborted(MailboxError),
    /// No unseen message matched the trigger phrase.
    NoMatches,
    /// Matching messages were processed and cleanup ran.
    Processed,
}

/// Result of the cleanup step.
///
/// The log output is the same for `NothingMatched` and `Masked` ("No emails
/// to delete."), so an operator cannot tell them apart. The distinction is
/// kept here so callers and tests can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted(usize),
    NothingMatched,
    Masked(MailboxError),
}

/// What happened to one PDF attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub message_id: u32,
    pub filename: String,
    pub spec: PrintJobSpec,
    /// Spooler job id, or `None` if staging or dispatch failed.
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub messages_found: usize,
    pub messages_fetched: usize,
    pub jobs: Vec<JobRecord>,
    pub cleanup: Option<CleanupOutcome>,
}

impl CycleReport {
    fn new(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            messages_found: 0,
            messages_fetched: 0,
            jobs: Vec::new(),
            cleanup: None,
        }
    }

    pub fn jobs_submitted(&self) -> usize {
        self.jobs.iter().filter(|job| job.job_id.is_some()).count()
    }

    pub fn jobs_failed(&self) -> usize {
        self.jobs.len() - self.jobs_submitted()
    }
}

/// Runs the print pipeline over an open mailbox session.
pub struct PrintCycle<'a> {
    settings: &'a Settings,
    staging: &'a StagingStore,
    dispatcher: &'a PrintDispatcher,
}

impl<'a> PrintCycle<'a> {
    pub fn new(settings: &'a Settings, staging: &'a StagingStore, dispatcher: &'a PrintDispatcher) -> Self {
        Self {
            settings,
            staging,
            dispatcher,
        }
    }

    /// Runs one cycle and always closes the session before returning.
    pub async fn run(&self, mailbox: &mut dyn Mailbox) -> CycleReport {
        let report = self.process(mailbox).await;
        close_session(mailbox).await;
        info!("Finished processing emails.");
        report
    }

    async fn process(&self, mailbox: &mut dyn Mailbox) -> CycleReport {
        if let Err(e) = mailbox.select_folder(&self.settings.mail_folder).await {
            error!("Error selecting folder {}: {}", self.settings.mail_folder, e);
            return CycleReport::new(CycleOutcome::Aborted(e));
        }

        info!("Searching for emails...");
        let criteria = SearchCriteria::unseen_with_subject(&self.settings.trigger_phrase);
        let ids = match mailbox.search(&criteria).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Error searching emails: {}", e);
                return CycleReport::new(CycleOutcome::Aborted(e));
            }
        };

        if ids.is_empty() {
            info!("No new emails to process.");
            return CycleReport::new(CycleOutcome::NoMatches);
        }

        info!("Found {} emails", ids.len());
        let mut report = CycleReport::new(CycleOutcome::Processed);
        report.messages_found = ids.len();

        for id in ids {
            info!("Fetching email with ID: {}", id);
            let raw = match mailbox.fetch_raw_message(id).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Error fetching mail {}: {}", id, e);
                    continue;
                }
            };
            report.messages_fetched += 1;
            self.process_message(id, &raw, &mut report.jobs).await;
        }

        let cleanup = self.delete_requests(mailbox).await;
        report.cleanup = Some(cleanup);
        report
    }

    async fn process_message(&self, id: u32, raw: &[u8], jobs: &mut Vec<JobRecord>) {
        let Some(message) = attachment::parse_message(raw) else {
            error!("Could not parse email with ID: {}", id);
            return;
        };

        let summary = attachment::describe(&message);
        info!("Email subject: {} from {}", summary.subject, summary.sender);

        let spec = PrintJobSpec::parse(&summary.subject);
        info!("Print settings: {}", spec);

        for pdf in attachment::extract(&message) {
            info!("Found PDF attachment: {}", pdf.filename);
            let job_id = self.print_attachment(&pdf, &spec).await;
            jobs.push(JobRecord {
                message_id: id,
                filename: pdf.filename,
                spec: spec.clone(),
                job_id,
            });
        }
    }

    /// Stage, dispatch, and remove the staged copy whatever the dispatch result.
    async fn print_attachment(&self, pdf: &Attachment, spec: &PrintJobSpec) -> Option<JobId> {
        let staged = match self.staging.save(&pdf.filename, &pdf.bytes) {
            Ok(staged) => staged,
            Err(e) => {
                error!("Failed to stage {}: {}", pdf.filename, e);
                return None;
            }
        };

        let job_id = match self.dispatcher.submit(staged.path(), spec).await {
            Ok(job_id) => Some(job_id),
            Err(e) => {
                error!("Failed to print {}: {}", staged.file_name(), e);
                None
            }
        };

        if let Err(e) = self.staging.delete(staged.file_name()) {
            error!("Failed to delete staged file {}: {}", staged.path().display(), e);
        }
        job_id
    }

    /// Flags every message matching the trigger phrase, read or not, and
    /// expunges. This can include messages that arrived after the search
    /// above.
    async fn delete_requests(&self, mailbox: &mut dyn Mailbox) -> CleanupOutcome {
        let outcome = match self.try_delete_requests(mailbox).await {
            Ok(0) => CleanupOutcome::NothingMatched,
            Ok(count) => CleanupOutcome::Deleted(count),
            Err(e) => {
                warn!("Cleanup failed: {}", e);
                CleanupOutcome::Masked(e)
            }
        };

        match &outcome {
            CleanupOutcome::Deleted(count) => info!("Emails deleted: {}", count),
            _ => info!("No emails to delete."),
        }
        outcome
    }

    async fn try_delete_requests(&self, mailbox: &mut dyn Mailbox) -> Result<usize, MailboxError> {
        mailbox.select_folder(&self.settings.mail_folder).await?;
        let criteria = SearchCriteria::Subject(self.settings.trigger_phrase.clone());
        let ids = mailbox.search(&criteria).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        mailbox.mark_deleted(&ids).await?;
        mailbox.expunge().await?;
        Ok(ids.len())
    }
}

async fn close_session(mailbox: &mut dyn Mailbox) {
    if let Err(e) = mailbox.close().await {
        warn!("Error closing mailbox: {}", e);
    }
    if let Err(e) = mailbox.logout().await {
        warn!("Error logging out: {}", e);
    }
}

/// Connects, runs one cycle and closes. Never fails; problems end up in the
/// log and the report.
pub async fn run_cycle(settings: &Settings, staging: &StagingStore, dispatcher: &PrintDispatcher) -> CycleReport {
    info!("--------------------");
    info!("Connecting to email server...");

    let mut mailbox = match imap::connect(settings).await {
        Ok(mailbox) => mailbox,
        Err(e) => {
            error!("Error connecting to email server: {}", e);
            return CycleReport::new(CycleOutcome::Aborted(e));
        }
    };

    PrintCycle::new(settings, staging, dispatcher)
        .run(mailbox.as_mut())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        build_message, Event, EventLog, FakeMailbox, MessagePart, RecordingPrintService,
    };
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        settings: Settings,
        staging: StagingStore,
        dispatcher: PrintDispatcher,
        events: EventLog,
    }

    fn fixture(printers: &[&str]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let settings = Settings {
            mail_user: "printer@example.com".to_string(),
            mail_pass: "secret".to_string(),
            trigger_phrase: "Print".to_string(),
            printer_name: "Office".to_string(),
            mail_folder: "INBOX/Druck".to_string(),
            staging_dir: tmp.path().join("attachments").to_string_lossy().into_owned(),
            ..Settings::default()
        };
        let events = EventLog::default();
        let service = RecordingPrintService::new(printers, events.clone());
        let dispatcher = PrintDispatcher::from_settings(Box::new(service), &settings);
        let staging = StagingStore::new(&settings.staging_dir);
        Fixture {
            _tmp: tmp,
            settings,
            staging,
            dispatcher,
            events,
        }
    }

    fn pdf(name: &str, body: &[u8]) -> MessagePart {
        MessagePart::attachment(name, "application/pdf", body)
    }

    #[tokio::test]
    async fn test_no_matches_skips_cleanup() {
        let fx = fixture(&["Office"]);
        let mut mailbox = FakeMailbox::new(fx.events.clone());

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.outcome, CycleOutcome::NoMatches);
        assert_eq!(report.cleanup, None);
        assert!(report.jobs.is_empty());
        assert_eq!(
            fx.events.snapshot(),
            vec![
                Event::Select("INBOX/Druck".to_string()),
                Event::Search("UNSEEN SUBJECT \"Print\"".to_string()),
                Event::Close,
                Event::Logout,
            ]
        );
    }

    #[tokio::test]
    async fn test_non_ascii_trigger_searches_with_utf8_charset() {
        let mut fx = fixture(&["Office"]);
        fx.settings.trigger_phrase = "Drück".to_string();
        let mut mailbox = FakeMailbox::new(fx.events.clone());

        PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert!(fx
            .events
            .snapshot()
            .contains(&Event::Search("CHARSET UTF-8 UNSEEN SUBJECT \"Drück\"".to_string())));
    }

    #[tokio::test]
    async fn test_search_failure_aborts_but_logs_out() {
        let fx = fixture(&["Office"]);
        let mut mailbox = FakeMailbox::new(fx.events.clone())
            .fail_unseen_search(MailboxError::BadResponse("SEARCH BAD".to_string()));

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(
            report.outcome,
            CycleOutcome::Aborted(MailboxError::BadResponse("SEARCH BAD".to_string()))
        );
        let events = fx.events.snapshot();
        assert!(!events.iter().any(|e| matches!(e, Event::MarkDeleted(_) | Event::Expunge)));
        assert_eq!(events.last(), Some(&Event::Logout));
    }

    #[tokio::test]
    async fn test_prints_then_deletes() {
        let fx = fixture(&["Office"]);
        let raw = build_message("Print -c=color -copies=2", "alice@example.com", &[pdf("report.pdf", b"%PDF report")]);
        let mut mailbox = FakeMailbox::new(fx.events.clone()).with_message(7, raw);

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(report.messages_found, 1);
        assert_eq!(report.jobs_submitted(), 1);
        assert_eq!(report.cleanup, Some(CleanupOutcome::Deleted(1)));

        let events = fx.events.snapshot();
        let print_pos = events.iter().position(|e| matches!(e, Event::Print { .. })).unwrap();
        let delete_pos = events.iter().position(|e| matches!(e, Event::MarkDeleted(_))).unwrap();
        assert!(print_pos < delete_pos);
        assert_eq!(events[delete_pos], Event::MarkDeleted(vec![7]));
        assert_eq!(events[delete_pos + 1], Event::Expunge);
        assert!(!fx.staging.directory().join("report.pdf").exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_only_that_message() {
        let fx = fixture(&["Office"]);
        let first = build_message("Print", "a@example.com", &[pdf("a.pdf", b"%PDF a")]);
        let second = build_message("Print", "b@example.com", &[pdf("b.pdf", b"%PDF b")]);
        let mut mailbox = FakeMailbox::new(fx.events.clone())
            .with_message(1, first)
            .with_message(2, second)
            .fail_fetch(1);

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.messages_found, 2);
        assert_eq!(report.messages_fetched, 1);
        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs[0].filename, "b.pdf");
        // both still get cleaned up
        assert_eq!(report.cleanup, Some(CleanupOutcome::Deleted(2)));
    }

    #[tokio::test]
    async fn test_print_failure_still_cleans_up() {
        let fx = fixture(&["SomeOtherPrinter"]);
        let raw = build_message("Print", "a@example.com", &[pdf("a.pdf", b"%PDF a")]);
        let mut mailbox = FakeMailbox::new(fx.events.clone()).with_message(3, raw);

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs_failed(), 1);
        assert_eq!(report.cleanup, Some(CleanupOutcome::Deleted(1)));
        assert!(!fx.staging.directory().join("a.pdf").exists());
    }

    #[tokio::test]
    async fn test_every_attachment_uses_the_same_subject() {
        let fx = fixture(&["Office"]);
        let raw = build_message(
            "Print -d=duplex",
            "a@example.com",
            &[pdf("one.pdf", b"%PDF 1"), pdf("two.pdf", b"%PDF 2")],
        );
        let mut mailbox = FakeMailbox::new(fx.events.clone()).with_message(4, raw);

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.jobs_submitted(), 2);
        assert!(report.jobs.iter().all(|job| job.spec.duplex));
    }

    #[tokio::test]
    async fn test_duplicate_filenames_in_one_message() {
        let fx = fixture(&["Office"]);
        let raw = build_message(
            "Print",
            "a@example.com",
            &[pdf("scan.pdf", b"%PDF first"), pdf("scan.pdf", b"%PDF second")],
        );
        let mut mailbox = FakeMailbox::new(fx.events.clone()).with_message(5, raw);

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.jobs_submitted(), 2);
        let printed: Vec<Vec<u8>> = fx
            .events
            .snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Print { contents, .. } => Some(contents),
                _ => None,
            })
            .collect();
        assert_eq!(printed, vec![b"%PDF first".to_vec(), b"%PDF second".to_vec()]);
    }

    #[tokio::test]
    async fn test_cleanup_error_is_masked() {
        let fx = fixture(&["Office"]);
        let raw = build_message("Print", "a@example.com", &[pdf("a.pdf", b"%PDF a")]);
        let mut mailbox = FakeMailbox::new(fx.events.clone())
            .with_message(1, raw)
            .fail_expunge(MailboxError::Operation("EXPUNGE failed".to_string()));

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert_eq!(
            report.cleanup,
            Some(CleanupOutcome::Masked(MailboxError::Operation("EXPUNGE failed".to_string())))
        );
        assert_eq!(fx.events.snapshot().last(), Some(&Event::Logout));
    }

    #[tokio::test]
    async fn test_cleanup_deletes_already_seen_matches_too() {
        let fx = fixture(&["Office"]);
        let raw = build_message("Print", "a@example.com", &[]);
        let mut mailbox = FakeMailbox::new(fx.events.clone())
            .with_message(1, raw)
            .with_seen_match(9);

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.cleanup, Some(CleanupOutcome::Deleted(2)));
        assert!(fx.events.snapshot().contains(&Event::MarkDeleted(vec![1, 9])));
    }

    #[tokio::test]
    async fn test_unparseable_message_is_skipped() {
        let fx = fixture(&["Office"]);
        let mut mailbox = FakeMailbox::new(fx.events.clone()).with_message(1, Vec::new());

        let report = PrintCycle::new(&fx.settings, &fx.staging, &fx.dispatcher)
            .run(&mut mailbox)
            .await;

        assert_eq!(report.outcome, CycleOutcome::Processed);
        assert!(report.jobs.is_empty());
        assert_eq!(report.cleanup, Some(CleanupOutcome::Deleted(1)));
    }
}
