// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Test helpers module
/// Provides message fixtures and in-memory fakes for the mailbox and spooler
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::imap::{Mailbox, MailboxError, SearchCriteria};
use crate::print::{JobId, PrintError, PrintOptions, PrintService};

const BOUNDARY: &str = "mailprint-test-boundary";
const FORWARDED_BOUNDARY: &str = "mailprint-forwarded-boundary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferEncoding {
    SevenBit,
    Base64,
}

/// One part of a fixture message.
#[derive(Debug, Clone)]
pub struct MessagePart {
    filename: String,
    content_type: String,
    body: Vec<u8>,
    disposition: bool,
    encoding: TransferEncoding,
}

impl MessagePart {
    /// A 7bit part with `Content-Disposition: attachment`.
    pub fn attachment(filename: &str, content_type: &str, body: &[u8]) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            body: body.to_vec(),
            disposition: true,
            encoding: TransferEncoding::SevenBit,
        }
    }

    /// An attachment sent base64-encoded, as mail clients send binary files.
    pub fn base64_attachment(filename: &str, content_type: &str, body: &[u8]) -> Self {
        Self {
            encoding: TransferEncoding::Base64,
            ..Self::attachment(filename, content_type, body)
        }
    }

    /// A named part without any Content-Disposition header.
    pub fn inline(filename: &str, content_type: &str, body: &[u8]) -> Self {
        Self {
            disposition: false,
            ..Self::attachment(filename, content_type, body)
        }
    }

    /// A complete email attached as `message/rfc822`, as "forward as
    /// attachment" produces. Only one level of nesting is supported.
    pub fn forwarded(subject: &str, from: &str, parts: &[MessagePart]) -> Self {
        let inner = render_message(subject, from, parts, FORWARDED_BOUNDARY);
        Self::attachment("forwarded.eml", "message/rfc822", &inner)
    }
}

fn line(raw: &mut Vec<u8>, text: &str) {
    raw.extend_from_slice(text.as_bytes());
    raw.extend_from_slice(b"\r\n");
}

/// Builds a multipart/mixed message with a short text body followed by `parts`.
/// 7bit bodies should be plain ASCII without CRLF runs.
pub fn build_message(subject: &str, from: &str, parts: &[MessagePart]) -> Vec<u8> {
    render_message(subject, from, parts, BOUNDARY)
}

fn render_message(subject: &str, from: &str, parts: &[MessagePart], boundary: &str) -> Vec<u8> {
    let mut raw = Vec::new();

    line(&mut raw, &format!("From: <{}>", from));
    line(&mut raw, "To: <printer@example.com>");
    line(&mut raw, &format!("Subject: {}", subject));
    line(&mut raw, "Date: Mon, 6 Jan 2025 09:30:00 +0100");
    line(&mut raw, "Message-ID: <fixture@example.com>");
    line(&mut raw, "MIME-Version: 1.0");
    line(&mut raw, &format!("Content-Type: multipart/mixed; boundary=\"{}\"", boundary));
    line(&mut raw, "");

    line(&mut raw, &format!("--{}", boundary));
    line(&mut raw, "Content-Type: text/plain; charset=us-ascii");
    line(&mut raw, "");
    line(&mut raw, "Please print the attached files.");

    for part in parts {
        line(&mut raw, &format!("--{}", boundary));
        line(
            &mut raw,
            &format!("Content-Type: {}; name=\"{}\"", part.content_type, part.filename),
        );
        if part.disposition {
            line(
                &mut raw,
                &format!("Content-Disposition: attachment; filename=\"{}\"", part.filename),
            );
        }
        match part.encoding {
            TransferEncoding::SevenBit => {
                line(&mut raw, "Content-Transfer-Encoding: 7bit");
                line(&mut raw, "");
                raw.extend_from_slice(&part.body);
                raw.extend_from_slice(b"\r\n");
            }
            TransferEncoding::Base64 => {
                line(&mut raw, "Content-Transfer-Encoding: base64");
                line(&mut raw, "");
                let encoded = STANDARD.encode(&part.body);
                // RFC 2045 limits encoded lines to 76 characters
                for chunk in encoded.as_bytes().chunks(76) {
                    raw.extend_from_slice(chunk);
                    raw.extend_from_slice(b"\r\n");
                }
            }
        }
    }

    line(&mut raw, &format!("--{}--", boundary));
    raw
}

/// Everything the fakes observed, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Select(String),
    Search(String),
    Fetch(u32),
    MarkDeleted(Vec<u32>),
    Expunge,
    Close,
    Logout,
    Print {
        printer: String,
        file: String,
        contents: Vec<u8>,
        options: PrintOptions,
    },
}

/// Shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// In-memory [`Mailbox`].
///
/// Messages added with [`FakeMailbox::with_message`] start unread. A successful
/// fetch marks them read, like `BODY[]` does on a real server. Searches with an
/// UNSEEN term return the unread ones; plain subject searches return every
/// message plus any extra read matches. Expunge removes whatever was marked.
#[derive(Debug)]
pub struct FakeMailbox {
    events: EventLog,
    messages: BTreeMap<u32, Vec<u8>>,
    seen: BTreeSet<u32>,
    marked: BTreeSet<u32>,
    failing_fetches: HashSet<u32>,
    unseen_search_error: Option<MailboxError>,
    expunge_error: Option<MailboxError>,
}

impl FakeMailbox {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            messages: BTreeMap::new(),
            seen: BTreeSet::new(),
            marked: BTreeSet::new(),
            failing_fetches: HashSet::new(),
            unseen_search_error: None,
            expunge_error: None,
        }
    }

    pub fn with_message(mut self, id: u32, raw: Vec<u8>) -> Self {
        self.messages.insert(id, raw);
        self
    }

    /// A matching message that was already read before the cycle.
    pub fn with_seen_match(mut self, id: u32) -> Self {
        self.messages.insert(id, Vec::new());
        self.seen.insert(id);
        self
    }

    pub fn fail_fetch(mut self, id: u32) -> Self {
        self.failing_fetches.insert(id);
        self
    }

    pub fn fail_unseen_search(mut self, error: MailboxError) -> Self {
        self.unseen_search_error = Some(error);
        self
    }

    pub fn fail_expunge(mut self, error: MailboxError) -> Self {
        self.expunge_error = Some(error);
        self
    }

    /// Ids still present in the folder.
    pub fn remaining(&self) -> Vec<u32> {
        self.messages.keys().copied().collect()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn select_folder(&mut self, name: &str) -> Result<(), MailboxError> {
        self.events.push(Event::Select(name.to_string()));
        Ok(())
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, MailboxError> {
        self.events.push(Event::Search(criteria.to_query()));
        if !criteria.is_unseen_filtered() {
            return Ok(self.remaining());
        }
        if let Some(error) = &self.unseen_search_error {
            return Err(error.clone());
        }
        Ok(self
            .messages
            .keys()
            .filter(|id| !self.seen.contains(id))
            .copied()
            .collect())
    }

    async fn fetch_raw_message(&mut self, id: u32) -> Result<Vec<u8>, MailboxError> {
        self.events.push(Event::Fetch(id));
        if self.failing_fetches.contains(&id) {
            return Err(MailboxError::Fetch(format!("FETCH failed for UID {}", id)));
        }
        let raw = self
            .messages
            .get(&id)
            .cloned()
            .ok_or_else(|| MailboxError::MissingData(format!("No fetch result for UID {}", id)))?;
        self.seen.insert(id);
        Ok(raw)
    }

    async fn mark_deleted(&mut self, ids: &[u32]) -> Result<(), MailboxError> {
        self.events.push(Event::MarkDeleted(ids.to_vec()));
        self.marked.extend(ids.iter().copied());
        Ok(())
    }

    async fn expunge(&mut self) -> Result<(), MailboxError> {
        self.events.push(Event::Expunge);
        if let Some(error) = &self.expunge_error {
            return Err(error.clone());
        }
        for id in std::mem::take(&mut self.marked) {
            self.messages.remove(&id);
            self.seen.remove(&id);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MailboxError> {
        self.events.push(Event::Close);
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), MailboxError> {
        self.events.push(Event::Logout);
        Ok(())
    }
}

/// [`PrintService`] that records every job instead of spooling it.
///
/// The staged file is read at submission time, since it is deleted right after.
#[derive(Debug)]
pub struct RecordingPrintService {
    printers: Vec<String>,
    events: EventLog,
    next_job: AtomicU32,
}

impl RecordingPrintService {
    pub fn new(printers: &[&str], events: EventLog) -> Self {
        Self {
            printers: printers.iter().map(|name| name.to_string()).collect(),
            events,
            next_job: AtomicU32::new(1),
        }
    }
}

#[async_trait]
impl PrintService for RecordingPrintService {
    async fn printers(&self) -> Result<Vec<String>, PrintError> {
        Ok(self.printers.clone())
    }

    async fn print_file(
        &self,
        printer: &str,
        file: &Path,
        _title: &str,
        options: &PrintOptions,
    ) -> Result<JobId, PrintError> {
        let contents = tokio::fs::read(file).await?;
        self.events.push(Event::Print {
            printer: printer.to_string(),
            file: file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            contents,
            options: options.clone(),
        });
        let n = self.next_job.fetch_add(1, Ordering::SeqCst);
        Ok(JobId(format!("{}-{}", printer, n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_mailbox_marks_fetched_as_seen() {
        let events = EventLog::default();
        let mut mailbox = FakeMailbox::new(events.clone())
            .with_message(1, b"raw".to_vec())
            .with_message(2, b"raw".to_vec());

        let unseen = SearchCriteria::unseen_with_subject("Print");
        assert_eq!(mailbox.search(&unseen).await.unwrap(), vec![1, 2]);
        mailbox.fetch_raw_message(1).await.unwrap();
        assert_eq!(mailbox.search(&unseen).await.unwrap(), vec![2]);

        mailbox.mark_deleted(&[1]).await.unwrap();
        mailbox.expunge().await.unwrap();
        assert_eq!(mailbox.remaining(), vec![2]);
        assert_eq!(events.snapshot().len(), 5);
    }
}
