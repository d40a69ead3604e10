// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use mailprint::config::Settings;
use mailprint::controller::{CleanupOutcome, CycleOutcome, PrintCycle};
use mailprint::print::PrintDispatcher;
use mailprint::staging::StagingStore;
use mailprint::test_helpers::{
    build_message, Event, EventLog, FakeMailbox, MessagePart, RecordingPrintService,
};
use tempfile::TempDir;

fn settings(staging_dir: &std::path::Path) -> Settings {
    Settings {
        mail_user: "printer@example.com".to_string(),
        mail_pass: "secret".to_string(),
        trigger_phrase: "Print".to_string(),
        printer_name: "Office".to_string(),
        staging_dir: staging_dir.to_string_lossy().into_owned(),
        ..Settings::default()
    }
}

fn printed(events: &EventLog) -> Vec<(String, Vec<u8>, mailprint::print::PrintOptions)> {
    events
        .snapshot()
        .into_iter()
        .filter_map(|event| match event {
            Event::Print {
                file,
                contents,
                options,
                ..
            } => Some((file, contents, options)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_end_to_end_print_request() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp.path().join("attachments"));
    let events = EventLog::default();
    let staging = StagingStore::new(&settings.staging_dir);
    let dispatcher = PrintDispatcher::from_settings(
        Box::new(RecordingPrintService::new(&["Office"], events.clone())),
        &settings,
    );

    let raw = build_message(
        "Print -c=color -copies=2",
        "alice@example.com",
        &[
            MessagePart::attachment("invoice.pdf", "application/pdf", b"%PDF-1.7 invoice"),
            MessagePart::attachment("photo.jpg", "image/jpeg", b"jpeg bytes"),
        ],
    );
    let mut mailbox = FakeMailbox::new(events.clone()).with_message(42, raw);

    let report = PrintCycle::new(&settings, &staging, &dispatcher)
        .run(&mut mailbox)
        .await;

    assert_eq!(report.outcome, CycleOutcome::Processed);
    assert_eq!(report.jobs_submitted(), 1);
    assert_eq!(report.cleanup, Some(CleanupOutcome::Deleted(1)));

    let jobs = printed(&events);
    assert_eq!(jobs.len(), 1);
    let (file, contents, options) = &jobs[0];
    assert_eq!(file, "invoice.pdf");
    assert_eq!(contents, b"%PDF-1.7 invoice");
    assert_eq!(options.get("print-color-mode").map(String::as_str), Some("color"));
    assert_eq!(options.get("copies").map(String::as_str), Some("2"));
    assert_eq!(options.get("sides").map(String::as_str), Some("one-sided"));
    assert_eq!(options.get("media").map(String::as_str), Some("A4"));

    assert!(mailbox.remaining().is_empty());
    let staged: Vec<_> = std::fs::read_dir(staging.directory()).unwrap().collect();
    assert!(staged.is_empty());
}

#[tokio::test]
async fn test_second_cycle_finds_nothing() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp.path().join("attachments"));
    let events = EventLog::default();
    let staging = StagingStore::new(&settings.staging_dir);
    let dispatcher = PrintDispatcher::from_settings(
        Box::new(RecordingPrintService::new(&["Office"], events.clone())),
        &settings,
    );

    let raw = build_message(
        "Print -d=duplex",
        "bob@example.com",
        &[MessagePart::attachment("a.pdf", "application/pdf", b"%PDF a")],
    );
    let mut mailbox = FakeMailbox::new(events.clone()).with_message(1, raw);
    let cycle = PrintCycle::new(&settings, &staging, &dispatcher);

    let first = cycle.run(&mut mailbox).await;
    let second = cycle.run(&mut mailbox).await;

    assert_eq!(first.jobs_submitted(), 1);
    assert_eq!(second.outcome, CycleOutcome::NoMatches);
    assert_eq!(printed(&events).len(), 1);
}

#[tokio::test]
async fn test_session_closed_on_every_path() {
    let tmp = TempDir::new().unwrap();
    let settings = settings(&tmp.path().join("attachments"));
    let events = EventLog::default();
    let staging = StagingStore::new(&settings.staging_dir);
    let dispatcher = PrintDispatcher::from_settings(
        Box::new(RecordingPrintService::new(&[], events.clone())),
        &settings,
    );

    let raw = build_message(
        "Print",
        "carol@example.com",
        &[MessagePart::attachment("a.pdf", "application/pdf", b"%PDF a")],
    );
    let mut mailbox = FakeMailbox::new(events.clone()).with_message(1, raw);

    let report = PrintCycle::new(&settings, &staging, &dispatcher)
        .run(&mut mailbox)
        .await;

    assert_eq!(report.jobs_failed(), 1);
    let tail: Vec<Event> = events.snapshot().into_iter().rev().take(2).collect();
    assert_eq!(tail, vec![Event::Logout, Event::Close]);
}
