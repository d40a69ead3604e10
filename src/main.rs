// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Email-to-print daemon.
//!
//! Polls the configured IMAP folder for unread messages whose subject
//! contains the trigger phrase, prints their PDF attachments and deletes the
//! requests afterwards.
//!
//! Usage:
//!   mailprint                        # Poll forever
//!   mailprint --once                 # Run a single cycle and exit
//!   mailprint --config mailprint.toml

use std::time::Duration;

use clap::Parser;
use log::{error, info};

use mailprint::config::Settings;
use mailprint::controller::run_cycle;
use mailprint::logging;
use mailprint::print::{LpPrintService, PrintDispatcher};
use mailprint::staging::StagingStore;

#[derive(Parser)]
#[command(name = "mailprint", about = "Prints PDF attachments of emails sent to a mailbox")]
struct Cli {
    /// Optional configuration file (TOML)
    #[arg(long, env = "MAILPRINT_CONFIG")]
    config: Option<String>,

    /// Run one polling cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;
    logging::init(&settings.log)?;

    if let Err(e) = settings.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    info!(
        "Starting mailprint (pid: {}): folder '{}', trigger '{}', printer '{}', every {}s",
        std::process::id(),
        settings.mail_folder,
        settings.trigger_phrase,
        settings.printer_name,
        settings.refresh_interval
    );

    let staging = StagingStore::new(&settings.staging_dir);
    let dispatcher = PrintDispatcher::from_settings(Box::new(LpPrintService::default()), &settings);
    let interval = Duration::from_secs(settings.refresh_interval);

    loop {
        let report = run_cycle(&settings, &staging, &dispatcher).await;
        info!(
            "Cycle done: {:?}, {} job(s) sent, {} failed",
            report.outcome,
            report.jobs_submitted(),
            report.jobs_failed()
        );

        if cli.once {
            break;
        }
        info!("Waiting {} seconds before the next check...", settings.refresh_interval);
        tokio::time::sleep(interval).await;
    }

    Ok(())
}
