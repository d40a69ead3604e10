// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Library core for mailprint.

// --- Modules ---
pub mod attachment;
pub mod config;
pub mod controller;
pub mod directive;
pub mod imap;
pub mod logging;
pub mod print;
pub mod staging;

// Public so integration tests can share the fakes
pub mod test_helpers;

pub mod prelude {
    // Config
    pub use crate::config::{LogConfig, Settings, SettingsError};

    // Pipeline
    pub use crate::attachment::{Attachment, MessageSummary};
    pub use crate::controller::{run_cycle, CleanupOutcome, CycleOutcome, CycleReport, PrintCycle};
    pub use crate::directive::PrintJobSpec;
    pub use crate::staging::{StagedFile, StagingError, StagingStore};

    // IMAP
    pub use crate::imap::{Mailbox, MailboxError, SearchCriteria};

    // Printing
    pub use crate::print::{JobId, LpPrintService, PrintDispatcher, PrintError, PrintService};

    // Common Libs
    pub use log::{debug, error, info, trace, warn};
}
