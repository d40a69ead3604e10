// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fs::OpenOptions;
use std::io::{self, Write};

use env_logger::{Builder, Env, Target};

use crate::config::LogConfig;

/// Installs the global logger.
///
/// `RUST_LOG` still wins over the configured level. Records go to the
/// configured file in append mode, or to stderr when no file is set.
pub fn init(config: &LogConfig) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::new().default_filter_or(config.level.as_str()));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {} {}",
            chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = config.file.as_deref().filter(|path| !path.trim().is_empty()) {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    // A logger may already be installed (tests, embedding); it is kept.
    if let Err(e) = builder.try_init() {
        log::warn!(
            "Logger already installed; records meant for {} go to it instead: {}",
            config.file.as_deref().unwrap_or("stderr"),
            e
        );
    }
    Ok(())
}
