// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print directives carried in an email subject line.
//!
//! A subject such as `Print -c=color -copies=2 -m=Letter` is turned into a
//! [`PrintJobSpec`]. Tokens may appear in any order and anywhere in the
//! subject; anything that is not a recognised token is ignored.

use std::fmt;

/// Presence of this token switches the job to color.
pub const COLOR_TOKEN: &str = "-c=color";
/// Presence of this token switches the job to long-edge duplex.
pub const DUPLEX_TOKEN: &str = "-d=duplex";
pub const COPIES_PREFIX: &str = "-copies=";
pub const PAGE_RANGES_PREFIX: &str = "-p=";
pub const MEDIA_PREFIX: &str = "-m=";

pub const DEFAULT_MEDIA: &str = "A4";

/// Printing options derived from one email subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJobSpec {
    pub monochrome: bool,
    pub duplex: bool,
    /// Always at least 1.
    pub copies: u32,
    /// Raw driver syntax such as `1-3,5`, passed through unvalidated.
    pub page_ranges: Option<String>,
    pub media_size: String,
}

impl Default for PrintJobSpec {
    fn default() -> Self {
        Self {
            monochrome: true,
            duplex: false,
            copies: 1,
            page_ranges: None,
            media_size: DEFAULT_MEDIA.to_string(),
        }
    }
}

impl PrintJobSpec {
    /// Parses the directive tokens out of `subject`.
    ///
    /// Never fails: malformed or missing tokens fall back to the defaults
    /// (monochrome, single-sided, one copy, no page range, A4).
    pub fn parse(subject: &str) -> Self {
        let defaults = Self::default();

        let copies = token_value(subject, COPIES_PREFIX)
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|copies| *copies >= 1)
            .unwrap_or(defaults.copies);

        Self {
            monochrome: !subject.contains(COLOR_TOKEN),
            duplex: subject.contains(DUPLEX_TOKEN),
            copies,
            page_ranges: token_value(subject, PAGE_RANGES_PREFIX).map(str::to_string),
            media_size: token_value(subject, MEDIA_PREFIX)
                .map(str::to_string)
                .unwrap_or(defaults.media_size),
        }
    }
}

impl fmt::Display for PrintJobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} cop{}, media {}",
            if self.monochrome { "monochrome" } else { "color" },
            if self.duplex { "duplex" } else { "simplex" },
            self.copies,
            if self.copies == 1 { "y" } else { "ies" },
            self.media_size
        )?;
        if let Some(ranges) = &self.page_ranges {
            write!(f, ", pages {}", ranges)?;
        }
        Ok(())
    }
}

/// Returns the text following the first occurrence of `prefix`, up to the
/// next whitespace. An empty value counts as absent.
fn token_value<'a>(subject: &'a str, prefix: &str) -> Option<&'a str> {
    let start = subject.find(prefix)? + prefix.len();
    subject[start..]
        .split(char::is_whitespace)
        .next()
        .filter(|value| !value.is_empty())
}
