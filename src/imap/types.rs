// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

/// IMAP SEARCH criteria used by the print cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    All,
    Unseen,
    Subject(String),
    And(Vec<SearchCriteria>),
}

impl SearchCriteria {
    /// Unread messages whose subject contains `phrase`.
    pub fn unseen_with_subject(phrase: &str) -> Self {
        SearchCriteria::And(vec![
            SearchCriteria::Unseen,
            SearchCriteria::Subject(phrase.to_string()),
        ])
    }

    /// The argument string for `SEARCH`. Criteria with non-ASCII text are
    /// prefixed with `CHARSET UTF-8`, which servers require before they will
    /// match 8-bit strings.
    pub fn to_query(&self) -> String {
        let criteria = self.to_string();
        if criteria.is_ascii() {
            criteria
        } else {
            format!("CHARSET UTF-8 {}", criteria)
        }
    }

    pub fn is_unseen_filtered(&self) -> bool {
        match self {
            SearchCriteria::Unseen => true,
            SearchCriteria::And(items) => items.iter().any(SearchCriteria::is_unseen_filtered),
            _ => false,
        }
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchCriteria::All => f.write_str("ALL"),
            SearchCriteria::Unseen => f.write_str("UNSEEN"),
            SearchCriteria::Subject(subject) => write!(f, "SUBJECT {}", quote(subject)),
            SearchCriteria::And(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" "))
            }
        }
    }
}
