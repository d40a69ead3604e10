// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::Debug;

use async_trait::async_trait;
use futures_util::io::{AsyncRead, AsyncWrite};
use futures_util::stream::TryStreamExt;
use log::debug;

use crate::imap::{error::MailboxError, types::SearchCriteria};

pub const DELETED_FLAG: &str = "\\Deleted";

/// The mailbox operations one print cycle needs.
///
/// Message ids are IMAP UIDs, so they stay valid until the final expunge.
#[async_trait]
pub trait Mailbox: Send {
    /// Selects a folder for subsequent operations
    async fn select_folder(&mut self, name: &str) -> Result<(), MailboxError>;

    /// Searches the selected folder, returning ids in ascending order
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, MailboxError>;

    /// Fetches the complete raw message for `id`
    async fn fetch_raw_message(&mut self, id: u32) -> Result<Vec<u8>, MailboxError>;

    /// Adds the \Deleted flag to every message in `ids`
    async fn mark_deleted(&mut self, ids: &[u32]) -> Result<(), MailboxError>;

    /// Permanently removes messages marked with the \Deleted flag
    async fn expunge(&mut self) -> Result<(), MailboxError>;

    /// Closes the selected folder
    async fn close(&mut self) -> Result<(), MailboxError>;

    /// Logs out the current session
    async fn logout(&mut self) -> Result<(), MailboxError>;
}

fn uid_set(ids: &[u32]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

/// [`Mailbox`] backed by an authenticated `async_imap` session over any stream.
#[derive(Debug)]
pub struct ImapMailbox<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    session: async_imap::Session<T>,
}

impl<T> ImapMailbox<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    pub fn new(session: async_imap::Session<T>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<T> Mailbox for ImapMailbox<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    async fn select_folder(&mut self, name: &str) -> Result<(), MailboxError> {
        let mailbox = self.session.select(name).await?;
        debug!("Selected {} ({} messages)", name, mailbox.exists);
        Ok(())
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>, MailboxError> {
        let query = criteria.to_query();
        let found = self.session.uid_search(&query).await?;
        let mut ids: Vec<u32> = found.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn fetch_raw_message(&mut self, id: u32) -> Result<Vec<u8>, MailboxError> {
        let fetches: Vec<_> = self
            .session
            .uid_fetch(id.to_string(), "BODY[]")
            .await?
            .try_collect()
            .await?;

        let fetch = fetches
            .into_iter()
            .next()
            .ok_or_else(|| MailboxError::MissingData(format!("No fetch result for UID {}", id)))?;
        fetch
            .body()
            .map(|body| body.to_vec())
            .ok_or_else(|| MailboxError::MissingData(format!("Message body not found for UID {}", id)))
    }

    async fn mark_deleted(&mut self, ids: &[u32]) -> Result<(), MailboxError> {
        if ids.is_empty() {
            return Ok(());
        }
        let query = format!("+FLAGS ({})", DELETED_FLAG);
        self.session
            .uid_store(uid_set(ids), &query)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(())
    }

    async fn expunge(&mut self) -> Result<(), MailboxError> {
        let removed: Vec<u32> = self.session.expunge().await?.try_collect().await?;
        debug!("Expunged {} message(s)", removed.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MailboxError> {
        self.session.close().await.map_err(MailboxError::from)
    }

    async fn logout(&mut self) -> Result<(), MailboxError> {
        self.session.logout().await.map_err(MailboxError::from)
    }
}
