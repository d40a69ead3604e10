// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_imap::{Client as AsyncImapClient, Session as AsyncImapSession};
use futures_util::io::{AsyncRead, AsyncWrite};
use rustls_pki_types::ServerName as PkiServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream as TokioTcpStream;
use tokio::time::timeout;
use tokio_rustls::{client::TlsStream as TokioTlsStreamClient, TlsConnector};
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::config::Settings;
use crate::imap::error::MailboxError;
use crate::imap::session::{ImapMailbox, Mailbox};

// --- Type Aliases ---

type BaseTcpStream = TokioTcpStream;
type BaseTlsStream = TokioTlsStreamClient<BaseTcpStream>;

/// Plain TCP stream adapted for async_imap.
pub type PlainStream = Compat<BaseTcpStream>;
/// TLS stream adapted for async_imap.
pub type TlsStream = Compat<BaseTlsStream>;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

// --- Internal Connection Logic ---

fn tls_connector() -> Result<TlsConnector, MailboxError> {
    let mut root_cert_store = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs()?;
    let (added, ignored) = root_cert_store.add_parsable_certificates(certs);
    log::debug!("Loaded {} native certs, ignored {}.", added, ignored);
    if root_cert_store.is_empty() {
        log::warn!("Root certificate store is empty after loading native certs.");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Establishes the TCP connection and performs the TLS handshake.
async fn setup_tls_stream(host: &str, port: u16) -> Result<BaseTlsStream, MailboxError> {
    let server_name: PkiServerName<'static> = PkiServerName::try_from(host.to_string())
        .map_err(|_| MailboxError::Connection(format!("Invalid server name format: {}", host)))?;
    let connector = tls_connector()?;

    log::debug!("Attempting TCP connection to {}:{}...", host, port);
    let tcp_stream = BaseTcpStream::connect((host, port)).await?;
    log::debug!("TCP connected. Performing TLS handshake...");

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| MailboxError::Tls(e.to_string()))?;
    log::debug!("TLS handshake successful.");
    Ok(tls_stream)
}

/// Performs IMAP login over an already established stream.
async fn perform_imap_login<T>(
    stream: T,
    username: &str,
    password: &str,
) -> Result<AsyncImapSession<T>, MailboxError>
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    let client = AsyncImapClient::new(stream);
    log::debug!("IMAP client created. Attempting login for user '{}'...", username);

    match timeout(LOGIN_TIMEOUT, client.login(username, password)).await {
        Ok(Ok(session)) => {
            log::info!("IMAP login successful for user: {}", username);
            Ok(session)
        }
        Ok(Err((e, _client))) => {
            log::error!("IMAP login failed for user {}: {:?}", username, e);
            Err(MailboxError::Auth(e.to_string()))
        }
        Err(_) => {
            log::error!("IMAP login timed out for user {} after {:?}", username, LOGIN_TIMEOUT);
            Err(MailboxError::Timeout("Login timed out".to_string()))
        }
    }
}

// --- Public API ---

/// Connects and logs in over TLS.
pub async fn connect_tls(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
) -> Result<ImapMailbox<TlsStream>, MailboxError> {
    let tls_stream = setup_tls_stream(host, port).await?;
    let session = perform_imap_login(tls_stream.compat(), username, password).await?;
    Ok(ImapMailbox::new(session))
}

/// Connects and logs in over plain TCP.
pub async fn connect_plain(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
) -> Result<ImapMailbox<PlainStream>, MailboxError> {
    log::debug!("Attempting plain TCP connection to {}:{}...", host, port);
    let tcp_stream = BaseTcpStream::connect((host, port)).await?;
    let session = perform_imap_login(tcp_stream.compat(), username, password).await?;
    Ok(ImapMailbox::new(session))
}

/// Opens an authenticated mailbox session as described by `settings`.
pub async fn connect(settings: &Settings) -> Result<Box<dyn Mailbox>, MailboxError> {
    log::info!(
        "Connecting to {}:{} as '{}' (tls: {})",
        settings.mail_host,
        settings.mail_port,
        settings.mail_user,
        settings.mail_tls
    );

    let mailbox: Box<dyn Mailbox> = if settings.mail_tls {
        Box::new(
            connect_tls(&settings.mail_host, settings.mail_port, &settings.mail_user, &settings.mail_pass)
                .await?,
        )
    } else {
        Box::new(
            connect_plain(&settings.mail_host, settings.mail_port, &settings.mail_user, &settings.mail_pass)
                .await?,
        )
    };
    Ok(mailbox)
}
