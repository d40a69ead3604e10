// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! PDF attachment extraction from fetched messages.

use log::debug;
use mail_parser::{Message, MessageParser, MimeHeaders};

pub const PDF_EXTENSION: &str = ".pdf";

/// A PDF payload pulled out of one message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename as declared by the sender.
    pub filename: String,
    /// Decoded payload.
    pub bytes: Vec<u8>,
}

/// Subject and sender of a message, for logging and directive parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub subject: String,
    pub sender: String,
}

/// Parses a raw RFC 5322 message. Returns `None` for input that does not
/// look like a message at all.
pub fn parse_message(raw: &[u8]) -> Option<Message<'_>> {
    MessageParser::default().parse(raw)
}

pub fn describe(message: &Message<'_>) -> MessageSummary {
    let sender = message
        .from()
        .and_then(|from| from.first())
        .and_then(|addr| addr.address.as_deref())
        .unwrap_or("<unknown sender>")
        .to_string();

    MessageSummary {
        subject: message.subject().unwrap_or_default().to_string(),
        sender,
    }
}

/// Whether `filename` names a PDF. The extension check ignores ASCII case so
/// that `SCAN.PDF` from scanner-generated mail is printed as well.
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.len() >= PDF_EXTENSION.len()
        && filename
            .get(filename.len() - PDF_EXTENSION.len()..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION))
}

/// Walks the parts of `message` in order and yields every PDF attachment.
///
/// Multipart containers are skipped, as is any leaf without a
/// `Content-Disposition` header; inline content is never printed. Attached
/// `message/rfc822` parts are descended into with the same rules, so a PDF in
/// a forwarded email is found too. The iterator is lazy and decodes each
/// payload only when reached.
pub fn extract<'a>(message: &'a Message<'a>) -> Box<dyn Iterator<Item = Attachment> + 'a> {
    Box::new(
        message
            .parts
            .iter()
            .flat_map(|part| -> Box<dyn Iterator<Item = Attachment> + 'a> {
                match part.message() {
                    Some(inner) => extract(inner),
                    None => Box::new(pdf_attachment(part).into_iter()),
                }
            }),
    )
}

fn pdf_attachment(part: &mail_parser::MessagePart<'_>) -> Option<Attachment> {
    if part.is_multipart() {
        return None;
    }
    part.content_disposition()?;

    let filename = part.attachment_name()?;
    if !is_pdf_filename(filename) {
        debug!("Skipping non-PDF attachment: {}", filename);
        return None;
    }

    Some(Attachment {
        filename: filename.to_string(),
        bytes: part.contents().to_vec(),
    })
}
