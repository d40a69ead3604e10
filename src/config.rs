// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use config::{Environment, File};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Append-only log file. `None` or empty logs to stderr.
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub log: LogConfig,
    pub mail_host: String,
    pub mail_port: u16,
    pub mail_tls: bool,
    pub mail_user: String,
    pub mail_pass: String,
    /// Folder holding print requests.
    pub mail_folder: String,
    /// Subject phrase that marks an email as a print request.
    pub trigger_phrase: String,
    /// Seconds to sleep between polling cycles.
    pub refresh_interval: u64,
    pub printer_name: String,
    pub job_title: String,
    pub staging_dir: String,
}

#[derive(Clone, Copy)]
enum ValueKind {
    Text,
    Port,
    Seconds,
    Flag,
}

// Direct environment variables, e.g. `MAIL_HOST=...` overrides `mail_host`.
// The SMTP_* names are kept for existing deployments.
const ENV_VARS: &[(&str, &str, ValueKind)] = &[
    ("SMTP_HOST", "mail_host", ValueKind::Text),
    ("SMTP_PORT", "mail_port", ValueKind::Port),
    ("SMTP_TLS", "mail_tls", ValueKind::Flag),
    ("SMTP_USER", "mail_user", ValueKind::Text),
    ("SMTP_PASS", "mail_pass", ValueKind::Text),
    ("MAIL_HOST", "mail_host", ValueKind::Text),
    ("MAIL_PORT", "mail_port", ValueKind::Port),
    ("MAIL_TLS", "mail_tls", ValueKind::Flag),
    ("MAIL_USER", "mail_user", ValueKind::Text),
    ("MAIL_PASS", "mail_pass", ValueKind::Text),
    ("MAIL_FOLDER", "mail_folder", ValueKind::Text),
    ("PRINT_COMMAND", "trigger_phrase", ValueKind::Text),
    ("REFRESH_INTERVAL", "refresh_interval", ValueKind::Seconds),
    ("PRINTER_NAME", "printer_name", ValueKind::Text),
    ("PRINT_JOB_TITLE", "job_title", ValueKind::Text),
    ("STAGING_DIR", "staging_dir", ValueKind::Text),
    ("LOG_FILE", "log.file", ValueKind::Text),
    ("LOG_LEVEL", "log.level", ValueKind::Text),
];

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, SettingsError> {
        let mut config_builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("log.file", "email_to_print.log")?
            .set_default("mail_host", "localhost")?
            .set_default("mail_port", 993)?
            .set_default("mail_tls", true)?
            .set_default("mail_user", "")?
            .set_default("mail_pass", "")?
            .set_default("mail_folder", "INBOX")?
            .set_default("trigger_phrase", "")?
            .set_default("refresh_interval", 60)?
            .set_default("printer_name", "")?
            .set_default("job_title", "Email Print Job")?
            .set_default("staging_dir", "attachments")?;

        if let Some(path) = config_path {
            config_builder = config_builder.add_source(File::with_name(path));
        }

        // e.g. `MAILPRINT_MAIL_HOST=...` or `MAILPRINT_LOG__LEVEL=...`
        config_builder = config_builder.add_source(
            Environment::with_prefix("MAILPRINT")
                .prefix_separator("_")
                .separator("__")
                .ignore_empty(true),
        );

        for (env_var, key, kind) in ENV_VARS {
            let Ok(value) = env::var(env_var) else {
                continue;
            };
            match kind {
                ValueKind::Port => match value.trim().parse::<u16>() {
                    Ok(port) => config_builder = config_builder.set_override(*key, port)?,
                    Err(_) => warn!("Invalid port value in {}: {}", env_var, value),
                },
                ValueKind::Seconds => match value.trim().parse::<u64>() {
                    Ok(secs) => config_builder = config_builder.set_override(*key, secs)?,
                    Err(_) => warn!("Invalid interval value in {}: {}", env_var, value),
                },
                ValueKind::Flag => match parse_flag(&value) {
                    Some(flag) => config_builder = config_builder.set_override(*key, flag)?,
                    None => warn!("Invalid boolean value in {}: {}", env_var, value),
                },
                ValueKind::Text => config_builder = config_builder.set_override(*key, value)?,
            }
        }

        Ok(config_builder.build()?.try_deserialize()?)
    }

    /// Checks the values every polling cycle depends on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let required = [
            ("mail_user", &self.mail_user),
            ("mail_pass", &self.mail_pass),
            ("trigger_phrase", &self.trigger_phrase),
            ("printer_name", &self.printer_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SettingsError::Missing(name));
            }
        }
        if self.mail_folder.trim().is_empty() {
            return Err(SettingsError::Missing("mail_folder"));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            file: Some("email_to_print.log".to_string()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            mail_host: "localhost".to_string(),
            mail_port: 993,
            mail_tls: true,
            mail_user: String::new(),
            mail_pass: String::new(),
            mail_folder: "INBOX".to_string(),
            trigger_phrase: String::new(),
            refresh_interval: 60,
            printer_name: String::new(),
            job_title: "Email Print Job".to_string(),
            staging_dir: "attachments".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load or parse configuration: {0}")]
    LoadError(#[from] config::ConfigError),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}
