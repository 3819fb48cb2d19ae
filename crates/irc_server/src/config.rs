//! Config provider: loads `pyrcd.json` plus the MOTD/rules text files it
//! names, relative to the directory the config file lives in.

use crate::errors::IrcError;
use chrono::{Local, TimeZone};
use serde::Deserialize;
use std::path::Path;
use std::time::UNIX_EPOCH;

#[derive(Debug, Deserialize, Clone)]
pub struct BindConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub debug: u8,
    pub fqdn: String,
    pub name: String,
    pub client_limit: usize,
    pub recv_buffer: usize,
    pub motd: String,
    pub rules: String,
}

#[derive(Debug, Deserialize, Clone)]
struct RawConfig {
    bind: BindConfig,
    server: ServerConfig,
}

/// A loaded text file plus the unix timestamp it was last modified at, used
/// for the `372`-style "last modified" display.
#[derive(Debug, Clone, Default)]
pub struct TimestampedText {
    pub content: String,
    pub modified: u64,
}

impl TimestampedText {
    /// Formats `modified` the way the original's `time.strftime("%d/%m/%Y
    /// %H:%M", ...)` rendered the MOTD/rules mtime for the leading `372`
    /// line.
    pub fn modified_display(&self) -> String {
        match Local.timestamp_opt(self.modified as i64, 0) {
            chrono::LocalResult::Single(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: BindConfig,
    pub server: ServerConfig,
    pub motd: TimestampedText,
    pub rules: TimestampedText,
}

impl Config {
    /// Loads `pyrcd.json` from `dir`, then the `motd`/`rules` files it names,
    /// read relative to the same directory. Any missing section, missing
    /// key, unparsable JSON, or unreadable file is a startup-fatal
    /// `IrcError::Config`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, IrcError> {
        let dir = dir.as_ref();
        let config_path = dir.join("pyrcd.json");
        let raw_text = std::fs::read_to_string(&config_path).map_err(|e| {
            IrcError::Config(format!("could not read '{}': {e}", config_path.display()))
        })?;
        let raw: RawConfig = serde_json::from_str(&raw_text)?;

        let motd = Self::read_timestamped(dir, &raw.server.motd)?;
        let rules = Self::read_timestamped(dir, &raw.server.rules)?;

        Ok(Config {
            bind: raw.bind,
            server: raw.server,
            motd,
            rules,
        })
    }

    fn read_timestamped(dir: &Path, filename: &str) -> Result<TimestampedText, IrcError> {
        let path = dir.join(filename);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| IrcError::Config(format!("could not read '{}': {e}", path.display())))?;
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(|t| {
                t.duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        Ok(TimestampedText { content, modified })
    }
}
