//! Unified error type. Config/IO failures are startup-fatal (§7 of the
//! connection engine design); everything else on the protocol path is
//! converted to a numeric reply or a session teardown by the caller and
//! never propagates past the session boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrcError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration file has invalid contents (not parsable JSON): {0}")]
    ConfigJson(#[from] serde_json::Error),
}
