// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Types for configuration / validation failures.
//! Any result returned by the validation or descriptor-building methods of this crate is a
//! `ConfigError`; identity parsing failures are an `IdentityError`.

use thiserror::Error;

use crate::identity::IDENTITY_FORMAT;

/// The reasons why we may reject a declared attachment before talking to the controller
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Gateway name '{0}' must not contain the identity separator '~'")]
    BadGatewayName(String),
    #[error("Invalid AS number '{0}'")]
    InvalidAsn(String),
    #[error("AS path for {0} has {1} entries, at most {max} are allowed", max = crate::aspath::AsPath::MAX_LEN)]
    AsPathTooLong(&'static str, usize),
    #[error("Insane mode tunnel count {count} out of range [{min}, {max}] ({network})")]
    TunnelCountOutOfRange {
        count: i64,
        min: i64,
        max: i64,
        network: &'static str,
    },
    #[error("Retry interval must be at least one second")]
    BadRetryInterval,
    #[error("Failed to parse attachment declaration: {0}")]
    Parse(String),
}

/// Result-like type for validations
pub type ConfigResult = Result<(), ConfigError>;

/// Failure to recover an attachment identity from its external string form
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid attachment id '{0}', expected format '{IDENTITY_FORMAT}'")]
    Malformed(String),
}

#[must_use]
pub fn stringify(conf_result: &ConfigResult) -> String {
    match conf_result {
        Ok(()) => "Ok".to_string(),
        Err(e) => format!("FAILED: {e}"),
    }
}
