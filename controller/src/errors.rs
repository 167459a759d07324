// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors reported by the controller

use strum::Display;
use thiserror::Error;

/// Coarse classification of a controller failure. Set by the controller adapter, consumed by the
/// reconciler to decide whether to retry, give up, or treat the resource as absent.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// The remote side is still converging (e.g. a gateway is being provisioned). Retrying later
    /// may succeed.
    Transient,
    /// Anything retrying will not fix.
    Fatal,
    /// The resource addressed by the call does not exist.
    NotFound,
}

/// Message fragments the controller uses for conditions which resolve with time.
pub const TRANSIENT_MARKERS: [&str; 3] = ["not ready", "not up", "try again"];

/// Message fragments the controller uses when the addressed resource is missing.
pub const NOT_FOUND_MARKERS: [&str; 2] = ["does not exist", "not found"];

impl ErrorKind {
    /// Classify a raw controller error message.
    ///
    /// Only adapters talking to a controller which does not report structured errors should need
    /// this. Matching is case-insensitive; transient markers win over not-found ones.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
            ErrorKind::Transient
        } else if NOT_FOUND_MARKERS.iter().any(|m| message.contains(m)) {
            ErrorKind::NotFound
        } else {
            ErrorKind::Fatal
        }
    }
}

/// A failed controller call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{kind} controller error: {message}")]
pub struct ControllerError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ControllerError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
    /// Build an error from an unstructured controller message, see [`ErrorKind::classify`].
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorKind::classify(&message), message)
    }
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}
