// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Attachment identity: the external primary key of a spoke/transit attachment.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attachment::Direction;
use crate::errors::IdentityError;

/// Separator between the spoke and transit gateway names in an identity string.
pub const IDENTITY_SEPARATOR: char = '~';

/// Human readable shape of an identity string, used in error messages.
pub const IDENTITY_FORMAT: &str = "<spoke_gw_name>~<transit_gw_name>";

/// The identity of an attachment, derived from (and only from) its two endpoint names.
///
/// The string form is `spoke ~ transit`. Ordering matters: `(a, b)` and `(b, a)` are distinct
/// attachments unless `a == b`.
///
/// Names containing [`IDENTITY_SEPARATOR`] do not round-trip through [`FromStr`]. The descriptor
/// builder rejects such names, so identities minted by the reconciler always round-trip.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttachmentIdentity {
    spoke: String,
    transit: String,
}

impl AttachmentIdentity {
    #[must_use]
    pub fn new(spoke: impl Into<String>, transit: impl Into<String>) -> Self {
        Self {
            spoke: spoke.into(),
            transit: transit.into(),
        }
    }
    #[must_use]
    pub fn spoke(&self) -> &str {
        &self.spoke
    }
    #[must_use]
    pub fn transit(&self) -> &str {
        &self.transit
    }
    /// The `(from, to)` gateway names for one direction of the attachment.
    #[must_use]
    pub fn endpoints(&self, direction: Direction) -> (&str, &str) {
        match direction {
            Direction::SpokeToTransit => (&self.spoke, &self.transit),
            Direction::TransitToSpoke => (&self.transit, &self.spoke),
        }
    }
    /// Split the identity into its `(spoke, transit)` names.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.spoke, self.transit)
    }
}

impl Display for AttachmentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{IDENTITY_SEPARATOR}{}", self.spoke, self.transit)
    }
}

impl FromStr for AttachmentIdentity {
    type Err = IdentityError;

    /// Parse an identity from its external form.
    ///
    /// Exactly one separator and two non-empty names are required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(IDENTITY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(spoke), Some(transit), None) if !spoke.is_empty() && !transit.is_empty() => {
                Ok(Self::new(spoke, transit))
            }
            _ => Err(IdentityError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for AttachmentIdentity {
    type Error = IdentityError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttachmentIdentity> for String {
    fn from(value: AttachmentIdentity) -> Self {
        value.to_string()
    }
}
