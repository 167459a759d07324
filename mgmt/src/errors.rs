// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors reported by attachment operations

use config::{AttachmentIdentity, ConfigError, IdentityError, ImmutableField};
use controller::ControllerError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AttachmentError {
    /// The declaration is invalid. Nothing was sent to the controller.
    #[error("Invalid attachment: {0}")]
    Validation(#[from] ConfigError),
    #[error(transparent)]
    MalformedIdentity(#[from] IdentityError),
    /// A controller call failed. Changes applied by earlier calls of the same operation stay.
    #[error("Failed to {op} {id}: {source}")]
    Remote {
        op: &'static str,
        id: AttachmentIdentity,
        #[source]
        source: ControllerError,
    },
    /// The controller kept answering with transient errors until the retry budget ran out.
    #[error("Failed to attach {id} after {attempts} attempts: {source}")]
    RetriesExhausted {
        id: AttachmentIdentity,
        attempts: u32,
        #[source]
        source: ControllerError,
    },
    #[error("Attachment {0} not found")]
    NotFound(AttachmentIdentity),
    #[error("Attachment {id} must be recreated to change {}", list(.fields))]
    RecreateRequired {
        id: AttachmentIdentity,
        fields: Vec<ImmutableField>,
    },
}

fn list(fields: &[ImmutableField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AttachmentError {
    pub(crate) fn remote(op: &'static str, id: &AttachmentIdentity, source: ControllerError) -> Self {
        Self::Remote {
            op,
            id: id.clone(),
            source,
        }
    }

    /// The controller error at the origin of this one, if any.
    #[must_use]
    pub fn controller_error(&self) -> Option<&ControllerError> {
        match self {
            Self::Remote { source, .. } | Self::RetriesExhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let id = AttachmentIdentity::new("edge-1", "hub-1");
        let err = AttachmentError::RecreateRequired {
            id: id.clone(),
            fields: vec![ImmutableField::SpokeGwName, ImmutableField::EnableJumboFrame],
        };
        assert_eq!(
            err.to_string(),
            "Attachment edge-1~hub-1 must be recreated to change spoke_gw_name, enable_jumbo_frame"
        );
        let err = AttachmentError::RetriesExhausted {
            id: id.clone(),
            attempts: 3,
            source: ControllerError::transient("gateway not ready"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to attach edge-1~hub-1 after 3 attempts: transient controller error: gateway not ready"
        );
        assert!(err.controller_error().is_some_and(ControllerError::is_transient));
        assert_eq!(AttachmentError::NotFound(id).controller_error(), None);
    }
}
