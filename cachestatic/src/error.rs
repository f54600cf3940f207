//! Error types for optional writer capabilities.

use std::fmt;
use std::io;

use thiserror::Error;

/// Optional transport capability a [`ResponseWriter`] may expose.
///
/// [`ResponseWriter`]: crate::ResponseWriter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Streaming flush of buffered body bytes.
    Flush,
    /// Notification that the client went away.
    CloseNotify,
    /// Server push of an associated resource.
    Push,
    /// Taking over the underlying connection.
    Hijack,
}

impl Capability {
    /// Returns the capability name as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::Flush => "flush",
            Capability::CloseNotify => "close-notify",
            Capability::Push => "push",
            Capability::Hijack => "hijack",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by capability calls on a response writer.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The underlying writer does not provide this capability.
    #[error("{0} is not supported by the underlying response writer")]
    NotSupported(Capability),

    /// The capability exists but the transport failed while using it.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CapabilityError {
    /// Returns `true` if the error reports a missing capability.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, CapabilityError::NotSupported(_))
    }
}
