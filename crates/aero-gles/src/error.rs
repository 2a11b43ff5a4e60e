use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::completeness::FramebufferStatus;
use crate::gl;
use crate::registry::{Handle, ObjectKind};

/// Error kinds recorded into a context's error queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    /// Stale or unknown object reference. Reported to GL clients as `GL_INVALID_OPERATION`.
    InvalidHandle,
    InvalidFramebufferOperation,
    OutOfMemory,
}

impl GlError {
    pub fn code(self) -> u32 {
        match self {
            Self::InvalidEnum => gl::GL_INVALID_ENUM,
            Self::InvalidValue => gl::GL_INVALID_VALUE,
            Self::InvalidOperation | Self::InvalidHandle => gl::GL_INVALID_OPERATION,
            Self::InvalidFramebufferOperation => gl::GL_INVALID_FRAMEBUFFER_OPERATION,
            Self::OutOfMemory => gl::GL_OUT_OF_MEMORY,
        }
    }
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidEnum => "GL_INVALID_ENUM",
            Self::InvalidValue => "GL_INVALID_VALUE",
            Self::InvalidOperation => "GL_INVALID_OPERATION",
            Self::InvalidHandle => "GL_INVALID_OPERATION (invalid handle)",
            Self::InvalidFramebufferOperation => "GL_INVALID_FRAMEBUFFER_OPERATION",
            Self::OutOfMemory => "GL_OUT_OF_MEMORY",
        };
        f.write_str(name)
    }
}

/// Detailed cause of a rejected command. Only [`ValidationError::kind`] reaches the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{what} 0x{value:04X} is not a recognized enumerant")]
    UnknownEnum { what: &'static str, value: u32 },
    #[error("capability 0x{0:04X} is not supported by this context")]
    UnsupportedCapability(u32),
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: i64 },
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    #[error("object {0} does not name a live object")]
    InvalidHandle(Handle),
    #[error("object {handle} is a {found:?}, expected {expected:?}")]
    TypeMismatch {
        handle: Handle,
        expected: ObjectKind,
        found: ObjectKind,
    },
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("framebuffer {framebuffer} is not complete ({status:?})")]
    FramebufferIncomplete {
        framebuffer: Handle,
        status: FramebufferStatus,
    },
    #[error("out of memory: {0}")]
    OutOfMemory(&'static str),
}

impl ValidationError {
    pub fn kind(&self) -> GlError {
        match self {
            Self::UnknownEnum { .. } | Self::UnsupportedCapability(_) => GlError::InvalidEnum,
            Self::OutOfRange { .. } | Self::InvalidValue(_) => GlError::InvalidValue,
            Self::InvalidHandle(_) => GlError::InvalidHandle,
            Self::TypeMismatch { .. } | Self::InvalidOperation(_) => GlError::InvalidOperation,
            Self::FramebufferIncomplete { .. } => GlError::InvalidFramebufferOperation,
            Self::OutOfMemory(_) => GlError::OutOfMemory,
        }
    }

    pub(crate) fn unknown_enum(what: &'static str, value: u32) -> Self {
        Self::UnknownEnum { what, value }
    }

    pub(crate) fn out_of_range(what: &'static str, value: impl Into<i64>) -> Self {
        Self::OutOfRange {
            what,
            value: value.into(),
        }
    }
}

/// Per-context FIFO of pending errors.
///
/// Every recorded error is retained in order; nothing is coalesced.
#[derive(Debug, Default, Clone)]
pub struct ErrorQueue {
    pending: VecDeque<GlError>,
}

impl ErrorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: GlError) {
        self.pending.push_back(error);
    }

    pub fn pop(&mut self) -> Option<GlError> {
        self.pending.pop_front()
    }

    pub fn peek(&self) -> Option<GlError> {
        self.pending.front().copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = GlError> + '_ {
        self.pending.iter().copied()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_drains_in_fifo_order_without_coalescing() {
        let mut queue = ErrorQueue::new();
        queue.push(GlError::InvalidEnum);
        queue.push(GlError::InvalidValue);
        queue.push(GlError::InvalidEnum);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek(), Some(GlError::InvalidEnum));
        assert_eq!(queue.pop(), Some(GlError::InvalidEnum));
        assert_eq!(queue.peek(), Some(GlError::InvalidValue));
        assert_eq!(queue.pop(), Some(GlError::InvalidValue));
        assert_eq!(queue.pop(), Some(GlError::InvalidEnum));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn invalid_handle_surfaces_as_invalid_operation() {
        let err = ValidationError::InvalidHandle(Handle(7));
        assert_eq!(err.kind(), GlError::InvalidHandle);
        assert_eq!(err.kind().code(), gl::GL_INVALID_OPERATION);
        assert_eq!(err.to_string(), "object 7 does not name a live object");
    }

    #[test]
    fn incomplete_framebuffer_maps_to_framebuffer_operation() {
        let err = ValidationError::FramebufferIncomplete {
            framebuffer: Handle(3),
            status: FramebufferStatus::IncompleteEmpty,
        };
        assert_eq!(err.kind().code(), gl::GL_INVALID_FRAMEBUFFER_OPERATION);
    }
}
