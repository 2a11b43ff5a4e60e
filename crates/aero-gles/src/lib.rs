//! `aero-gles` is the validation and object-lifetime core of Aero's OpenGL ES 2.0/3.0
//! front end.
//!
//! The crate provides:
//! - A share-group-wide object registry with generation-checked handles
//!   (see [`ObjectRegistry`] and [`ShareGroup`]).
//! - Per-context state and a FIFO error queue behind the GL command surface (see [`Context`]).
//! - Framebuffer attachment tracking with cached completeness (see [`FramebufferStatus`]).
//! - A [`Dispatcher`] seam through which accepted commands reach an executor, plus a CPU
//!   reference executor ([`SoftwareDispatcher`]) used by the tests.
//!
//! Validation never executes anything itself: a rejected command leaves one error in the
//! queue and no other trace.

mod attachment;
mod completeness;
mod config;
mod context;
mod dispatch;
mod enums;
mod error;
mod format;
mod registry;
mod software;
mod state;
mod stats;

pub mod gl;
pub mod validation;

pub use attachment::{Attachment, AttachmentGraph, FramebufferAttachments};
pub use completeness::{Evaluation, FramebufferStatus};
pub use config::{
    ClientVersion, ConfigError, ContextConfig, Extensions, FeatureSet, Limits, SurfaceDesc,
};
pub use context::Context;
pub use dispatch::{
    Dispatcher, DrawCall, ImageSource, NullDispatcher, ReadRequest, RenderTarget,
    ResolvedAttachment, StorageAllocation,
};
pub use enums::{
    AttachmentPoint, Capability, ClampMode, ClearMask, CubeFace, DrawMode, FramebufferTarget,
    ImageTarget, IndexType, PixelFormat, PixelType, TextureTarget, VolumeTarget,
};
pub use error::{ErrorQueue, GlError, ValidationError};
pub use format::{ColorSpace, FormatClass, FormatInfo, InternalFormat, Support};
pub use registry::{
    AttachmentSource, ContextId, Destroyed, Framebuffer, GpuObject, Handle, ImageDesc,
    ObjectEntry, ObjectKind, ObjectRegistry, Program, Renderbuffer, RenderbufferStorage,
    ShareGroup, Texture,
};
pub use software::{SoftwareCounters, SoftwareDispatcher};
pub use state::{CapabilityFlags, ContextState, GenericAttrib};
pub use stats::ContextStats;
