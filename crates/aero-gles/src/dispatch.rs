//! Boundary to the executor that carries out validated commands.
//!
//! A [`Context`](crate::Context) calls into its [`Dispatcher`] only after a command passed
//! validation and its state mutation has been applied. Every callback has a no-op default so
//! executors implement only what they consume.

use crate::attachment::Attachment;
use crate::config::SurfaceDesc;
use crate::enums::{
    AttachmentPoint, Capability, ClearMask, CubeFace, DrawMode, IndexType, PixelFormat, PixelType,
};
use crate::format::{ColorSpace, InternalFormat};
use crate::registry::{Handle, ObjectKind};

/// Where an attached image lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// The window-system surface behind framebuffer 0.
    DefaultSurface,
    Texture {
        handle: Handle,
        face: Option<CubeFace>,
        level: u32,
        layer: u32,
    },
    Renderbuffer(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub point: AttachmentPoint,
    pub source: ImageSource,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub format: InternalFormat,
    /// Writes to this image go through linear → sRGB encoding.
    pub srgb_encode: bool,
}

impl ResolvedAttachment {
    pub fn color_space(&self) -> ColorSpace {
        self.format.color_space()
    }
}

/// A complete framebuffer resolved for a draw or clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    /// `Handle::NONE` for the default framebuffer.
    pub framebuffer: Handle,
    pub attachments: Vec<ResolvedAttachment>,
}

impl RenderTarget {
    pub fn color_attachments(&self) -> impl Iterator<Item = &ResolvedAttachment> + '_ {
        self.attachments.iter().filter(|att| att.point.is_color())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Arrays {
        mode: DrawMode,
        first: u32,
        count: u32,
    },
    Elements {
        mode: DrawMode,
        count: u32,
        index_type: IndexType,
        offset: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub ty: PixelType,
}

impl ReadRequest {
    /// Bytes needed to hold the tightly packed rectangle, or `None` when that overflows.
    pub fn required_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.ty.bytes_per_pixel(self.format) as usize)
    }
}

/// Storage (re)allocation of one texture image or renderbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageAllocation {
    pub object: Handle,
    pub kind: ObjectKind,
    pub face: Option<CubeFace>,
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub samples: u32,
    pub format: InternalFormat,
}

pub trait Dispatcher {
    /// Framebuffer 0 was created with `surface`.
    fn default_surface(&mut self, _surface: &SurfaceDesc) {}

    fn capability_changed(&mut self, _capability: Capability, _enabled: bool) {}

    /// `pixels` is the client data when the upload was tightly packed RGBA/UNSIGNED_BYTE.
    fn storage_allocated(&mut self, _allocation: &StorageAllocation, _pixels: Option<&[u8]>) {}

    fn object_deleted(&mut self, _handle: Handle, _kind: ObjectKind) {}

    fn attachment_changed(
        &mut self,
        _framebuffer: Handle,
        _point: AttachmentPoint,
        _attachment: Option<&Attachment>,
    ) {
    }

    fn clear(&mut self, _target: &RenderTarget, _mask: ClearMask) {}

    fn draw(&mut self, _target: &RenderTarget, _call: &DrawCall) {}

    /// `out` is at least `request.required_len()` bytes long, and that length fits `usize`.
    fn read_pixels(&mut self, _source: &ResolvedAttachment, _request: &ReadRequest, _out: &mut [u8]) {
    }
}

/// Discards every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {}

impl<D: Dispatcher + ?Sized> Dispatcher for &mut D {
    fn default_surface(&mut self, surface: &SurfaceDesc) {
        (**self).default_surface(surface)
    }

    fn capability_changed(&mut self, capability: Capability, enabled: bool) {
        (**self).capability_changed(capability, enabled)
    }

    fn storage_allocated(&mut self, allocation: &StorageAllocation, pixels: Option<&[u8]>) {
        (**self).storage_allocated(allocation, pixels)
    }

    fn object_deleted(&mut self, handle: Handle, kind: ObjectKind) {
        (**self).object_deleted(handle, kind)
    }

    fn attachment_changed(
        &mut self,
        framebuffer: Handle,
        point: AttachmentPoint,
        attachment: Option<&Attachment>,
    ) {
        (**self).attachment_changed(framebuffer, point, attachment)
    }

    fn clear(&mut self, target: &RenderTarget, mask: ClearMask) {
        (**self).clear(target, mask)
    }

    fn draw(&mut self, target: &RenderTarget, call: &DrawCall) {
        (**self).draw(target, call)
    }

    fn read_pixels(&mut self, source: &ResolvedAttachment, request: &ReadRequest, out: &mut [u8]) {
        (**self).read_pixels(source, request, out)
    }
}
