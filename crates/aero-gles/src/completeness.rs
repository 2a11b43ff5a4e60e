//! Framebuffer completeness.
//!
//! The status of a framebuffer object is computed lazily and cached in its attachment record
//! until something it depends on changes (attach, detach, storage reallocation or deletion of
//! an attached object).

use tracing::trace;

use crate::attachment::Attachment;
use crate::config::{FeatureSet, SurfaceDesc};
use crate::dispatch::{ImageSource, ResolvedAttachment};
use crate::enums::AttachmentPoint;
use crate::error::ValidationError;
use crate::gl;
use crate::registry::{GpuObject, Handle, ObjectKind, ObjectRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    IncompleteDimensions,
    /// No image is attached (`GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT`).
    IncompleteEmpty,
    /// Default framebuffer of a surfaceless context.
    Undefined,
}

impl FramebufferStatus {
    pub fn to_gl(self) -> u32 {
        match self {
            Self::Complete => gl::GL_FRAMEBUFFER_COMPLETE,
            Self::IncompleteAttachment => gl::GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            Self::IncompleteDimensions => gl::GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
            Self::IncompleteEmpty => gl::GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
            Self::Undefined => gl::GL_FRAMEBUFFER_UNDEFINED,
        }
    }

    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Outcome of [`ObjectRegistry::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: FramebufferStatus,
    /// The status came from the cache rather than a recomputation.
    pub cached: bool,
}

/// Status of framebuffer 0.
pub fn default_framebuffer_status(surface: Option<&SurfaceDesc>) -> FramebufferStatus {
    match surface {
        Some(surface) if surface.width > 0 && surface.height > 0 => FramebufferStatus::Complete,
        _ => FramebufferStatus::Undefined,
    }
}

/// The single color image backing framebuffer 0.
pub fn default_surface_attachment(surface: &SurfaceDesc) -> ResolvedAttachment {
    ResolvedAttachment {
        point: AttachmentPoint::Color(0),
        source: ImageSource::DefaultSurface,
        width: surface.width,
        height: surface.height,
        samples: 0,
        format: surface.format,
        srgb_encode: false,
    }
}

impl ObjectRegistry {
    /// Returns the completeness status of `framebuffer`, recomputing only when dirty.
    pub fn evaluate(
        &mut self,
        framebuffer: Handle,
        features: FeatureSet,
    ) -> Result<Evaluation, ValidationError> {
        self.resolve_kind(framebuffer, ObjectKind::Framebuffer)?;

        if let Some(status) = self
            .graph
            .framebuffer(framebuffer)
            .and_then(|record| record.cached_status())
        {
            if let Some(record) = self.graph.framebuffer_mut(framebuffer) {
                record.record_cache_hit();
            }
            return Ok(Evaluation {
                status,
                cached: true,
            });
        }

        let status = self.compute_status(framebuffer, features);
        if let Some(record) = self.graph.framebuffer_mut(framebuffer) {
            record.store_status(status);
        }
        trace!(%framebuffer, ?status, "recomputed framebuffer completeness");
        Ok(Evaluation {
            status,
            cached: false,
        })
    }

    /// Computes the status without touching the cache.
    pub fn compute_status(&self, framebuffer: Handle, features: FeatureSet) -> FramebufferStatus {
        let Some(record) = self.graph.framebuffer(framebuffer) else {
            return FramebufferStatus::IncompleteEmpty;
        };
        if record.is_empty() {
            return FramebufferStatus::IncompleteEmpty;
        }

        let mut images = Vec::new();
        for (point, att) in record.iter() {
            match self.resolve_attachment(point, att) {
                Some(image)
                    if image.width > 0
                        && image.height > 0
                        && image.format.is_renderable_at(point, features) =>
                {
                    images.push(image)
                }
                _ => return FramebufferStatus::IncompleteAttachment,
            }
        }

        let mut color_samples = images
            .iter()
            .filter(|image| image.point.is_color())
            .map(|image| image.samples);
        if let Some(first) = color_samples.next() {
            if color_samples.any(|samples| samples != first) {
                return FramebufferStatus::IncompleteAttachment;
            }
        }

        let (width, height) = (images[0].width, images[0].height);
        if images
            .iter()
            .any(|image| image.width != width || image.height != height)
        {
            return FramebufferStatus::IncompleteDimensions;
        }

        FramebufferStatus::Complete
    }

    /// Resolves one attachment to the image it names, or `None` when the referenced object is
    /// gone, was replaced, or has no image at the attached face/level/layer.
    pub fn resolve_attachment(
        &self,
        point: AttachmentPoint,
        att: &Attachment,
    ) -> Option<ResolvedAttachment> {
        let entry = self.resolve_ref(att.object, att.generation).ok()?;
        match entry.object() {
            GpuObject::Texture(tex) => {
                let image = tex.image(att.face, att.level)?;
                if att.layer >= image.depth {
                    return None;
                }
                Some(ResolvedAttachment {
                    point,
                    source: ImageSource::Texture {
                        handle: att.object,
                        face: att.face,
                        level: att.level,
                        layer: att.layer,
                    },
                    width: image.width,
                    height: image.height,
                    samples: 0,
                    format: image.format,
                    srgb_encode: false,
                })
            }
            GpuObject::Renderbuffer(rb) => {
                let storage = rb.storage()?;
                Some(ResolvedAttachment {
                    point,
                    source: ImageSource::Renderbuffer(att.object),
                    width: storage.width,
                    height: storage.height,
                    samples: storage.samples,
                    format: storage.format,
                    srgb_encode: false,
                })
            }
            GpuObject::Framebuffer(_) | GpuObject::Program(_) => None,
        }
    }

    /// Resolved images of every attachment of `framebuffer`, skipping unresolvable ones.
    pub fn resolved_attachments(&self, framebuffer: Handle) -> Vec<ResolvedAttachment> {
        self.graph
            .framebuffer(framebuffer)
            .map(|record| {
                record
                    .iter()
                    .filter_map(|(point, att)| self.resolve_attachment(point, att))
                    .collect()
            })
            .unwrap_or_default()
    }
}
