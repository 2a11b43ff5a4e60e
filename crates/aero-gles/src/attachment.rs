//! Framebuffer attachment records and the object → framebuffer back-reference index.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;

use crate::completeness::FramebufferStatus;
use crate::enums::{AttachmentPoint, CubeFace};
use crate::registry::{Handle, ObjectKind};

/// One attachment slot's content. The generation is the object's generation at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub object: Handle,
    pub kind: ObjectKind,
    pub generation: u32,
    pub face: Option<CubeFace>,
    pub level: u32,
    pub layer: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FramebufferAttachments {
    points: BTreeMap<AttachmentPoint, Attachment>,
    /// `None` while dirty.
    cached: Option<FramebufferStatus>,
    recomputations: u64,
    cache_hits: u64,
}

impl FramebufferAttachments {
    pub fn get(&self, point: AttachmentPoint) -> Option<&Attachment> {
        self.points.get(&point)
    }

    /// Attachments in attachment-point order (colors first).
    pub fn iter(&self) -> impl Iterator<Item = (AttachmentPoint, &Attachment)> + '_ {
        self.points.iter().map(|(point, att)| (*point, att))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.cached.is_none()
    }

    pub fn cached_status(&self) -> Option<FramebufferStatus> {
        self.cached
    }

    /// Number of times completeness was computed rather than served from cache.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.cached = None;
    }

    pub(crate) fn store_status(&mut self, status: FramebufferStatus) {
        self.cached = Some(status);
        self.recomputations += 1;
    }

    pub(crate) fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentGraph {
    framebuffers: HashMap<Handle, FramebufferAttachments>,
    back_refs: HashMap<Handle, BTreeSet<(Handle, AttachmentPoint)>>,
}

impl AttachmentGraph {
    pub fn framebuffer(&self, framebuffer: Handle) -> Option<&FramebufferAttachments> {
        self.framebuffers.get(&framebuffer)
    }

    pub(crate) fn framebuffer_mut(
        &mut self,
        framebuffer: Handle,
    ) -> Option<&mut FramebufferAttachments> {
        self.framebuffers.get_mut(&framebuffer)
    }

    pub fn attachment(&self, framebuffer: Handle, point: AttachmentPoint) -> Option<&Attachment> {
        self.framebuffers.get(&framebuffer)?.get(point)
    }

    /// Every (framebuffer, point) currently attaching `object`, in order.
    pub fn referencing(&self, object: Handle) -> Vec<(Handle, AttachmentPoint)> {
        self.back_refs
            .get(&object)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert_framebuffer(&mut self, framebuffer: Handle) {
        self.framebuffers.entry(framebuffer).or_default();
    }

    /// Drops a framebuffer and the back-references its attachments held.
    pub(crate) fn remove_framebuffer(&mut self, framebuffer: Handle) {
        let Some(record) = self.framebuffers.remove(&framebuffer) else {
            return;
        };
        for (point, att) in record.points {
            self.unlink(att.object, framebuffer, point);
        }
    }

    /// Replaces the attachment at `point` and marks the framebuffer dirty, even when the new
    /// attachment equals the old one. Returns the previous attachment.
    pub(crate) fn set(
        &mut self,
        framebuffer: Handle,
        point: AttachmentPoint,
        attachment: Option<Attachment>,
    ) -> Option<Attachment> {
        let record = self.framebuffers.entry(framebuffer).or_default();
        record.mark_dirty();
        let previous = match attachment {
            Some(att) => record.points.insert(point, att),
            None => record.points.remove(&point),
        };

        if let Some(old) = previous {
            self.unlink(old.object, framebuffer, point);
        }
        if let Some(att) = attachment {
            self.back_refs
                .entry(att.object)
                .or_default()
                .insert((framebuffer, point));
        }
        previous
    }

    /// Removes `object` from every attachment point that holds it and marks those
    /// framebuffers dirty.
    pub(crate) fn detach_object(&mut self, object: Handle) -> Vec<(Handle, AttachmentPoint)> {
        let Some(refs) = self.back_refs.remove(&object) else {
            return Vec::new();
        };
        for (framebuffer, point) in &refs {
            if let Some(record) = self.framebuffers.get_mut(framebuffer) {
                record.points.remove(point);
                record.mark_dirty();
            }
        }
        refs.into_iter().collect()
    }

    /// Marks dirty every framebuffer attaching `object`. Returns how many were affected.
    pub(crate) fn invalidate_object(&mut self, object: Handle) -> usize {
        let Some(refs) = self.back_refs.get(&object) else {
            return 0;
        };
        let mut seen = BTreeSet::new();
        for (framebuffer, _) in refs {
            if seen.insert(*framebuffer) {
                if let Some(record) = self.framebuffers.get_mut(framebuffer) {
                    record.mark_dirty();
                }
            }
        }
        seen.len()
    }

    fn unlink(&mut self, object: Handle, framebuffer: Handle, point: AttachmentPoint) {
        if let Some(set) = self.back_refs.get_mut(&object) {
            set.remove(&(framebuffer, point));
            if set.is_empty() {
                self.back_refs.remove(&object);
            }
        }
    }
}
