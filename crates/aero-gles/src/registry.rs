//! Handle allocation and object lifetime for a share group.
//!
//! Handles are never reused. Deleting an object removes its entry, so references captured
//! before the delete (attachments, client handles) fail to resolve instead of reaching some
//! newer object. The generation stamped into an attachment guards the same way against a
//! stale reference held across a delete.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::attachment::{Attachment, AttachmentGraph};
use crate::enums::{AttachmentPoint, CubeFace, TextureTarget};
use crate::error::ValidationError;
use crate::format::{ColorSpace, InternalFormat};

/// Opaque object name. `Handle::NONE` (0) means "unbound"/"detached".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Handle(pub u32);

impl Handle {
    pub const NONE: Handle = Handle(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for Handle {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Texture,
    Renderbuffer,
    Framebuffer,
    Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub(crate) u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    /// Depth for 3D textures, layer count for 2D arrays, 1 otherwise.
    pub depth: u32,
    pub format: InternalFormat,
}

impl ImageDesc {
    pub fn color_space(&self) -> ColorSpace {
        self.format.color_space()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub(crate) target: Option<TextureTarget>,
    /// (cube face index, mip level) -> image. Non-cube textures use face 0.
    pub(crate) images: BTreeMap<(u8, u32), ImageDesc>,
    pub(crate) immutable: bool,
}

impl Texture {
    pub fn target(&self) -> Option<TextureTarget> {
        self.target
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn image(&self, face: Option<CubeFace>, level: u32) -> Option<&ImageDesc> {
        let face = face.map_or(0, CubeFace::index);
        self.images.get(&(face, level))
    }

    pub fn has_storage(&self) -> bool {
        !self.images.is_empty()
    }

    /// Highest mip level with an image on `face`, if any.
    pub fn max_level(&self, face: Option<CubeFace>) -> Option<u32> {
        let face = face.map_or(0, CubeFace::index);
        self.images
            .keys()
            .filter(|(f, _)| *f == face)
            .map(|(_, level)| *level)
            .max()
    }

    /// Format shared by the texture's images. Storage formats are never mixed by
    /// `tex_storage_*`; for mutable textures the base level wins.
    pub fn format(&self) -> Option<InternalFormat> {
        self.images.values().next().map(|image| image.format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderbufferStorage {
    pub format: InternalFormat,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Renderbuffer {
    pub(crate) storage: Option<RenderbufferStorage>,
}

impl Renderbuffer {
    pub fn storage(&self) -> Option<&RenderbufferStorage> {
        self.storage.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub(crate) owner: ContextId,
}

impl Framebuffer {
    pub fn owner(&self) -> ContextId {
        self.owner
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {}

#[derive(Debug, Clone)]
pub enum GpuObject {
    Texture(Texture),
    Renderbuffer(Renderbuffer),
    Framebuffer(Framebuffer),
    Program(Program),
}

impl GpuObject {
    fn new(kind: ObjectKind, owner: ContextId) -> Self {
        match kind {
            ObjectKind::Texture => Self::Texture(Texture::default()),
            ObjectKind::Renderbuffer => Self::Renderbuffer(Renderbuffer::default()),
            ObjectKind::Framebuffer => Self::Framebuffer(Framebuffer { owner }),
            ObjectKind::Program => Self::Program(Program::default()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Texture(_) => ObjectKind::Texture,
            Self::Renderbuffer(_) => ObjectKind::Renderbuffer,
            Self::Framebuffer(_) => ObjectKind::Framebuffer,
            Self::Program(_) => ObjectKind::Program,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectEntry {
    generation: u32,
    initialized: bool,
    object: GpuObject,
}

impl ObjectEntry {
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether the object has been bound at least once.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn kind(&self) -> ObjectKind {
        self.object.kind()
    }

    pub fn object(&self) -> &GpuObject {
        &self.object
    }
}

/// Where a framebuffer attachment should point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentSource {
    pub object: Handle,
    pub face: Option<CubeFace>,
    pub level: u32,
    pub layer: u32,
}

/// Result of a successful [`ObjectRegistry::destroy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destroyed {
    pub handle: Handle,
    pub kind: ObjectKind,
    /// Generation the handle would carry after the delete. Attachments stamped with an
    /// older generation no longer resolve.
    pub generation: u32,
    /// Attachment points the object was removed from.
    pub detached: Vec<(Handle, AttachmentPoint)>,
}

#[derive(Debug)]
pub struct ObjectRegistry {
    next_handle: u32,
    next_context: u32,
    contexts: BTreeSet<ContextId>,
    entries: HashMap<Handle, ObjectEntry>,
    pub(crate) graph: AttachmentGraph,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            next_context: 1,
            contexts: BTreeSet::new(),
            entries: HashMap::new(),
            graph: AttachmentGraph::default(),
        }
    }

    pub(crate) fn register_context(&mut self) -> ContextId {
        let id = ContextId(self.next_context);
        self.next_context += 1;
        self.contexts.insert(id);
        id
    }

    /// Detaches `id` from the share group and returns how many contexts remain.
    pub(crate) fn unregister_context(&mut self, id: ContextId) -> usize {
        self.contexts.remove(&id);
        self.contexts.len()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn graph(&self) -> &AttachmentGraph {
        &self.graph
    }

    /// Allocates a fresh handle with generation 0. Framebuffers record `owner`.
    pub fn create(&mut self, kind: ObjectKind, owner: ContextId) -> Result<Handle, ValidationError> {
        let handle = Handle(self.next_handle);
        self.next_handle = self
            .next_handle
            .checked_add(1)
            .ok_or(ValidationError::OutOfMemory("object handle space exhausted"))?;

        self.entries.insert(
            handle,
            ObjectEntry {
                generation: 0,
                initialized: false,
                object: GpuObject::new(kind, owner),
            },
        );
        if kind == ObjectKind::Framebuffer {
            self.graph.insert_framebuffer(handle);
        }
        trace!(%handle, ?kind, %owner, "created object");
        Ok(handle)
    }

    /// Looks up the entry of a live object.
    pub fn entry(&self, handle: Handle) -> Option<&ObjectEntry> {
        self.entries.get(&handle)
    }

    pub fn resolve(&self, handle: Handle) -> Result<&ObjectEntry, ValidationError> {
        self.entries
            .get(&handle)
            .ok_or(ValidationError::InvalidHandle(handle))
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a reference captured at `generation`.
    pub fn resolve_ref(
        &self,
        handle: Handle,
        generation: u32,
    ) -> Result<&ObjectEntry, ValidationError> {
        let entry = self.resolve(handle)?;
        if entry.generation != generation {
            return Err(ValidationError::InvalidHandle(handle));
        }
        Ok(entry)
    }

    pub fn resolve_kind(
        &self,
        handle: Handle,
        expected: ObjectKind,
    ) -> Result<&ObjectEntry, ValidationError> {
        let entry = self.resolve(handle)?;
        let found = entry.kind();
        if found != expected {
            return Err(ValidationError::TypeMismatch {
                handle,
                expected,
                found,
            });
        }
        Ok(entry)
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Live, bound-at-least-once object of `kind` (the `glIs*` predicate).
    pub fn is_initialized(&self, handle: Handle, kind: ObjectKind) -> bool {
        self.resolve_kind(handle, kind)
            .map(|entry| entry.initialized)
            .unwrap_or(false)
    }

    pub fn texture(&self, handle: Handle) -> Result<&Texture, ValidationError> {
        match &self.resolve_kind(handle, ObjectKind::Texture)?.object {
            GpuObject::Texture(tex) => Ok(tex),
            _ => unreachable!("kind checked above"),
        }
    }

    pub fn renderbuffer(&self, handle: Handle) -> Result<&Renderbuffer, ValidationError> {
        match &self.resolve_kind(handle, ObjectKind::Renderbuffer)?.object {
            GpuObject::Renderbuffer(rb) => Ok(rb),
            _ => unreachable!("kind checked above"),
        }
    }

    pub fn framebuffer(&self, handle: Handle) -> Result<&Framebuffer, ValidationError> {
        match &self.resolve_kind(handle, ObjectKind::Framebuffer)?.object {
            GpuObject::Framebuffer(fb) => Ok(fb),
            _ => unreachable!("kind checked above"),
        }
    }

    fn live_entry_mut(&mut self, handle: Handle) -> Result<&mut ObjectEntry, ValidationError> {
        self.entries
            .get_mut(&handle)
            .ok_or(ValidationError::InvalidHandle(handle))
    }

    pub(crate) fn texture_mut(&mut self, handle: Handle) -> Result<&mut Texture, ValidationError> {
        let entry = self.live_entry_mut(handle)?;
        let found = entry.object.kind();
        match &mut entry.object {
            GpuObject::Texture(tex) => Ok(tex),
            _ => Err(ValidationError::TypeMismatch {
                handle,
                expected: ObjectKind::Texture,
                found,
            }),
        }
    }

    pub(crate) fn renderbuffer_mut(
        &mut self,
        handle: Handle,
    ) -> Result<&mut Renderbuffer, ValidationError> {
        let entry = self.live_entry_mut(handle)?;
        let found = entry.object.kind();
        match &mut entry.object {
            GpuObject::Renderbuffer(rb) => Ok(rb),
            _ => Err(ValidationError::TypeMismatch {
                handle,
                expected: ObjectKind::Renderbuffer,
                found,
            }),
        }
    }

    /// Records the first bind of an object. Textures also fix their type here.
    pub(crate) fn mark_bound(
        &mut self,
        handle: Handle,
        texture_target: Option<TextureTarget>,
    ) -> Result<(), ValidationError> {
        let entry = self.live_entry_mut(handle)?;
        entry.initialized = true;
        if let (GpuObject::Texture(tex), Some(target)) = (&mut entry.object, texture_target) {
            tex.target.get_or_insert(target);
        }
        Ok(())
    }

    /// Specifies one image of a mutable texture.
    pub(crate) fn define_image(
        &mut self,
        texture: Handle,
        face: Option<CubeFace>,
        level: u32,
        image: ImageDesc,
    ) -> Result<(), ValidationError> {
        let tex = self.texture_mut(texture)?;
        tex.images.insert((face.map_or(0, CubeFace::index), level), image);
        self.storage_changed(texture);
        Ok(())
    }

    /// Replaces all images of a texture and makes its storage immutable.
    pub(crate) fn define_storage(
        &mut self,
        texture: Handle,
        images: &[(Option<CubeFace>, u32, ImageDesc)],
    ) -> Result<(), ValidationError> {
        let tex = self.texture_mut(texture)?;
        tex.images = images
            .iter()
            .map(|(face, level, image)| ((face.map_or(0, CubeFace::index), *level), *image))
            .collect();
        tex.immutable = true;
        self.storage_changed(texture);
        Ok(())
    }

    pub(crate) fn set_renderbuffer_storage(
        &mut self,
        renderbuffer: Handle,
        storage: RenderbufferStorage,
    ) -> Result<(), ValidationError> {
        self.renderbuffer_mut(renderbuffer)?.storage = Some(storage);
        self.storage_changed(renderbuffer);
        Ok(())
    }

    /// Marks every framebuffer attaching `handle` dirty after its storage was (re)allocated.
    pub(crate) fn storage_changed(&mut self, handle: Handle) {
        let dirtied = self.graph.invalidate_object(handle);
        if dirtied > 0 {
            trace!(%handle, dirtied, "storage change invalidated framebuffer completeness");
        }
    }

    /// Deletes an object.
    ///
    /// Returns `Ok(None)` for handle 0. The object is detached from every framebuffer that
    /// attaches it (in any context of the share group); each of those becomes dirty.
    pub fn destroy(&mut self, handle: Handle) -> Result<Option<Destroyed>, ValidationError> {
        if handle.is_none() {
            return Ok(None);
        }

        let entry = self
            .entries
            .remove(&handle)
            .ok_or(ValidationError::InvalidHandle(handle))?;
        let kind = entry.kind();
        let generation = entry.generation.wrapping_add(1);

        if kind == ObjectKind::Framebuffer {
            self.graph.remove_framebuffer(handle);
        }
        let detached = self.graph.detach_object(handle);

        debug!(%handle, ?kind, detached = detached.len(), "destroyed object");
        Ok(Some(Destroyed {
            handle,
            kind,
            generation,
            detached,
        }))
    }

    /// Replaces the attachment at `point` of `framebuffer`. `None` detaches.
    ///
    /// Checks that the object is live, is a texture or renderbuffer, that its storage (if any)
    /// suits `point`, and that `level`/`layer` lie within the allocated images.
    pub fn attach(
        &mut self,
        framebuffer: Handle,
        point: AttachmentPoint,
        source: Option<AttachmentSource>,
    ) -> Result<Option<Attachment>, ValidationError> {
        self.resolve_kind(framebuffer, ObjectKind::Framebuffer)?;

        let attachment = match source {
            None => None,
            Some(source) if source.object.is_none() => None,
            Some(source) => Some(self.check_attachment(point, source)?),
        };

        Ok(self.graph.set(framebuffer, point, attachment))
    }

    /// Validates `source` for `point` without modifying anything.
    pub fn check_attachment(
        &self,
        point: AttachmentPoint,
        source: AttachmentSource,
    ) -> Result<Attachment, ValidationError> {
        let entry = self.resolve(source.object)?;
        if matches!(entry.object, GpuObject::Texture(_) | GpuObject::Renderbuffer(_))
            && !entry.initialized
        {
            return Err(ValidationError::InvalidOperation(
                "attached object was never bound",
            ));
        }
        match &entry.object {
            GpuObject::Texture(tex) => {
                if let Some(format) = tex.format() {
                    if !format.class().suits(point) {
                        return Err(ValidationError::InvalidOperation(
                            "texture format cannot back this attachment point",
                        ));
                    }
                }
                if let Some(max_level) = tex.max_level(source.face) {
                    if source.level > max_level {
                        return Err(ValidationError::out_of_range(
                            "attachment level",
                            source.level,
                        ));
                    }
                }
                if let Some(image) = tex.image(source.face, source.level) {
                    if source.layer >= image.depth {
                        return Err(ValidationError::out_of_range(
                            "attachment layer",
                            source.layer,
                        ));
                    }
                }
            }
            GpuObject::Renderbuffer(rb) => {
                if let Some(storage) = rb.storage() {
                    if !storage.format.class().suits(point) {
                        return Err(ValidationError::InvalidOperation(
                            "renderbuffer format cannot back this attachment point",
                        ));
                    }
                }
                if source.level != 0 || source.layer != 0 {
                    return Err(ValidationError::InvalidValue(
                        "renderbuffers have a single level and layer",
                    ));
                }
            }
            other => {
                return Err(ValidationError::TypeMismatch {
                    handle: source.object,
                    expected: ObjectKind::Texture,
                    found: other.kind(),
                })
            }
        }

        Ok(Attachment {
            object: source.object,
            kind: entry.kind(),
            generation: entry.generation,
            face: source.face,
            level: source.level,
            layer: source.layer,
        })
    }

    /// Live framebuffers owned by `owner`, in handle order.
    pub fn framebuffers_owned_by(&self, owner: ContextId) -> Vec<Handle> {
        let mut out: Vec<Handle> = self
            .entries
            .iter()
            .filter_map(|(handle, entry)| match &entry.object {
                GpuObject::Framebuffer(fb) if fb.owner == owner => Some(*handle),
                _ => None,
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// All live handles, in handle order.
    pub fn live_handles(&self) -> Vec<Handle> {
        let mut out: Vec<Handle> = self.entries.keys().copied().collect();
        out.sort_unstable();
        out
    }
}

/// A registry shared by every context created against it.
///
/// Contexts of one share group must be driven from a single thread; the core performs no
/// locking of its own.
#[derive(Debug, Clone, Default)]
pub struct ShareGroup(Rc<RefCell<ObjectRegistry>>);

impl ShareGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, ObjectRegistry> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ObjectRegistry> {
        self.0.borrow_mut()
    }

    pub fn context_count(&self) -> usize {
        self.0.borrow().context_count()
    }

    pub fn ptr_eq(&self, other: &ShareGroup) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
