//! Per-command validation.
//!
//! Each `validate_*` function checks one command against the current context state and
//! returns the command in packed (typed) form. Nothing is mutated apart from the
//! framebuffer completeness cache. Most commands check enumerants (`InvalidEnum`) first, then
//! numeric ranges (`InvalidValue`), then state (`InvalidOperation`,
//! `InvalidFramebufferOperation`). `glReadPixels` is the exception: after the size checks it
//! resolves the read framebuffer (completeness, then the color source) before parsing the
//! pixel format and type, so an incomplete framebuffer wins over a bad enum.

use crate::completeness::{default_framebuffer_status, default_surface_attachment, FramebufferStatus};
use crate::config::{ContextConfig, FeatureSet};
use crate::dispatch::{DrawCall, ReadRequest, RenderTarget, ResolvedAttachment};
use crate::enums::{
    AttachmentPoint, Capability, ClampMode, ClearMask, CubeFace, DrawMode, FramebufferTarget,
    ImageTarget, IndexType, PixelFormat, PixelType, TextureTarget, VolumeTarget,
};
use crate::error::ValidationError;
use crate::format::{ColorSpace, InternalFormat};
use crate::gl;
use crate::registry::{
    AttachmentSource, ContextId, Handle, ImageDesc, ObjectKind, ObjectRegistry,
    RenderbufferStorage,
};
use crate::state::{ContextState, GenericAttrib};

type Result<T> = std::result::Result<T, ValidationError>;

/// Everything a command is validated against.
pub struct ValidationContext<'a> {
    pub state: &'a ContextState,
    pub(crate) registry: &'a mut ObjectRegistry,
    pub config: &'a ContextConfig,
    pub context: ContextId,
    pub(crate) cache_hits: u64,
    pub(crate) recomputations: u64,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        state: &'a ContextState,
        registry: &'a mut ObjectRegistry,
        config: &'a ContextConfig,
        context: ContextId,
    ) -> Self {
        Self {
            state,
            registry,
            config,
            context,
            cache_hits: 0,
            recomputations: 0,
        }
    }

    pub fn features(&self) -> FeatureSet {
        self.config.features()
    }

    /// Read-only view of the share group's objects.
    pub fn registry(&self) -> &ObjectRegistry {
        &*self.registry
    }

    /// A binding read through the registry: deleted objects read as 0.
    pub fn live(&self, handle: Handle) -> Handle {
        if self.registry.is_live(handle) {
            handle
        } else {
            Handle::NONE
        }
    }

    pub fn bound_framebuffer(&self, target: FramebufferTarget) -> Handle {
        self.live(self.state.framebuffer_binding(target))
    }

    pub fn framebuffer_status(&mut self, framebuffer: Handle) -> Result<FramebufferStatus> {
        if framebuffer.is_none() {
            return Ok(default_framebuffer_status(self.config.default_surface.as_ref()));
        }
        let features = self.features();
        let evaluation = self.registry.evaluate(framebuffer, features)?;
        if evaluation.cached {
            self.cache_hits += 1;
        } else {
            self.recomputations += 1;
        }
        Ok(evaluation.status)
    }

    fn require_complete(&mut self, target: FramebufferTarget) -> Result<Handle> {
        let framebuffer = self.bound_framebuffer(target);
        let status = self.framebuffer_status(framebuffer)?;
        if !status.is_complete() {
            return Err(ValidationError::FramebufferIncomplete {
                framebuffer,
                status,
            });
        }
        Ok(framebuffer)
    }

    /// Resolves the complete framebuffer bound to `target` for rendering.
    pub fn render_target(&mut self, target: FramebufferTarget) -> Result<RenderTarget> {
        let framebuffer = self.require_complete(target)?;

        let mut attachments = if framebuffer.is_none() {
            let surface = self.config.default_surface.as_ref().ok_or(
                ValidationError::FramebufferIncomplete {
                    framebuffer,
                    status: FramebufferStatus::Undefined,
                },
            )?;
            vec![default_surface_attachment(surface)]
        } else {
            self.registry.resolved_attachments(framebuffer)
        };

        let encode = self.state.srgb_writes_encoded(self.features());
        for att in &mut attachments {
            att.srgb_encode =
                encode && att.point.is_color() && att.color_space() == ColorSpace::Srgb;
        }

        Ok(RenderTarget {
            framebuffer,
            attachments,
        })
    }

    fn texture_for_update(&self, target: TextureTarget) -> Result<Handle> {
        let texture = self.live(self.state.bound_texture(target));
        if texture.is_none() {
            return Err(ValidationError::InvalidOperation("no texture bound to target"));
        }
        if self.registry.texture(texture)?.is_immutable() {
            return Err(ValidationError::InvalidOperation("texture storage is immutable"));
        }
        Ok(texture)
    }

    pub(crate) fn require_es3(&self, command: &'static str) -> Result<()> {
        if self.features().is_es3() {
            Ok(())
        } else {
            Err(ValidationError::InvalidOperation(command))
        }
    }
}

fn parse<T>(what: &'static str, raw: u32, parsed: Option<T>) -> Result<T> {
    parsed.ok_or(ValidationError::unknown_enum(what, raw))
}

fn non_negative(what: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| ValidationError::out_of_range(what, value))
}

/// floor(log2(size)); the highest mip level of an image `size` texels wide.
fn max_mip_level(size: u32) -> u32 {
    31 - size.max(1).leading_zeros()
}

fn texture_size_limit(config: &ContextConfig, target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D | TextureTarget::Texture2DArray => config.limits.max_texture_size,
        TextureTarget::CubeMap => config.limits.max_cube_map_texture_size,
        TextureTarget::Texture3D => config.limits.max_3d_texture_size,
    }
}

fn texture_target(features: FeatureSet, raw: u32) -> Result<TextureTarget> {
    let target = parse("texture target", raw, TextureTarget::from_u32(raw))?;
    if !target.is_supported(features) {
        return Err(ValidationError::unknown_enum("texture target", raw));
    }
    Ok(target)
}

fn framebuffer_target(features: FeatureSet, raw: u32) -> Result<FramebufferTarget> {
    let target = parse("framebuffer target", raw, FramebufferTarget::from_u32(raw))?;
    if !target.is_supported(features) {
        return Err(ValidationError::unknown_enum("framebuffer target", raw));
    }
    Ok(target)
}

fn pixel_format(features: FeatureSet, raw: u32) -> Result<PixelFormat> {
    let format = parse("pixel format", raw, PixelFormat::from_u32(raw))?;
    if !format.is_supported(features) {
        return Err(ValidationError::unknown_enum("pixel format", raw));
    }
    Ok(format)
}

fn pixel_type(features: FeatureSet, raw: u32) -> Result<PixelType> {
    let ty = parse("pixel type", raw, PixelType::from_u32(raw))?;
    if !ty.is_supported(features) {
        return Err(ValidationError::unknown_enum("pixel type", raw));
    }
    Ok(ty)
}

fn capability(features: FeatureSet, raw: u32) -> Result<Capability> {
    let cap = parse("capability", raw, Capability::from_u32(raw))?;
    if !cap.is_supported(features) {
        return Err(ValidationError::UnsupportedCapability(raw));
    }
    Ok(cap)
}

// ---------------------------------------------------------------------------------------------
// Capabilities and simple state
// ---------------------------------------------------------------------------------------------

/// `glEnable` / `glDisable`.
pub fn validate_set_capability(cx: &ValidationContext<'_>, cap: u32) -> Result<Capability> {
    capability(cx.features(), cap)
}

/// `glIsEnabled` / `glGetBooleanv` for capability tokens.
pub fn validate_is_enabled(cx: &ValidationContext<'_>, cap: u32) -> Result<Capability> {
    capability(cx.features(), cap)
}

/// `n` argument of the `glGen*` / `glDelete*` families.
pub fn validate_count(n: i32) -> Result<u32> {
    non_negative("object count", n)
}

pub fn validate_active_texture(cx: &ValidationContext<'_>, unit: u32) -> Result<u32> {
    let index = unit.wrapping_sub(gl::GL_TEXTURE0);
    if unit < gl::GL_TEXTURE0 || index >= cx.state.texture_unit_count() {
        return Err(ValidationError::unknown_enum("texture unit", unit));
    }
    Ok(index)
}

/// `glClampColor(GL_CLAMP_READ_COLOR, clamp)`.
pub fn validate_clamp_color(_cx: &ValidationContext<'_>, target: u32, clamp: u32) -> Result<ClampMode> {
    if target != gl::GL_CLAMP_READ_COLOR {
        return Err(ValidationError::unknown_enum("clamp target", target));
    }
    parse("clamp mode", clamp, ClampMode::from_u32(clamp))
}

/// `glVertexAttribI4i` / `glVertexAttribI4ui`.
pub fn validate_vertex_attrib_i(
    cx: &ValidationContext<'_>,
    index: u32,
    value: GenericAttrib,
) -> Result<(u32, GenericAttrib)> {
    cx.require_es3("integer vertex attributes require OpenGL ES 3.0")?;
    if index >= cx.config.limits.max_vertex_attribs {
        return Err(ValidationError::out_of_range("vertex attribute index", index));
    }
    Ok((index, value))
}

// ---------------------------------------------------------------------------------------------
// Object binding
// ---------------------------------------------------------------------------------------------

fn bindable(
    cx: &ValidationContext<'_>,
    handle: Handle,
    kind: ObjectKind,
) -> Result<()> {
    if handle.is_none() {
        return Ok(());
    }
    cx.registry.resolve_kind(handle, kind)?;
    Ok(())
}

pub fn validate_bind_texture(
    cx: &ValidationContext<'_>,
    target: u32,
    texture: u32,
) -> Result<(TextureTarget, Handle)> {
    let target = texture_target(cx.features(), target)?;
    let texture = Handle(texture);
    bindable(cx, texture, ObjectKind::Texture)?;
    if !texture.is_none() {
        if let Some(fixed) = cx.registry.texture(texture)?.target() {
            if fixed != target {
                return Err(ValidationError::InvalidOperation(
                    "texture was first bound to a different target",
                ));
            }
        }
    }
    Ok((target, texture))
}

pub fn validate_bind_renderbuffer(
    cx: &ValidationContext<'_>,
    target: u32,
    renderbuffer: u32,
) -> Result<Handle> {
    if target != gl::GL_RENDERBUFFER {
        return Err(ValidationError::unknown_enum("renderbuffer target", target));
    }
    let renderbuffer = Handle(renderbuffer);
    bindable(cx, renderbuffer, ObjectKind::Renderbuffer)?;
    Ok(renderbuffer)
}

pub fn validate_bind_framebuffer(
    cx: &ValidationContext<'_>,
    target: u32,
    framebuffer: u32,
) -> Result<(FramebufferTarget, Handle)> {
    let target = framebuffer_target(cx.features(), target)?;
    let framebuffer = Handle(framebuffer);
    bindable(cx, framebuffer, ObjectKind::Framebuffer)?;
    if !framebuffer.is_none() && cx.registry.framebuffer(framebuffer)?.owner() != cx.context {
        return Err(ValidationError::InvalidOperation(
            "framebuffer belongs to another context",
        ));
    }
    Ok((target, framebuffer))
}

/// `glUseProgram`. 0 unbinds.
pub fn validate_use_program(cx: &ValidationContext<'_>, program: u32) -> Result<Handle> {
    let program = Handle(program);
    bindable(cx, program, ObjectKind::Program)?;
    Ok(program)
}

/// `glDeleteProgram`. 0 is silently ignored.
pub fn validate_delete_program(cx: &ValidationContext<'_>, program: u32) -> Result<Handle> {
    let program = Handle(program);
    bindable(cx, program, ObjectKind::Program)?;
    Ok(program)
}

// ---------------------------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------------------------

/// Validated `glTexImage2D` / `glTexImage3D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureImage {
    pub texture: Handle,
    pub target: TextureTarget,
    pub face: Option<CubeFace>,
    pub level: u32,
    pub image: ImageDesc,
}

/// Validated `glTexStorage2D` / `glTexStorage3D`: every image the call allocates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureStorage {
    pub texture: Handle,
    pub target: TextureTarget,
    pub images: Vec<(Option<CubeFace>, u32, ImageDesc)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderbufferAllocation {
    pub renderbuffer: Handle,
    pub storage: RenderbufferStorage,
}

/// Client arguments of `glTexImage2D`.
#[derive(Debug, Clone, Copy)]
pub struct TexImage2DArgs<'p> {
    pub target: u32,
    pub level: i32,
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub border: i32,
    pub format: u32,
    pub ty: u32,
    pub pixels: Option<&'p [u8]>,
}

/// Client arguments of `glTexImage3D`.
#[derive(Debug, Clone, Copy)]
pub struct TexImage3DArgs<'p> {
    pub target: u32,
    pub level: i32,
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub border: i32,
    pub format: u32,
    pub ty: u32,
    pub pixels: Option<&'p [u8]>,
}

struct ImageCheck {
    target: TextureTarget,
    level: i32,
    internal_format: i32,
    size: [i32; 3],
    border: i32,
    format: PixelFormat,
    ty: PixelType,
    pixels: Option<usize>,
}

fn check_image(cx: &ValidationContext<'_>, check: ImageCheck) -> Result<(u32, ImageDesc)> {
    let limit = texture_size_limit(cx.config, check.target);
    let level = non_negative("mip level", check.level)?;
    if level > max_mip_level(limit) {
        return Err(ValidationError::out_of_range("mip level", level));
    }
    let [width, height, depth] = check.size;
    let width = non_negative("width", width)?;
    let height = non_negative("height", height)?;
    let depth = non_negative("depth", depth)?;
    let level_limit = limit >> level;
    if width > level_limit || height > level_limit {
        return Err(ValidationError::InvalidValue("image size exceeds the texture size limit"));
    }
    match check.target {
        TextureTarget::Texture3D if depth > level_limit => {
            return Err(ValidationError::out_of_range("depth", depth));
        }
        TextureTarget::Texture2DArray if depth > cx.config.limits.max_array_texture_layers => {
            return Err(ValidationError::out_of_range("layer count", depth));
        }
        TextureTarget::CubeMap if width != height => {
            return Err(ValidationError::InvalidValue("cube map faces must be square"));
        }
        _ => {}
    }
    if check.border != 0 {
        return Err(ValidationError::out_of_range("border", check.border));
    }

    let internal = InternalFormat::from_u32(check.internal_format as u32)
        .filter(|format| format.info().texture.is_available(cx.features()))
        .ok_or(ValidationError::out_of_range("internal format", check.internal_format))?;
    if !internal.accepts_upload(check.format, check.ty) {
        return Err(ValidationError::InvalidOperation(
            "format/type combination does not match the internal format",
        ));
    }

    if let Some(len) = check.pixels {
        let required = width as usize
            * height as usize
            * depth as usize
            * check.ty.bytes_per_pixel(check.format) as usize;
        if len < required {
            return Err(ValidationError::InvalidOperation("pixel data is too small"));
        }
    }

    Ok((
        level,
        ImageDesc {
            width,
            height,
            depth,
            format: internal,
        },
    ))
}

pub fn validate_tex_image_2d(cx: &ValidationContext<'_>, args: &TexImage2DArgs<'_>) -> Result<TextureImage> {
    let features = cx.features();
    let target = parse("texture image target", args.target, ImageTarget::from_u32(args.target))?;
    let format = pixel_format(features, args.format)?;
    let ty = pixel_type(features, args.ty)?;

    let (level, image) = check_image(
        cx,
        ImageCheck {
            target: target.texture_target(),
            level: args.level,
            internal_format: args.internal_format,
            size: [args.width, args.height, 1],
            border: args.border,
            format,
            ty,
            pixels: args.pixels.map(<[u8]>::len),
        },
    )?;
    let texture = cx.texture_for_update(target.texture_target())?;

    Ok(TextureImage {
        texture,
        target: target.texture_target(),
        face: target.face(),
        level,
        image,
    })
}

pub fn validate_tex_image_3d(cx: &ValidationContext<'_>, args: &TexImage3DArgs<'_>) -> Result<TextureImage> {
    let features = cx.features();
    let target = parse("volume target", args.target, VolumeTarget::from_u32(args.target))?;
    let target = target.texture_target();
    if !target.is_supported(features) {
        return Err(ValidationError::unknown_enum("volume target", args.target));
    }
    let format = pixel_format(features, args.format)?;
    let ty = pixel_type(features, args.ty)?;

    let (level, image) = check_image(
        cx,
        ImageCheck {
            target,
            level: args.level,
            internal_format: args.internal_format,
            size: [args.width, args.height, args.depth],
            border: args.border,
            format,
            ty,
            pixels: args.pixels.map(<[u8]>::len),
        },
    )?;
    let texture = cx.texture_for_update(target)?;

    Ok(TextureImage {
        texture,
        target,
        face: None,
        level,
        image,
    })
}

fn sized_storage_format(cx: &ValidationContext<'_>, raw: u32) -> Result<InternalFormat> {
    InternalFormat::from_u32(raw)
        .filter(|format| {
            let info = format.info();
            info.sized && info.texture.is_available(cx.features())
        })
        .ok_or(ValidationError::unknown_enum("sized internal format", raw))
}

fn storage_levels(levels: i32, width: u32, height: u32, depth: u32) -> Result<u32> {
    let levels = non_negative("levels", levels)?;
    if levels == 0 {
        return Err(ValidationError::out_of_range("levels", levels));
    }
    if levels > max_mip_level(width.max(height).max(depth)) + 1 {
        return Err(ValidationError::InvalidOperation(
            "too many levels for the base image size",
        ));
    }
    Ok(levels)
}

/// `glTexStorage2D`.
pub fn validate_tex_storage_2d(
    cx: &ValidationContext<'_>,
    target: u32,
    levels: i32,
    internal_format: u32,
    width: i32,
    height: i32,
) -> Result<TextureStorage> {
    cx.require_es3("glTexStorage2D requires OpenGL ES 3.0")?;
    let raw_target = target;
    let target = texture_target(cx.features(), target)?;
    if target.is_layered() {
        return Err(ValidationError::unknown_enum("texture target", raw_target));
    }
    let format = sized_storage_format(cx, internal_format)?;
    let width = non_negative("width", width)?;
    let height = non_negative("height", height)?;
    if width == 0 || height == 0 {
        return Err(ValidationError::InvalidValue("storage size must be non-zero"));
    }
    let limit = texture_size_limit(cx.config, target);
    if width > limit || height > limit {
        return Err(ValidationError::InvalidValue("storage size exceeds the texture size limit"));
    }
    if target == TextureTarget::CubeMap && width != height {
        return Err(ValidationError::InvalidValue("cube map faces must be square"));
    }
    let levels = storage_levels(levels, width, height, 1)?;
    let texture = cx.texture_for_update(target)?;

    let faces: Vec<Option<CubeFace>> = match target {
        TextureTarget::CubeMap => [
            CubeFace::PositiveX,
            CubeFace::NegativeX,
            CubeFace::PositiveY,
            CubeFace::NegativeY,
            CubeFace::PositiveZ,
            CubeFace::NegativeZ,
        ]
        .into_iter()
        .map(Some)
        .collect(),
        _ => vec![None],
    };
    let mut images = Vec::new();
    for face in faces {
        for level in 0..levels {
            images.push((
                face,
                level,
                ImageDesc {
                    width: (width >> level).max(1),
                    height: (height >> level).max(1),
                    depth: 1,
                    format,
                },
            ));
        }
    }

    Ok(TextureStorage {
        texture,
        target,
        images,
    })
}

/// `glTexStorage3D`.
pub fn validate_tex_storage_3d(
    cx: &ValidationContext<'_>,
    target: u32,
    levels: i32,
    internal_format: u32,
    width: i32,
    height: i32,
    depth: i32,
) -> Result<TextureStorage> {
    cx.require_es3("glTexStorage3D requires OpenGL ES 3.0")?;
    let raw_target = target;
    let target = texture_target(cx.features(), target)?;
    if !target.is_layered() {
        return Err(ValidationError::unknown_enum("texture target", raw_target));
    }
    let format = sized_storage_format(cx, internal_format)?;
    let width = non_negative("width", width)?;
    let height = non_negative("height", height)?;
    let depth = non_negative("depth", depth)?;
    if width == 0 || height == 0 || depth == 0 {
        return Err(ValidationError::InvalidValue("storage size must be non-zero"));
    }
    let limit = texture_size_limit(cx.config, target);
    let depth_limit = match target {
        TextureTarget::Texture2DArray => cx.config.limits.max_array_texture_layers,
        _ => limit,
    };
    if width > limit || height > limit || depth > depth_limit {
        return Err(ValidationError::InvalidValue("storage size exceeds the texture size limit"));
    }
    let mip_depth = if target == TextureTarget::Texture3D { depth } else { 1 };
    let levels = storage_levels(levels, width, height, mip_depth)?;
    let texture = cx.texture_for_update(target)?;

    let images = (0..levels)
        .map(|level| {
            let depth = match target {
                TextureTarget::Texture3D => (depth >> level).max(1),
                _ => depth,
            };
            (
                None,
                level,
                ImageDesc {
                    width: (width >> level).max(1),
                    height: (height >> level).max(1),
                    depth,
                    format,
                },
            )
        })
        .collect();

    Ok(TextureStorage {
        texture,
        target,
        images,
    })
}

/// `glRenderbufferStorage` (`samples == 0`) and `glRenderbufferStorageMultisample`.
pub fn validate_renderbuffer_storage(
    cx: &ValidationContext<'_>,
    target: u32,
    samples: i32,
    internal_format: u32,
    width: i32,
    height: i32,
) -> Result<RenderbufferAllocation> {
    if target != gl::GL_RENDERBUFFER {
        return Err(ValidationError::unknown_enum("renderbuffer target", target));
    }
    let format = InternalFormat::from_u32(internal_format)
        .filter(|format| format.info().renderbuffer.is_available(cx.features()))
        .ok_or(ValidationError::unknown_enum("renderbuffer format", internal_format))?;

    let samples = non_negative("samples", samples)?;
    if samples > cx.config.limits.max_samples {
        return Err(ValidationError::out_of_range("samples", samples));
    }
    let width = non_negative("width", width)?;
    let height = non_negative("height", height)?;
    let limit = cx.config.limits.max_renderbuffer_size;
    if width > limit || height > limit {
        return Err(ValidationError::InvalidValue("renderbuffer size exceeds the limit"));
    }

    let renderbuffer = cx.live(cx.state.renderbuffer_binding());
    if renderbuffer.is_none() {
        return Err(ValidationError::InvalidOperation("no renderbuffer bound"));
    }

    Ok(RenderbufferAllocation {
        renderbuffer,
        storage: RenderbufferStorage {
            format,
            width,
            height,
            samples,
        },
    })
}

/// `glRenderbufferStorageMultisample`.
pub fn validate_renderbuffer_storage_multisample(
    cx: &ValidationContext<'_>,
    target: u32,
    samples: i32,
    internal_format: u32,
    width: i32,
    height: i32,
) -> Result<RenderbufferAllocation> {
    cx.require_es3("glRenderbufferStorageMultisample requires OpenGL ES 3.0")?;
    validate_renderbuffer_storage(cx, target, samples, internal_format, width, height)
}

// ---------------------------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------------------------

/// Validated attach/detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachCommand {
    pub framebuffer: Handle,
    pub point: AttachmentPoint,
    /// `None` detaches.
    pub source: Option<AttachmentSource>,
}

fn attachment_point(cx: &ValidationContext<'_>, raw: u32) -> Result<AttachmentPoint> {
    let point = parse("attachment point", raw, AttachmentPoint::from_u32(raw))?;
    let es3 = cx.features().is_es3();
    match point {
        AttachmentPoint::DepthStencil if !es3 => {
            Err(ValidationError::unknown_enum("attachment point", raw))
        }
        AttachmentPoint::Color(index) if u32::from(index) >= cx.config.limits.max_color_attachments => {
            if es3 {
                Err(ValidationError::InvalidOperation(
                    "color attachment index exceeds the implementation limit",
                ))
            } else {
                Err(ValidationError::unknown_enum("attachment point", raw))
            }
        }
        point => Ok(point),
    }
}

fn target_framebuffer(cx: &ValidationContext<'_>, target: FramebufferTarget) -> Result<Handle> {
    let framebuffer = cx.bound_framebuffer(target);
    if framebuffer.is_none() {
        return Err(ValidationError::InvalidOperation(
            "the default framebuffer has no modifiable attachments",
        ));
    }
    Ok(framebuffer)
}

fn attach_level(cx: &ValidationContext<'_>, target: TextureTarget, level: i32) -> Result<u32> {
    let level = non_negative("attachment level", level)?;
    if !cx.features().is_es3() && level != 0 {
        return Err(ValidationError::out_of_range("attachment level", level));
    }
    if level > max_mip_level(texture_size_limit(cx.config, target)) {
        return Err(ValidationError::out_of_range("attachment level", level));
    }
    Ok(level)
}

fn finish_attach(
    cx: &ValidationContext<'_>,
    framebuffer: Handle,
    point: AttachmentPoint,
    source: Option<AttachmentSource>,
) -> Result<AttachCommand> {
    if let Some(source) = source {
        cx.registry.check_attachment(point, source)?;
    }
    Ok(AttachCommand {
        framebuffer,
        point,
        source,
    })
}

/// The texture named by an attach command, checked to be a texture of one of `accepted` types.
fn attach_texture(
    cx: &ValidationContext<'_>,
    texture: Handle,
    accepted: &[TextureTarget],
) -> Result<TextureTarget> {
    let tex = cx.registry.texture(texture)?;
    match tex.target() {
        Some(target) if accepted.contains(&target) => Ok(target),
        Some(_) => Err(ValidationError::InvalidOperation(
            "texture type does not match the attachment target",
        )),
        None => Err(ValidationError::InvalidOperation("attached object was never bound")),
    }
}

/// `glFramebufferTexture2D`.
pub fn validate_framebuffer_texture_2d(
    cx: &ValidationContext<'_>,
    target: u32,
    attachment: u32,
    textarget: u32,
    texture: u32,
    level: i32,
) -> Result<AttachCommand> {
    let target = framebuffer_target(cx.features(), target)?;
    let point = attachment_point(cx, attachment)?;
    let image_target = parse("texture image target", textarget, ImageTarget::from_u32(textarget))?;
    let framebuffer = target_framebuffer(cx, target)?;

    let texture = Handle(texture);
    if texture.is_none() {
        return finish_attach(cx, framebuffer, point, None);
    }
    attach_texture(cx, texture, &[image_target.texture_target()])?;
    let level = attach_level(cx, image_target.texture_target(), level)?;
    finish_attach(
        cx,
        framebuffer,
        point,
        Some(AttachmentSource {
            object: texture,
            face: image_target.face(),
            level,
            layer: 0,
        }),
    )
}

fn attach_layered(
    cx: &ValidationContext<'_>,
    framebuffer: Handle,
    point: AttachmentPoint,
    texture: Handle,
    accepted: &[TextureTarget],
    level: i32,
    layer: i32,
) -> Result<AttachCommand> {
    if texture.is_none() {
        return finish_attach(cx, framebuffer, point, None);
    }
    let ty = attach_texture(cx, texture, accepted)?;
    let level = attach_level(cx, ty, level)?;
    let layer = non_negative("attachment layer", layer)?;
    let layer_limit = match ty {
        TextureTarget::Texture2DArray => cx.config.limits.max_array_texture_layers,
        _ => cx.config.limits.max_3d_texture_size,
    };
    if layer >= layer_limit {
        return Err(ValidationError::out_of_range("attachment layer", layer));
    }
    finish_attach(
        cx,
        framebuffer,
        point,
        Some(AttachmentSource {
            object: texture,
            face: None,
            level,
            layer,
        }),
    )
}

/// `glFramebufferTextureLayer`.
pub fn validate_framebuffer_texture_layer(
    cx: &ValidationContext<'_>,
    target: u32,
    attachment: u32,
    texture: u32,
    level: i32,
    layer: i32,
) -> Result<AttachCommand> {
    cx.require_es3("glFramebufferTextureLayer requires OpenGL ES 3.0")?;
    let target = framebuffer_target(cx.features(), target)?;
    let point = attachment_point(cx, attachment)?;
    let framebuffer = target_framebuffer(cx, target)?;
    attach_layered(
        cx,
        framebuffer,
        point,
        Handle(texture),
        &[TextureTarget::Texture3D, TextureTarget::Texture2DArray],
        level,
        layer,
    )
}

/// `glFramebufferTexture3D`: attaches slice `zoffset` of a 3D texture.
pub fn validate_framebuffer_texture_3d(
    cx: &ValidationContext<'_>,
    target: u32,
    attachment: u32,
    textarget: u32,
    texture: u32,
    level: i32,
    zoffset: i32,
) -> Result<AttachCommand> {
    cx.require_es3("glFramebufferTexture3D requires 3D textures")?;
    let target = framebuffer_target(cx.features(), target)?;
    let point = attachment_point(cx, attachment)?;
    if textarget != gl::GL_TEXTURE_3D {
        return Err(ValidationError::unknown_enum("texture image target", textarget));
    }
    let framebuffer = target_framebuffer(cx, target)?;
    attach_layered(
        cx,
        framebuffer,
        point,
        Handle(texture),
        &[TextureTarget::Texture3D],
        level,
        zoffset,
    )
}

/// `glFramebufferRenderbuffer`.
pub fn validate_framebuffer_renderbuffer(
    cx: &ValidationContext<'_>,
    target: u32,
    attachment: u32,
    renderbuffer_target: u32,
    renderbuffer: u32,
) -> Result<AttachCommand> {
    let target = framebuffer_target(cx.features(), target)?;
    let point = attachment_point(cx, attachment)?;
    if renderbuffer_target != gl::GL_RENDERBUFFER {
        return Err(ValidationError::unknown_enum(
            "renderbuffer target",
            renderbuffer_target,
        ));
    }
    let framebuffer = target_framebuffer(cx, target)?;

    let renderbuffer = Handle(renderbuffer);
    if renderbuffer.is_none() {
        return finish_attach(cx, framebuffer, point, None);
    }
    cx.registry
        .resolve_kind(renderbuffer, ObjectKind::Renderbuffer)?;
    finish_attach(
        cx,
        framebuffer,
        point,
        Some(AttachmentSource {
            object: renderbuffer,
            face: None,
            level: 0,
            layer: 0,
        }),
    )
}

/// `glCheckFramebufferStatus`.
pub fn validate_check_framebuffer_status(
    cx: &mut ValidationContext<'_>,
    target: u32,
) -> Result<FramebufferStatus> {
    let target = framebuffer_target(cx.features(), target)?;
    let framebuffer = cx.bound_framebuffer(target);
    cx.framebuffer_status(framebuffer)
}

// ---------------------------------------------------------------------------------------------
// Draw, clear and read
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub target: RenderTarget,
    pub call: DrawCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearCommand {
    pub target: RenderTarget,
    pub mask: ClearMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCommand {
    pub framebuffer: Handle,
    pub source: ResolvedAttachment,
    pub request: ReadRequest,
}

pub fn validate_draw_arrays(
    cx: &mut ValidationContext<'_>,
    mode: u32,
    first: i32,
    count: i32,
) -> Result<DrawCommand> {
    let mode = parse("draw mode", mode, DrawMode::from_u32(mode))?;
    let first = non_negative("first", first)?;
    let count = non_negative("count", count)?;
    let target = cx.render_target(FramebufferTarget::Draw)?;
    Ok(DrawCommand {
        target,
        call: DrawCall::Arrays { mode, first, count },
    })
}

pub fn validate_draw_elements(
    cx: &mut ValidationContext<'_>,
    mode: u32,
    count: i32,
    index_type: u32,
    offset: usize,
) -> Result<DrawCommand> {
    let raw_mode = mode;
    let mode = parse("draw mode", raw_mode, DrawMode::from_u32(raw_mode))?;
    let raw_type = index_type;
    let index_type = parse("index type", raw_type, IndexType::from_u32(raw_type))?;
    if index_type == IndexType::UnsignedInt && !cx.features().is_es3() {
        return Err(ValidationError::unknown_enum("index type", raw_type));
    }
    let count = non_negative("count", count)?;
    let target = cx.render_target(FramebufferTarget::Draw)?;
    Ok(DrawCommand {
        target,
        call: DrawCall::Elements {
            mode,
            count,
            index_type,
            offset,
        },
    })
}

pub fn validate_clear(cx: &mut ValidationContext<'_>, mask: u32) -> Result<ClearCommand> {
    let mask = ClearMask::from_bits(mask).ok_or(ValidationError::InvalidValue(
        "clear mask contains unknown bits",
    ))?;
    let target = cx.render_target(FramebufferTarget::Draw)?;
    Ok(ClearCommand { target, mask })
}

/// Client arguments of `glReadPixels`.
#[derive(Debug, Clone, Copy)]
pub struct ReadPixelsArgs {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub format: u32,
    pub ty: u32,
    /// Size of the client destination buffer.
    pub buffer_len: usize,
}

pub fn validate_read_pixels(cx: &mut ValidationContext<'_>, args: &ReadPixelsArgs) -> Result<ReadCommand> {
    let width = non_negative("width", args.width)?;
    let height = non_negative("height", args.height)?;

    let target = cx.render_target(FramebufferTarget::Read)?;
    let source = target
        .attachments
        .iter()
        .find(|att| att.point == AttachmentPoint::Color(0))
        .copied()
        .ok_or(ValidationError::InvalidOperation("read framebuffer has no color attachment"))?;
    if source.samples > 0 {
        return Err(ValidationError::InvalidOperation(
            "cannot read from a multisampled framebuffer",
        ));
    }

    let format = parse("pixel format", args.format, PixelFormat::from_u32(args.format))?;
    let ty = parse("pixel type", args.ty, PixelType::from_u32(args.ty))?;
    let accepted = match (format, ty) {
        (PixelFormat::Rgba, PixelType::UnsignedByte) => true,
        (PixelFormat::Rgba, PixelType::Float) => {
            source.format.info().float && cx.features().is_es3()
        }
        _ => false,
    };
    if !accepted {
        return Err(ValidationError::InvalidOperation(
            "format/type combination cannot be read from this framebuffer",
        ));
    }

    let request = ReadRequest {
        x: args.x,
        y: args.y,
        width,
        height,
        format,
        ty,
    };
    let required = request
        .required_len()
        .ok_or(ValidationError::OutOfMemory("read rectangle size overflows"))?;
    if args.buffer_len < required {
        return Err(ValidationError::InvalidOperation("destination buffer is too small"));
    }

    Ok(ReadCommand {
        framebuffer: target.framebuffer,
        source,
        request,
    })
}
