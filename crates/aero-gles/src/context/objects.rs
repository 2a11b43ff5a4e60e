//! Object lifecycle, binding and storage commands.

use tracing::trace;

use super::Context;
use crate::dispatch::{Dispatcher, StorageAllocation};
use crate::gl;
use crate::registry::{Destroyed, Handle, ObjectKind};
use crate::validation::{self, TexImage2DArgs, TexImage3DArgs, TextureImage, TextureStorage};

impl<D: Dispatcher> Context<D> {
    pub fn gen_textures(&mut self, n: i32) -> Vec<Handle> {
        self.gen_objects("glGenTextures", n, ObjectKind::Texture)
    }

    pub fn gen_renderbuffers(&mut self, n: i32) -> Vec<Handle> {
        self.gen_objects("glGenRenderbuffers", n, ObjectKind::Renderbuffer)
    }

    pub fn gen_framebuffers(&mut self, n: i32) -> Vec<Handle> {
        self.gen_objects("glGenFramebuffers", n, ObjectKind::Framebuffer)
    }

    /// `glCreateProgram`. Programs are usable (`is_program`) immediately.
    pub fn create_program(&mut self) -> Handle {
        let owner = self.id;
        self.execute("glCreateProgram", |cx| {
            let program = cx.registry.create(ObjectKind::Program, owner)?;
            cx.registry.mark_bound(program, None)?;
            Ok(program)
        })
        .unwrap_or(Handle::NONE)
    }

    fn gen_objects(&mut self, command: &'static str, n: i32, kind: ObjectKind) -> Vec<Handle> {
        let owner = self.id;
        self.execute(command, |cx| {
            let n = validation::validate_count(n)?;
            (0..n)
                .map(|_| cx.registry.create(kind, owner))
                .collect::<Result<Vec<_>, _>>()
        })
        .unwrap_or_default()
    }

    pub fn delete_textures(&mut self, textures: &[u32]) {
        self.delete_objects("glDeleteTextures", textures, ObjectKind::Texture);
    }

    pub fn delete_renderbuffers(&mut self, renderbuffers: &[u32]) {
        self.delete_objects("glDeleteRenderbuffers", renderbuffers, ObjectKind::Renderbuffer);
    }

    pub fn delete_framebuffers(&mut self, framebuffers: &[u32]) {
        self.delete_objects("glDeleteFramebuffers", framebuffers, ObjectKind::Framebuffer);
    }

    /// Names that are 0, unknown, already deleted, of another kind or (for framebuffers)
    /// owned by another context are skipped.
    fn delete_objects(&mut self, command: &'static str, names: &[u32], kind: ObjectKind) {
        let owner = self.id;
        let Some(deleted) = self.execute(command, |cx| {
            let mut deleted = Vec::new();
            for &name in names {
                let handle = Handle(name);
                if cx.registry.resolve_kind(handle, kind).is_err() {
                    continue;
                }
                if kind == ObjectKind::Framebuffer && cx.registry.framebuffer(handle)?.owner() != owner {
                    continue;
                }
                if let Some(destroyed) = cx.registry.destroy(handle)? {
                    deleted.push(destroyed);
                }
            }
            Ok(deleted)
        }) else {
            return;
        };

        for destroyed in deleted {
            self.after_delete(destroyed);
        }
    }

    /// `glDeleteProgram`. 0 is ignored; other non-programs are rejected.
    pub fn delete_program(&mut self, program: u32) {
        let Some(destroyed) = self.execute("glDeleteProgram", |cx| {
            let program = validation::validate_delete_program(cx, program)?;
            cx.registry.destroy(program)
        }) else {
            return;
        };
        if let Some(destroyed) = destroyed {
            self.after_delete(destroyed);
        }
    }

    fn after_delete(&mut self, destroyed: Destroyed) {
        self.state.unbind_object(destroyed.handle);
        for &(framebuffer, point) in &destroyed.detached {
            self.dispatcher.attachment_changed(framebuffer, point, None);
        }
        self.dispatcher.object_deleted(destroyed.handle, destroyed.kind);
        trace!(
            context = %self.id,
            handle = %destroyed.handle,
            kind = ?destroyed.kind,
            detached = destroyed.detached.len(),
            "deleted object"
        );
    }

    pub fn use_program(&mut self, program: u32) {
        if let Some(program) =
            self.execute("glUseProgram", |cx| validation::validate_use_program(cx, program))
        {
            self.state.use_program(program);
        }
    }

    pub fn is_texture(&self, texture: u32) -> bool {
        self.share
            .borrow()
            .is_initialized(Handle(texture), ObjectKind::Texture)
    }

    pub fn is_renderbuffer(&self, renderbuffer: u32) -> bool {
        self.share
            .borrow()
            .is_initialized(Handle(renderbuffer), ObjectKind::Renderbuffer)
    }

    /// Framebuffers of other contexts in the share group are not visible.
    pub fn is_framebuffer(&self, framebuffer: u32) -> bool {
        let registry = self.share.borrow();
        let handle = Handle(framebuffer);
        registry.is_initialized(handle, ObjectKind::Framebuffer)
            && registry
                .framebuffer(handle)
                .is_ok_and(|fb| fb.owner() == self.id)
    }

    pub fn is_program(&self, program: u32) -> bool {
        self.share
            .borrow()
            .is_initialized(Handle(program), ObjectKind::Program)
    }

    pub fn bind_texture(&mut self, target: u32, texture: u32) {
        let Some((target, texture)) = self.execute("glBindTexture", |cx| {
            let (target, texture) = validation::validate_bind_texture(cx, target, texture)?;
            if !texture.is_none() {
                cx.registry.mark_bound(texture, Some(target))?;
            }
            Ok((target, texture))
        }) else {
            return;
        };
        self.state.bind_texture(target, texture);
    }

    pub fn bind_renderbuffer(&mut self, target: u32, renderbuffer: u32) {
        let Some(renderbuffer) = self.execute("glBindRenderbuffer", |cx| {
            let renderbuffer = validation::validate_bind_renderbuffer(cx, target, renderbuffer)?;
            if !renderbuffer.is_none() {
                cx.registry.mark_bound(renderbuffer, None)?;
            }
            Ok(renderbuffer)
        }) else {
            return;
        };
        self.state.bind_renderbuffer(renderbuffer);
    }

    pub fn bind_framebuffer(&mut self, target: u32, framebuffer: u32) {
        let Some((target, framebuffer)) = self.execute("glBindFramebuffer", |cx| {
            let (target, framebuffer) = validation::validate_bind_framebuffer(cx, target, framebuffer)?;
            if !framebuffer.is_none() {
                cx.registry.mark_bound(framebuffer, None)?;
            }
            Ok((target, framebuffer))
        }) else {
            return;
        };
        self.state.bind_framebuffer(target, framebuffer);
    }

    pub fn tex_image_2d(&mut self, args: &TexImage2DArgs<'_>) {
        let Some(image) = self.execute("glTexImage2D", |cx| {
            let image = validation::validate_tex_image_2d(cx, args)?;
            cx.registry
                .define_image(image.texture, image.face, image.level, image.image)?;
            Ok(image)
        }) else {
            return;
        };
        let pixels = args
            .pixels
            .filter(|_| args.format == gl::GL_RGBA && args.ty == gl::GL_UNSIGNED_BYTE);
        self.image_allocated(&image, pixels);
    }

    pub fn tex_image_3d(&mut self, args: &TexImage3DArgs<'_>) {
        let Some(image) = self.execute("glTexImage3D", |cx| {
            let image = validation::validate_tex_image_3d(cx, args)?;
            cx.registry
                .define_image(image.texture, image.face, image.level, image.image)?;
            Ok(image)
        }) else {
            return;
        };
        let pixels = args
            .pixels
            .filter(|_| args.format == gl::GL_RGBA && args.ty == gl::GL_UNSIGNED_BYTE);
        self.image_allocated(&image, pixels);
    }

    fn image_allocated(&mut self, image: &TextureImage, pixels: Option<&[u8]>) {
        self.dispatcher.storage_allocated(
            &StorageAllocation {
                object: image.texture,
                kind: ObjectKind::Texture,
                face: image.face,
                level: image.level,
                width: image.image.width,
                height: image.image.height,
                depth: image.image.depth,
                samples: 0,
                format: image.image.format,
            },
            pixels,
        );
    }

    pub fn tex_storage_2d(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        if let Some(storage) = self.execute("glTexStorage2D", |cx| {
            let storage = validation::validate_tex_storage_2d(
                cx,
                target,
                levels,
                internal_format,
                width,
                height,
            )?;
            cx.registry.define_storage(storage.texture, &storage.images)?;
            Ok(storage)
        }) {
            self.storage_defined(&storage);
        }
    }

    pub fn tex_storage_3d(
        &mut self,
        target: u32,
        levels: i32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
    ) {
        if let Some(storage) = self.execute("glTexStorage3D", |cx| {
            let storage = validation::validate_tex_storage_3d(
                cx,
                target,
                levels,
                internal_format,
                width,
                height,
                depth,
            )?;
            cx.registry.define_storage(storage.texture, &storage.images)?;
            Ok(storage)
        }) {
            self.storage_defined(&storage);
        }
    }

    fn storage_defined(&mut self, storage: &TextureStorage) {
        for &(face, level, image) in &storage.images {
            self.dispatcher.storage_allocated(
                &StorageAllocation {
                    object: storage.texture,
                    kind: ObjectKind::Texture,
                    face,
                    level,
                    width: image.width,
                    height: image.height,
                    depth: image.depth,
                    samples: 0,
                    format: image.format,
                },
                None,
            );
        }
    }

    pub fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        let allocation = self.execute("glRenderbufferStorage", |cx| {
            let allocation =
                validation::validate_renderbuffer_storage(cx, target, 0, internal_format, width, height)?;
            cx.registry
                .set_renderbuffer_storage(allocation.renderbuffer, allocation.storage)?;
            Ok(allocation)
        });
        self.renderbuffer_allocated(allocation);
    }

    pub fn renderbuffer_storage_multisample(
        &mut self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        let allocation = self.execute("glRenderbufferStorageMultisample", |cx| {
            let allocation = validation::validate_renderbuffer_storage_multisample(
                cx,
                target,
                samples,
                internal_format,
                width,
                height,
            )?;
            cx.registry
                .set_renderbuffer_storage(allocation.renderbuffer, allocation.storage)?;
            Ok(allocation)
        });
        self.renderbuffer_allocated(allocation);
    }

    fn renderbuffer_allocated(&mut self, allocation: Option<validation::RenderbufferAllocation>) {
        let Some(allocation) = allocation else {
            return;
        };
        let storage = allocation.storage;
        self.dispatcher.storage_allocated(
            &StorageAllocation {
                object: allocation.renderbuffer,
                kind: ObjectKind::Renderbuffer,
                face: None,
                level: 0,
                width: storage.width,
                height: storage.height,
                depth: 1,
                samples: storage.samples,
                format: storage.format,
            },
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::config::{ClientVersion, ContextConfig};
    use crate::dispatch::NullDispatcher;
    use crate::enums::TextureTarget;
    use crate::error::GlError;
    use crate::gl;
    use crate::registry::Handle;
    use crate::validation::TexImage2DArgs;
    use crate::Context;

    fn es3() -> Context {
        Context::new(ContextConfig::default(), NullDispatcher)
    }

    fn rgba8_image(width: i32, height: i32) -> TexImage2DArgs<'static> {
        TexImage2DArgs {
            target: gl::GL_TEXTURE_2D,
            level: 0,
            internal_format: gl::GL_RGBA8 as i32,
            width,
            height,
            border: 0,
            format: gl::GL_RGBA,
            ty: gl::GL_UNSIGNED_BYTE,
            pixels: None,
        }
    }

    #[test]
    fn generated_names_are_unique_and_not_yet_objects() {
        let mut ctx = es3();
        let names = ctx.gen_textures(3);
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|h| !h.is_none()));
        assert!(!ctx.is_texture(names[0].get()));

        ctx.bind_texture(gl::GL_TEXTURE_2D, names[0].get());
        assert!(ctx.is_texture(names[0].get()));
        assert!(!ctx.is_renderbuffer(names[0].get()));
    }

    #[test]
    fn negative_gen_count_is_invalid_value() {
        let mut ctx = es3();
        assert!(ctx.gen_framebuffers(-1).is_empty());
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);
    }

    #[test]
    fn binding_a_deleted_texture_is_an_invalid_handle() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0];
        ctx.delete_textures(&[tex.get()]);
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex.get());
        assert_eq!(ctx.take_error(), Some(GlError::InvalidHandle));
    }

    #[test]
    fn texture_type_is_fixed_by_the_first_bind() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex);
        ctx.bind_texture(gl::GL_TEXTURE_CUBE_MAP, tex);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);
        assert_eq!(ctx.texture_binding(0, TextureTarget::CubeMap), Handle::NONE);
    }

    #[test]
    fn binding_a_renderbuffer_name_as_texture_is_invalid_operation() {
        let mut ctx = es3();
        let rb = ctx.gen_renderbuffers(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, rb);
        assert_eq!(ctx.take_error(), Some(GlError::InvalidOperation));
    }

    #[test]
    fn deleting_a_bound_texture_unbinds_it() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0];
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex.get());
        ctx.delete_textures(&[tex.get()]);
        assert_eq!(ctx.texture_binding(0, TextureTarget::Texture2D), Handle::NONE);
        assert!(!ctx.is_texture(tex.get()));
    }

    #[test]
    fn delete_ignores_zero_unknown_and_foreign_kinds() {
        let mut ctx = es3();
        let rb = ctx.gen_renderbuffers(1)[0];
        ctx.bind_renderbuffer(gl::GL_RENDERBUFFER, rb.get());
        ctx.delete_textures(&[0, 12345, rb.get()]);
        assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
        assert!(ctx.is_renderbuffer(rb.get()));
    }

    #[test]
    fn programs_follow_delete_and_use_rules() {
        let mut ctx = es3();
        let program = ctx.create_program();
        assert!(ctx.is_program(program.get()));
        ctx.use_program(program.get());
        assert_eq!(ctx.current_program(), program);

        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex);
        ctx.use_program(tex);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);

        ctx.delete_program(program.get());
        assert_eq!(ctx.current_program(), Handle::NONE);
        ctx.delete_program(program.get());
        assert_eq!(ctx.take_error(), Some(GlError::InvalidHandle));
        ctx.delete_program(0);
        assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    }

    #[test]
    fn tex_image_requires_a_bound_texture() {
        let mut ctx = es3();
        ctx.tex_image_2d(&rgba8_image(4, 4));
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);
    }

    #[test]
    fn tex_image_checks_enums_before_values() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex);

        ctx.tex_image_2d(&TexImage2DArgs {
            ty: 0xBEEF,
            width: -1,
            ..rgba8_image(4, 4)
        });
        assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);

        ctx.tex_image_2d(&rgba8_image(-1, 4));
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);

        ctx.tex_image_2d(&TexImage2DArgs {
            border: 1,
            ..rgba8_image(4, 4)
        });
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);

        ctx.tex_image_2d(&TexImage2DArgs {
            ty: gl::GL_FLOAT,
            ..rgba8_image(4, 4)
        });
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);

        ctx.tex_image_2d(&rgba8_image(4, 4));
        assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    }

    #[test]
    fn cube_faces_must_be_square() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_CUBE_MAP, tex);
        ctx.tex_image_2d(&TexImage2DArgs {
            target: gl::GL_TEXTURE_CUBE_MAP_POSITIVE_X,
            ..rgba8_image(4, 8)
        });
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);
    }

    #[test]
    fn tex_storage_makes_the_texture_immutable() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex);
        ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 3, gl::GL_RGBA8, 8, 8);
        assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);

        ctx.tex_image_2d(&rgba8_image(8, 8));
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);
        ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 1, gl::GL_RGBA8, 8, 8);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);
    }

    #[test]
    fn tex_storage_rejects_unsized_formats_and_excess_levels() {
        let mut ctx = es3();
        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex);

        ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 1, gl::GL_RGBA, 8, 8);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);
        ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 0, gl::GL_RGBA8, 8, 8);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);
        ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 5, gl::GL_RGBA8, 8, 8);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);
    }

    #[test]
    fn tex_storage_is_es3_only() {
        let mut ctx = Context::new(ContextConfig::for_version(ClientVersion::Es2), NullDispatcher);
        let tex = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, tex);
        ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 1, gl::GL_RGBA8, 8, 8);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);
    }

    #[test]
    fn renderbuffer_storage_rules() {
        let mut ctx = es3();
        ctx.renderbuffer_storage(gl::GL_RENDERBUFFER, gl::GL_RGBA8, 4, 4);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_OPERATION);

        let rb = ctx.gen_renderbuffers(1)[0].get();
        ctx.bind_renderbuffer(gl::GL_RENDERBUFFER, rb);
        ctx.renderbuffer_storage(gl::GL_RENDERBUFFER, gl::GL_LUMINANCE, 4, 4);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);
        ctx.renderbuffer_storage(gl::GL_RENDERBUFFER, gl::GL_RGBA8, 1 << 20, 4);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);
        ctx.renderbuffer_storage_multisample(gl::GL_RENDERBUFFER, 64, gl::GL_RGBA8, 4, 4);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_VALUE);
        ctx.renderbuffer_storage(gl::GL_TEXTURE_2D, gl::GL_RGBA8, 4, 4);
        assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);

        ctx.renderbuffer_storage_multisample(gl::GL_RENDERBUFFER, 4, gl::GL_RGBA8, 4, 4);
        assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    }
}
