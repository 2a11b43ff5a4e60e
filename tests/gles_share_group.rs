use aero_gles::gl;
use aero_gles::{
    AttachmentPoint, Context, ContextConfig, FramebufferTarget, GlError, Handle, NullDispatcher,
    ObjectKind, ShareGroup, TextureTarget,
};
use pretty_assertions::assert_eq;

fn shared_pair() -> (ShareGroup, Context, Context) {
    let share = ShareGroup::new();
    let a = Context::with_share_group(&share, ContextConfig::default(), NullDispatcher);
    let b = Context::with_share_group(&share, ContextConfig::default(), NullDispatcher);
    (share, a, b)
}

fn texture_2d(ctx: &mut Context, format: u32) -> u32 {
    let texture = ctx.gen_textures(1)[0].get();
    ctx.bind_texture(gl::GL_TEXTURE_2D, texture);
    ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 1, format, 4, 4);
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    texture
}

fn attach_color(ctx: &mut Context, texture: u32) -> u32 {
    let framebuffer = ctx.gen_framebuffers(1)[0].get();
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, framebuffer);
    ctx.framebuffer_texture_2d(
        gl::GL_FRAMEBUFFER,
        gl::GL_COLOR_ATTACHMENT0,
        gl::GL_TEXTURE_2D,
        texture,
        0,
    );
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    framebuffer
}

#[test]
fn textures_are_visible_to_every_context_of_the_group() {
    let (share, mut a, mut b) = shared_pair();
    assert_eq!(share.context_count(), 2);
    assert!(a.share_group().ptr_eq(b.share_group()));
    assert!(!share.ptr_eq(&ShareGroup::new()));

    let texture = texture_2d(&mut a, gl::GL_RGBA8);
    assert!(b.is_texture(texture));
    b.bind_texture(gl::GL_TEXTURE_2D, texture);
    assert_eq!(b.get_error(), gl::GL_NO_ERROR);
    assert_eq!(b.texture_binding(0, TextureTarget::Texture2D), Handle(texture));
}

#[test]
fn deleting_in_one_context_detaches_everywhere() {
    let (share, mut a, mut b) = shared_pair();
    let texture = texture_2d(&mut a, gl::GL_SRGB8_ALPHA8);
    let fb_b = attach_color(&mut b, texture);
    assert_eq!(
        b.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_COMPLETE
    );

    a.delete_textures(&[texture]);
    assert_eq!(a.get_error(), gl::GL_NO_ERROR);

    assert!(share
        .borrow()
        .graph()
        .attachment(Handle(fb_b), AttachmentPoint::Color(0))
        .is_none());
    assert!(share.borrow().graph().referencing(Handle(texture)).is_empty());
    assert_eq!(b.texture_binding(0, TextureTarget::Texture2D), Handle::NONE);
    assert_eq!(
        b.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
    );
    b.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    assert_eq!(b.get_error(), gl::GL_INVALID_FRAMEBUFFER_OPERATION);
}

#[test]
fn deleted_handles_stay_dead() {
    let (share, mut a, mut b) = shared_pair();
    let texture = texture_2d(&mut a, gl::GL_RGBA8);
    assert!(share.borrow().entry(Handle(texture)).is_some());

    b.delete_textures(&[texture]);
    let registry = share.borrow();
    assert!(registry.entry(Handle(texture)).is_none());
    assert!(registry.resolve(Handle(texture)).is_err());
    assert!(registry.is_empty());
    drop(registry);

    a.bind_texture(gl::GL_TEXTURE_2D, texture);
    assert_eq!(a.take_error(), Some(GlError::InvalidHandle));

    let fresh = a.gen_textures(1)[0];
    assert_ne!(fresh, Handle(texture));
}

#[test]
fn create_delete_churn_does_not_grow_the_registry() {
    let (share, mut a, mut b) = shared_pair();
    for i in 0..1000 {
        let ctx = if i % 2 == 0 { &mut a } else { &mut b };
        let texture = ctx.gen_textures(1)[0].get();
        ctx.bind_texture(gl::GL_TEXTURE_2D, texture);
        ctx.delete_textures(&[texture]);
        assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    }
    assert_eq!(share.borrow().len(), 0);
    assert!(share.borrow().live_handles().is_empty());
}

#[test]
fn framebuffers_are_per_context() {
    let (_share, mut a, mut b) = shared_pair();
    let fb_a = a.gen_framebuffers(1)[0].get();
    a.bind_framebuffer(gl::GL_FRAMEBUFFER, fb_a);

    b.bind_framebuffer(gl::GL_FRAMEBUFFER, fb_a);
    assert_eq!(b.get_error(), gl::GL_INVALID_OPERATION);
    assert!(!b.is_framebuffer(fb_a));
    assert!(a.is_framebuffer(fb_a));

    b.delete_framebuffers(&[fb_a]);
    assert_eq!(b.get_error(), gl::GL_NO_ERROR);
    assert_eq!(a.framebuffer_binding(FramebufferTarget::Draw), Handle(fb_a));
}

#[test]
fn deleting_a_bound_framebuffer_reverts_to_the_default() {
    let (_share, mut a, _b) = shared_pair();
    let texture = texture_2d(&mut a, gl::GL_RGBA8);
    let framebuffer = attach_color(&mut a, texture);

    a.delete_framebuffers(&[framebuffer]);
    assert_eq!(a.framebuffer_binding(FramebufferTarget::Read), Handle::NONE);
    assert_eq!(
        a.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_COMPLETE
    );
    assert!(a.is_texture(texture));
}

#[test]
fn teardown_keeps_shared_objects_until_the_last_context() {
    let (share, mut a, b) = shared_pair();
    let texture = texture_2d(&mut a, gl::GL_RGBA8);
    let framebuffer = attach_color(&mut a, texture);

    a.teardown();
    assert_eq!(share.context_count(), 1);
    assert!(!share.borrow().is_live(Handle(framebuffer)));
    assert!(share.borrow().is_live(Handle(texture)));
    assert!(b.is_texture(texture));

    drop(b);
    assert_eq!(share.context_count(), 0);
    assert!(!share.borrow().is_live(Handle(texture)));
    assert!(share.borrow().live_handles().is_empty());
}

#[test]
fn programs_are_shared_and_checked_by_kind() {
    let (share, mut a, mut b) = shared_pair();
    let program = a.create_program();
    b.use_program(program.get());
    assert_eq!(b.get_error(), gl::GL_NO_ERROR);
    assert_eq!(b.current_program(), program);

    let texture = texture_2d(&mut a, gl::GL_RGBA8);
    b.use_program(texture);
    assert_eq!(b.get_error(), gl::GL_INVALID_OPERATION);

    assert_eq!(
        share.borrow().entry(program).map(|e| e.kind()),
        Some(ObjectKind::Program)
    );

    a.delete_program(program.get());
    assert_eq!(b.current_program(), Handle::NONE);
    assert!(share.borrow().entry(program).is_none());
}
