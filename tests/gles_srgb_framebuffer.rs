use aero_gles::gl;
use aero_gles::validation::TexImage2DArgs;
use aero_gles::{ClientVersion, Context, ContextConfig, Extensions, GlError, SoftwareDispatcher};
use pretty_assertions::assert_eq;

const LINEAR_COLOR: [u8; 4] = [13, 54, 133, 255];
const ENCODED_COLOR: [u8; 4] = [64, 127, 191, 255];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn context() -> Context<SoftwareDispatcher> {
    context_for(ClientVersion::Es3)
}

fn context_for(version: ClientVersion) -> Context<SoftwareDispatcher> {
    init_tracing();
    let mut ctx = Context::new(ContextConfig::for_version(version), SoftwareDispatcher::new());
    ctx.dispatcher_mut().set_fragment_color_u8(LINEAR_COLOR);
    ctx
}

/// Creates a framebuffer with a single 1x1 texture of `format` on color attachment 0 and
/// leaves it bound.
///
/// Sized formats go through `glTexStorage2D`. The unsized ES2 formats (`GL_RGBA`,
/// `GL_SRGB_ALPHA_EXT`) go through `glTexImage2D` with a matching client format.
fn framebuffer_with_texture(ctx: &mut Context<SoftwareDispatcher>, format: u32) -> (u32, u32) {
    let texture = ctx.gen_textures(1)[0].get();
    ctx.bind_texture(gl::GL_TEXTURE_2D, texture);
    match format {
        gl::GL_RGBA | gl::GL_SRGB_ALPHA_EXT => ctx.tex_image_2d(&TexImage2DArgs {
            target: gl::GL_TEXTURE_2D,
            level: 0,
            internal_format: format as i32,
            width: 1,
            height: 1,
            border: 0,
            format,
            ty: gl::GL_UNSIGNED_BYTE,
            pixels: None,
        }),
        _ => ctx.tex_storage_2d(gl::GL_TEXTURE_2D, 1, format, 1, 1),
    }

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
    (framebuffer, texture)
}

fn draw_and_read(ctx: &mut Context<SoftwareDispatcher>) -> [u8; 4] {
    ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    let mut pixel = [0u8; 4];
    ctx.read_pixels(0, 0, 1, 1, gl::GL_RGBA, gl::GL_UNSIGNED_BYTE, &mut pixel);
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    pixel
}

fn assert_near(actual: [u8; 4], expected: [u8; 4]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            a.abs_diff(e) <= 1,
            "pixel {actual:?} differs from {expected:?} by more than 1"
        );
    }
}

#[test]
fn srgb_write_control_toggles_encoding() {
    let mut ctx = context();
    framebuffer_with_texture(&mut ctx, gl::GL_SRGB8_ALPHA8);
    assert_eq!(
        ctx.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_COMPLETE
    );

    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);

    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
}

#[test]
fn linear_attachments_are_never_encoded() {
    let mut ctx = context();
    framebuffer_with_texture(&mut ctx, gl::GL_RGBA8);

    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
}

#[test]
fn write_control_is_global_across_framebuffers() {
    let mut ctx = context();
    let (srgb_fb, _) = framebuffer_with_texture(&mut ctx, gl::GL_SRGB8_ALPHA8);
    let (linear_fb, _) = framebuffer_with_texture(&mut ctx, gl::GL_RGBA8);

    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, srgb_fb);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, linear_fb);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);

    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, srgb_fb);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, linear_fb);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, srgb_fb);
    assert!(ctx.is_enabled(gl::GL_FRAMEBUFFER_SRGB_EXT));
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);
}

#[test]
fn encoding_is_forced_without_the_write_control_extension() {
    init_tracing();
    let config = ContextConfig::default().without_extensions(Extensions::SRGB_WRITE_CONTROL);
    let mut ctx = Context::new(config, SoftwareDispatcher::new());
    ctx.dispatcher_mut().set_fragment_color_u8(LINEAR_COLOR);
    framebuffer_with_texture(&mut ctx, gl::GL_SRGB8_ALPHA8);

    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);
}

#[test]
fn deleting_the_only_attachment_blocks_draw_and_read() {
    let mut ctx = context();
    let (framebuffer, texture) = framebuffer_with_texture(&mut ctx, gl::GL_SRGB8_ALPHA8);
    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);

    ctx.framebuffer_texture_2d(gl::GL_FRAMEBUFFER, gl::GL_COLOR_ATTACHMENT0, gl::GL_TEXTURE_2D, 0, 0);
    ctx.delete_textures(&[texture]);
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    assert!(!ctx.is_texture(texture));
    assert!(ctx.is_framebuffer(framebuffer));
    assert_ne!(
        ctx.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_COMPLETE
    );

    let draws_before = ctx.dispatcher().counters().draws;
    ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::GL_INVALID_FRAMEBUFFER_OPERATION);
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);

    let mut pixel = [0u8; 4];
    ctx.read_pixels(0, 0, 1, 1, gl::GL_RGBA, gl::GL_UNSIGNED_BYTE, &mut pixel);
    assert_eq!(ctx.take_error(), Some(GlError::InvalidFramebufferOperation));
    assert_eq!(ctx.take_error(), None);
    assert_eq!(pixel, [0; 4]);
    assert_eq!(ctx.dispatcher().counters().draws, draws_before);
}

#[test]
fn deleting_an_attached_texture_detaches_it() {
    let mut ctx = context();
    let (_, texture) = framebuffer_with_texture(&mut ctx, gl::GL_RGBA8);

    ctx.delete_textures(&[texture]);
    assert_eq!(
        ctx.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
    );
    ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::GL_INVALID_FRAMEBUFFER_OPERATION);
}

#[test]
fn capability_round_trip_and_unknown_capabilities() {
    let mut ctx = context();
    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert!(ctx.is_enabled(gl::GL_FRAMEBUFFER_SRGB_EXT));
    assert!(ctx.get_booleanv(gl::GL_FRAMEBUFFER_SRGB_EXT));
    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert!(!ctx.is_enabled(gl::GL_FRAMEBUFFER_SRGB_EXT));
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);

    let before = ctx.state().capabilities();
    ctx.enable(0x0BAD);
    assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);
    assert_eq!(ctx.state().capabilities(), before);
}

#[test]
fn repeated_draws_reuse_the_cached_status() {
    let mut ctx = context();
    framebuffer_with_texture(&mut ctx, gl::GL_SRGB8_ALPHA8);

    for _ in 0..3 {
        ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    }
    let stats = ctx.stats();
    assert_eq!(stats.completeness_recomputations, 1);
    assert_eq!(stats.completeness_cache_hits, 2);
    assert_eq!(stats.draws_dispatched, 3);

    // Toggling write control changes how draws encode, not completeness.
    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.stats().completeness_recomputations, 1);
}

#[test]
fn es2_srgb_alpha_texture_toggles_encoding() {
    let mut ctx = context_for(ClientVersion::Es2);
    framebuffer_with_texture(&mut ctx, gl::GL_SRGB_ALPHA_EXT);
    assert_eq!(
        ctx.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_COMPLETE
    );

    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);

    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
}

#[test]
fn es2_write_control_is_global_across_framebuffers() {
    let mut ctx = context_for(ClientVersion::Es2);
    let (srgb_fb, _) = framebuffer_with_texture(&mut ctx, gl::GL_SRGB_ALPHA_EXT);
    let (linear_fb, _) = framebuffer_with_texture(&mut ctx, gl::GL_RGBA);

    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, srgb_fb);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, linear_fb);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);

    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, srgb_fb);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);
    ctx.bind_framebuffer(gl::GL_FRAMEBUFFER, linear_fb);
    assert_eq!(draw_and_read(&mut ctx), LINEAR_COLOR);
}

#[test]
fn es2_encoding_is_forced_without_the_write_control_extension() {
    init_tracing();
    let config = ContextConfig::for_version(ClientVersion::Es2)
        .without_extensions(Extensions::SRGB_WRITE_CONTROL);
    let mut ctx = Context::new(config, SoftwareDispatcher::new());
    ctx.dispatcher_mut().set_fragment_color_u8(LINEAR_COLOR);
    framebuffer_with_texture(&mut ctx, gl::GL_SRGB_ALPHA_EXT);

    ctx.disable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_eq!(ctx.get_error(), gl::GL_INVALID_ENUM);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);
}

#[test]
fn es2_deleting_the_only_attachment_blocks_draw_and_read() {
    let mut ctx = context_for(ClientVersion::Es2);
    let (framebuffer, texture) = framebuffer_with_texture(&mut ctx, gl::GL_SRGB_ALPHA_EXT);
    ctx.enable(gl::GL_FRAMEBUFFER_SRGB_EXT);
    assert_near(draw_and_read(&mut ctx), ENCODED_COLOR);

    ctx.framebuffer_texture_2d(gl::GL_FRAMEBUFFER, gl::GL_COLOR_ATTACHMENT0, gl::GL_TEXTURE_2D, 0, 0);
    ctx.delete_textures(&[texture]);
    assert_eq!(ctx.get_error(), gl::GL_NO_ERROR);
    assert!(!ctx.is_texture(texture));
    assert!(ctx.is_framebuffer(framebuffer));
    assert_eq!(
        ctx.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
    );

    let draws_before = ctx.dispatcher().counters().draws;
    ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.take_error(), Some(GlError::InvalidFramebufferOperation));

    let mut pixel = [0u8; 4];
    ctx.read_pixels(0, 0, 1, 1, gl::GL_RGBA, gl::GL_UNSIGNED_BYTE, &mut pixel);
    assert_eq!(ctx.take_error(), Some(GlError::InvalidFramebufferOperation));
    assert_eq!(ctx.take_error(), None);
    assert_eq!(pixel, [0; 4]);
    assert_eq!(ctx.dispatcher().counters().draws, draws_before);
}

#[test]
fn es2_deleting_an_attached_texture_detaches_it() {
    let mut ctx = context_for(ClientVersion::Es2);
    let (_, texture) = framebuffer_with_texture(&mut ctx, gl::GL_SRGB_ALPHA_EXT);

    ctx.delete_textures(&[texture]);
    assert_eq!(
        ctx.check_framebuffer_status(gl::GL_FRAMEBUFFER),
        gl::GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
    );
    ctx.draw_arrays(gl::GL_TRIANGLES, 0, 3);
    assert_eq!(ctx.get_error(), gl::GL_INVALID_FRAMEBUFFER_OPERATION);
}
