//! Attachment commands and completeness queries.

use super::Context;
use crate::dispatch::Dispatcher;
use crate::validation::{self, AttachCommand, ValidationContext};
use crate::error::ValidationError;

impl<D: Dispatcher> Context<D> {
    fn attach(
        &mut self,
        command: &'static str,
        check: impl FnOnce(&mut ValidationContext<'_>) -> Result<AttachCommand, ValidationError>,
    ) {
        let Some((attach, current)) = self.execute(command, |cx| {
            let attach = check(cx)?;
            cx.registry
                .attach(attach.framebuffer, attach.point, attach.source)?;
            let current = cx
                .registry
                .graph()
                .attachment(attach.framebuffer, attach.point)
                .copied();
            Ok((attach, current))
        }) else {
            return;
        };
        self.dispatcher
            .attachment_changed(attach.framebuffer, attach.point, current.as_ref());
    }

    pub fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: u32,
        level: i32,
    ) {
        self.attach("glFramebufferTexture2D", |cx| {
            validation::validate_framebuffer_texture_2d(cx, target, attachment, textarget, texture, level)
        });
    }

    pub fn framebuffer_texture_layer(
        &mut self,
        target: u32,
        attachment: u32,
        texture: u32,
        level: i32,
        layer: i32,
    ) {
        self.attach("glFramebufferTextureLayer", |cx| {
            validation::validate_framebuffer_texture_layer(cx, target, attachment, texture, level, layer)
        });
    }

    pub fn framebuffer_texture_3d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: u32,
        level: i32,
        zoffset: i32,
    ) {
        self.attach("glFramebufferTexture3D", |cx| {
            validation::validate_framebuffer_texture_3d(
                cx, target, attachment, textarget, texture, level, zoffset,
            )
        });
    }

    pub fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: u32,
    ) {
        self.attach("glFramebufferRenderbuffer", |cx| {
            validation::validate_framebuffer_renderbuffer(
                cx,
                target,
                attachment,
                renderbuffer_target,
                renderbuffer,
            )
        });
    }

    /// `glCheckFramebufferStatus`. Returns 0 when `target` is rejected.
    pub fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        self.execute("glCheckFramebufferStatus", |cx| {
            validation::validate_check_framebuffer_status(cx, target)
        })
        .map_or(0, |status| status.to_gl())
    }
}
