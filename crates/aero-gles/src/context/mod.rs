//! The command entry surface.
//!
//! Every command validates completely against the current state before anything is mutated.
//! A rejected command records one error in the context's queue and has no other effect.

mod draw;
mod framebuffer;
mod objects;

use tracing::{debug, trace, warn};

use crate::config::ContextConfig;
use crate::dispatch::{Dispatcher, NullDispatcher};
use crate::enums::{FramebufferTarget, TextureTarget};
use crate::error::{ErrorQueue, GlError, ValidationError};
use crate::gl;
use crate::registry::{ContextId, Handle, ShareGroup};
use crate::state::{ContextState, GenericAttrib};
use crate::stats::ContextStats;
use crate::validation::{self, ValidationContext};

pub struct Context<D: Dispatcher = NullDispatcher> {
    id: ContextId,
    share: ShareGroup,
    config: ContextConfig,
    state: ContextState,
    errors: ErrorQueue,
    stats: ContextStats,
    dispatcher: D,
    torn_down: bool,
}

impl<D: Dispatcher> Context<D> {
    /// Creates a context with its own share group.
    pub fn new(config: ContextConfig, dispatcher: D) -> Self {
        Self::with_share_group(&ShareGroup::new(), config, dispatcher)
    }

    /// Creates a context that shares textures, renderbuffers and programs with every other
    /// context of `share`.
    pub fn with_share_group(share: &ShareGroup, config: ContextConfig, mut dispatcher: D) -> Self {
        let id = share.borrow_mut().register_context();
        if let Some(surface) = &config.default_surface {
            dispatcher.default_surface(surface);
        }
        debug!(
            context = %id,
            version = ?config.client_version,
            extensions = ?config.extensions,
            "created GLES context"
        );

        Self {
            id,
            share: share.clone(),
            state: ContextState::new(&config.limits),
            config,
            errors: ErrorQueue::new(),
            stats: ContextStats::default(),
            dispatcher,
            torn_down: false,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn share_group(&self) -> &ShareGroup {
        &self.share
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn pending_errors(&self) -> &ErrorQueue {
        &self.errors
    }

    /// `glGetError`: pops the oldest pending error, `GL_NO_ERROR` when there is none.
    pub fn get_error(&mut self) -> u32 {
        self.errors.pop().map_or(gl::GL_NO_ERROR, GlError::code)
    }

    /// Like [`Self::get_error`] but keeps `InvalidHandle` distinct from `InvalidOperation`.
    pub fn take_error(&mut self) -> Option<GlError> {
        self.errors.pop()
    }

    /// Runs `check` against the current state and records its error, if any. Returns whether
    /// the command would be accepted.
    pub fn validate<T>(
        &mut self,
        command: &'static str,
        check: impl FnOnce(&mut ValidationContext<'_>) -> Result<T, ValidationError>,
    ) -> bool {
        self.execute(command, check).is_some()
    }

    /// Validates and applies the registry side of a command. `run` sees the state as it was
    /// before the command; state and dispatcher updates happen on the returned value.
    fn execute<T>(
        &mut self,
        command: &'static str,
        run: impl FnOnce(&mut ValidationContext<'_>) -> Result<T, ValidationError>,
    ) -> Option<T> {
        let mut registry = self.share.borrow_mut();
        let mut cx = ValidationContext::new(&self.state, &mut registry, &self.config, self.id);
        let result = run(&mut cx);
        let (cache_hits, recomputations) = (cx.cache_hits, cx.recomputations);
        drop(cx);
        drop(registry);

        self.stats.record_evaluations(cache_hits, recomputations);
        self.finish(command, result)
    }

    fn finish<T>(&mut self, command: &'static str, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.stats.record_outcome(true);
                trace!(context = %self.id, command, "accepted command");
                Some(value)
            }
            Err(err) => {
                let kind = err.kind();
                debug!(
                    context = %self.id,
                    command,
                    error = %err,
                    code = format_args!("0x{:04X}", kind.code()),
                    "rejected command"
                );
                self.stats.record_outcome(false);
                self.errors.push(kind);
                None
            }
        }
    }

    fn live(&self, handle: Handle) -> Handle {
        if self.share.borrow().is_live(handle) {
            handle
        } else {
            Handle::NONE
        }
    }

    /// Framebuffer bound to `target`; a deleted binding reads as 0.
    pub fn framebuffer_binding(&self, target: FramebufferTarget) -> Handle {
        self.live(self.state.framebuffer_binding(target))
    }

    pub fn texture_binding(&self, unit: u32, target: TextureTarget) -> Handle {
        self.live(self.state.texture_binding(unit, target))
    }

    pub fn renderbuffer_binding(&self) -> Handle {
        self.live(self.state.renderbuffer_binding())
    }

    pub fn current_program(&self) -> Handle {
        self.live(self.state.program())
    }

    // -----------------------------------------------------------------------------------------
    // Capabilities and simple state
    // -----------------------------------------------------------------------------------------

    pub fn enable(&mut self, cap: u32) {
        self.set_capability("glEnable", cap, true);
    }

    pub fn disable(&mut self, cap: u32) {
        self.set_capability("glDisable", cap, false);
    }

    fn set_capability(&mut self, command: &'static str, cap: u32, enabled: bool) {
        let Some(cap) = self.execute(command, |cx| validation::validate_set_capability(cx, cap)) else {
            return;
        };
        if self.state.set_capability(cap, enabled) {
            self.dispatcher.capability_changed(cap, enabled);
        }
    }

    /// `glIsEnabled`. Returns `false` when the capability is rejected.
    pub fn is_enabled(&mut self, cap: u32) -> bool {
        self.execute("glIsEnabled", |cx| validation::validate_is_enabled(cx, cap))
            .is_some_and(|cap| self.state.capability(cap))
    }

    /// `glGetBooleanv` for capability tokens.
    pub fn get_booleanv(&mut self, pname: u32) -> bool {
        self.execute("glGetBooleanv", |cx| validation::validate_is_enabled(cx, pname))
            .is_some_and(|cap| self.state.capability(cap))
    }

    pub fn active_texture(&mut self, unit: u32) {
        if let Some(index) = self.execute("glActiveTexture", |cx| {
            validation::validate_active_texture(cx, unit)
        }) {
            self.state.set_active_texture_unit(index);
        }
    }

    pub fn clamp_color(&mut self, target: u32, clamp: u32) {
        if let Some(mode) = self.execute("glClampColor", |cx| {
            validation::validate_clamp_color(cx, target, clamp)
        }) {
            self.state.set_clamp_read_color(mode);
        }
    }

    pub fn vertex_attrib_i4i(&mut self, index: u32, x: i32, y: i32, z: i32, w: i32) {
        self.vertex_attrib_i("glVertexAttribI4i", index, GenericAttrib::Int([x, y, z, w]));
    }

    pub fn vertex_attrib_i4ui(&mut self, index: u32, x: u32, y: u32, z: u32, w: u32) {
        self.vertex_attrib_i("glVertexAttribI4ui", index, GenericAttrib::Uint([x, y, z, w]));
    }

    fn vertex_attrib_i(&mut self, command: &'static str, index: u32, value: GenericAttrib) {
        if let Some((index, value)) = self.execute(command, |cx| {
            validation::validate_vertex_attrib_i(cx, index, value)
        }) {
            self.state.set_generic_attrib(index, value);
        }
    }

    // -----------------------------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------------------------

    /// Destroys the context. Its framebuffers are deleted; shared objects are deleted when the
    /// last context of the share group goes away.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let mut registry = self.share.borrow_mut();
        let mut deleted = Vec::new();
        for framebuffer in registry.framebuffers_owned_by(self.id) {
            if let Ok(Some(destroyed)) = registry.destroy(framebuffer) {
                deleted.push(destroyed);
            }
        }
        let remaining = registry.unregister_context(self.id);
        if remaining == 0 {
            for handle in registry.live_handles() {
                if let Ok(Some(destroyed)) = registry.destroy(handle) {
                    deleted.push(destroyed);
                }
            }
        }
        drop(registry);

        for destroyed in &deleted {
            self.dispatcher.object_deleted(destroyed.handle, destroyed.kind);
        }
        if !self.errors.is_empty() {
            warn!(
                context = %self.id,
                pending = self.errors.len(),
                "tearing down GLES context with unread errors"
            );
        }
        debug!(
            context = %self.id,
            deleted = deleted.len(),
            remaining_contexts = remaining,
            "tore down GLES context"
        );
    }
}

impl<D: Dispatcher> Drop for Context<D> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<D: Dispatcher + std::fmt::Debug> std::fmt::Debug for Context<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("errors", &self.errors)
            .field("stats", &self.stats)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
