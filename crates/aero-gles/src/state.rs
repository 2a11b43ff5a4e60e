//! Per-context state: capability flags and binding points.
//!
//! The store holds raw handles. Whether a handle still names a live object is decided by the
//! share group's registry when the binding is read.

use bitflags::bitflags;

use crate::config::{Extensions, FeatureSet, Limits};
use crate::enums::{Capability, ClampMode, FramebufferTarget, TextureTarget};
use crate::registry::Handle;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u16 {
        const BLEND = 1 << 0;
        const CULL_FACE = 1 << 1;
        const DEPTH_TEST = 1 << 2;
        const DITHER = 1 << 3;
        const POLYGON_OFFSET_FILL = 1 << 4;
        const SAMPLE_ALPHA_TO_COVERAGE = 1 << 5;
        const SAMPLE_COVERAGE = 1 << 6;
        const SCISSOR_TEST = 1 << 7;
        const STENCIL_TEST = 1 << 8;
        const RASTERIZER_DISCARD = 1 << 9;
        const PRIMITIVE_RESTART_FIXED_INDEX = 1 << 10;
        const FRAMEBUFFER_SRGB = 1 << 11;
    }
}

impl CapabilityFlags {
    pub fn from_capability(cap: Capability) -> Self {
        match cap {
            Capability::Blend => Self::BLEND,
            Capability::CullFace => Self::CULL_FACE,
            Capability::DepthTest => Self::DEPTH_TEST,
            Capability::Dither => Self::DITHER,
            Capability::PolygonOffsetFill => Self::POLYGON_OFFSET_FILL,
            Capability::SampleAlphaToCoverage => Self::SAMPLE_ALPHA_TO_COVERAGE,
            Capability::SampleCoverage => Self::SAMPLE_COVERAGE,
            Capability::ScissorTest => Self::SCISSOR_TEST,
            Capability::StencilTest => Self::STENCIL_TEST,
            Capability::RasterizerDiscard => Self::RASTERIZER_DISCARD,
            Capability::PrimitiveRestartFixedIndex => Self::PRIMITIVE_RESTART_FIXED_INDEX,
            Capability::FramebufferSrgb => Self::FRAMEBUFFER_SRGB,
        }
    }

    pub fn initial() -> Self {
        Capability::ALL
            .into_iter()
            .filter(|cap| cap.initially_enabled())
            .fold(Self::empty(), |acc, cap| acc | Self::from_capability(cap))
    }
}

/// Current value of a generic vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenericAttrib {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
}

impl Default for GenericAttrib {
    fn default() -> Self {
        Self::Float([0.0, 0.0, 0.0, 1.0])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TextureUnit {
    texture_2d: Handle,
    cube_map: Handle,
    texture_3d: Handle,
    texture_2d_array: Handle,
}

impl TextureUnit {
    fn slot(&mut self, target: TextureTarget) -> &mut Handle {
        match target {
            TextureTarget::Texture2D => &mut self.texture_2d,
            TextureTarget::CubeMap => &mut self.cube_map,
            TextureTarget::Texture3D => &mut self.texture_3d,
            TextureTarget::Texture2DArray => &mut self.texture_2d_array,
        }
    }

    fn get(&self, target: TextureTarget) -> Handle {
        match target {
            TextureTarget::Texture2D => self.texture_2d,
            TextureTarget::CubeMap => self.cube_map,
            TextureTarget::Texture3D => self.texture_3d,
            TextureTarget::Texture2DArray => self.texture_2d_array,
        }
    }

    fn clear(&mut self, handle: Handle) -> bool {
        let mut cleared = false;
        for slot in [
            &mut self.texture_2d,
            &mut self.cube_map,
            &mut self.texture_3d,
            &mut self.texture_2d_array,
        ] {
            if *slot == handle {
                *slot = Handle::NONE;
                cleared = true;
            }
        }
        cleared
    }
}

#[derive(Debug, Clone)]
pub struct ContextState {
    capabilities: CapabilityFlags,
    active_texture_unit: u32,
    texture_units: Vec<TextureUnit>,
    draw_framebuffer: Handle,
    read_framebuffer: Handle,
    renderbuffer: Handle,
    program: Handle,
    clamp_read_color: ClampMode,
    generic_attribs: Vec<GenericAttrib>,
}

impl ContextState {
    pub fn new(limits: &Limits) -> Self {
        Self {
            capabilities: CapabilityFlags::initial(),
            active_texture_unit: 0,
            texture_units: vec![TextureUnit::default(); limits.max_combined_texture_image_units as usize],
            draw_framebuffer: Handle::NONE,
            read_framebuffer: Handle::NONE,
            renderbuffer: Handle::NONE,
            program: Handle::NONE,
            clamp_read_color: ClampMode::default(),
            generic_attribs: vec![GenericAttrib::default(); limits.max_vertex_attribs as usize],
        }
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    pub fn capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(CapabilityFlags::from_capability(cap))
    }

    /// Returns whether the flag changed.
    pub fn set_capability(&mut self, cap: Capability, enabled: bool) -> bool {
        let flag = CapabilityFlags::from_capability(cap);
        let before = self.capabilities;
        self.capabilities.set(flag, enabled);
        before != self.capabilities
    }

    /// Whether writes to sRGB images are encoded. Without `GL_EXT_sRGB_write_control` the
    /// encoding cannot be turned off.
    pub fn srgb_writes_encoded(&self, features: FeatureSet) -> bool {
        !features.has(Extensions::SRGB_WRITE_CONTROL) || self.capability(Capability::FramebufferSrgb)
    }

    pub fn active_texture_unit(&self) -> u32 {
        self.active_texture_unit
    }

    pub(crate) fn set_active_texture_unit(&mut self, unit: u32) {
        self.active_texture_unit = unit;
    }

    pub fn texture_unit_count(&self) -> u32 {
        self.texture_units.len() as u32
    }

    pub fn texture_binding(&self, unit: u32, target: TextureTarget) -> Handle {
        self.texture_units
            .get(unit as usize)
            .map_or(Handle::NONE, |slots| slots.get(target))
    }

    /// Texture bound to `target` on the active unit.
    pub fn bound_texture(&self, target: TextureTarget) -> Handle {
        self.texture_binding(self.active_texture_unit, target)
    }

    pub(crate) fn bind_texture(&mut self, target: TextureTarget, handle: Handle) {
        if let Some(unit) = self.texture_units.get_mut(self.active_texture_unit as usize) {
            *unit.slot(target) = handle;
        }
    }

    /// `GL_FRAMEBUFFER` reads back the draw binding.
    pub fn framebuffer_binding(&self, target: FramebufferTarget) -> Handle {
        match target {
            FramebufferTarget::Framebuffer | FramebufferTarget::Draw => self.draw_framebuffer,
            FramebufferTarget::Read => self.read_framebuffer,
        }
    }

    pub(crate) fn bind_framebuffer(&mut self, target: FramebufferTarget, handle: Handle) {
        match target {
            FramebufferTarget::Framebuffer => {
                self.draw_framebuffer = handle;
                self.read_framebuffer = handle;
            }
            FramebufferTarget::Draw => self.draw_framebuffer = handle,
            FramebufferTarget::Read => self.read_framebuffer = handle,
        }
    }

    pub fn renderbuffer_binding(&self) -> Handle {
        self.renderbuffer
    }

    pub(crate) fn bind_renderbuffer(&mut self, handle: Handle) {
        self.renderbuffer = handle;
    }

    pub fn program(&self) -> Handle {
        self.program
    }

    pub(crate) fn use_program(&mut self, handle: Handle) {
        self.program = handle;
    }

    pub fn clamp_read_color(&self) -> ClampMode {
        self.clamp_read_color
    }

    pub(crate) fn set_clamp_read_color(&mut self, mode: ClampMode) {
        self.clamp_read_color = mode;
    }

    pub fn generic_attrib(&self, index: u32) -> Option<GenericAttrib> {
        self.generic_attribs.get(index as usize).copied()
    }

    pub(crate) fn set_generic_attrib(&mut self, index: u32, value: GenericAttrib) {
        if let Some(slot) = self.generic_attribs.get_mut(index as usize) {
            *slot = value;
        }
    }

    /// Resets every binding point that holds `handle` to 0. Returns whether any did.
    pub(crate) fn unbind_object(&mut self, handle: Handle) -> bool {
        if handle.is_none() {
            return false;
        }
        let mut cleared = false;
        for unit in &mut self.texture_units {
            cleared |= unit.clear(handle);
        }
        for slot in [
            &mut self.draw_framebuffer,
            &mut self.read_framebuffer,
            &mut self.renderbuffer,
            &mut self.program,
        ] {
            if *slot == handle {
                *slot = Handle::NONE;
                cleared = true;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientVersion;

    fn state() -> ContextState {
        ContextState::new(&Limits::for_version(ClientVersion::Es3))
    }

    #[test]
    fn dither_and_srgb_write_control_start_enabled() {
        let state = state();
        assert!(state.capability(Capability::Dither));
        assert!(state.capability(Capability::FramebufferSrgb));
        assert!(!state.capability(Capability::Blend));
    }

    #[test]
    fn set_capability_reports_changes() {
        let mut state = state();
        assert!(state.set_capability(Capability::Blend, true));
        assert!(!state.set_capability(Capability::Blend, true));
        assert!(state.capability(Capability::Blend));
        assert!(state.set_capability(Capability::Blend, false));
    }

    #[test]
    fn framebuffer_target_binds_draw_and_read() {
        let mut state = state();
        state.bind_framebuffer(FramebufferTarget::Framebuffer, Handle(3));
        assert_eq!(state.framebuffer_binding(FramebufferTarget::Draw), Handle(3));
        assert_eq!(state.framebuffer_binding(FramebufferTarget::Read), Handle(3));

        state.bind_framebuffer(FramebufferTarget::Read, Handle(4));
        assert_eq!(state.framebuffer_binding(FramebufferTarget::Framebuffer), Handle(3));
        assert_eq!(state.framebuffer_binding(FramebufferTarget::Read), Handle(4));
    }

    #[test]
    fn texture_bindings_are_per_unit() {
        let mut state = state();
        state.bind_texture(TextureTarget::Texture2D, Handle(7));
        state.set_active_texture_unit(1);
        assert_eq!(state.bound_texture(TextureTarget::Texture2D), Handle::NONE);
        assert_eq!(state.texture_binding(0, TextureTarget::Texture2D), Handle(7));
    }

    #[test]
    fn unbind_object_clears_every_binding_point() {
        let mut state = state();
        state.bind_texture(TextureTarget::CubeMap, Handle(9));
        state.bind_renderbuffer(Handle(9));
        assert!(state.unbind_object(Handle(9)));
        assert_eq!(state.bound_texture(TextureTarget::CubeMap), Handle::NONE);
        assert_eq!(state.renderbuffer_binding(), Handle::NONE);
        assert!(!state.unbind_object(Handle(9)));
    }

    #[test]
    fn srgb_encoding_is_forced_without_write_control() {
        let mut state = state();
        state.set_capability(Capability::FramebufferSrgb, false);
        let with = FeatureSet::new(ClientVersion::Es3, Extensions::all());
        let without = FeatureSet::new(ClientVersion::Es3, Extensions::SRGB);
        assert!(!state.srgb_writes_encoded(with));
        assert!(state.srgb_writes_encoded(without));
    }
}
