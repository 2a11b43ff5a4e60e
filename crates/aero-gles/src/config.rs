use bitflags::bitflags;
use thiserror::Error;

use crate::format::InternalFormat;

const CLIENT_VERSION_ENV: &str = "AERO_GLES_CLIENT_VERSION";
const DISABLE_SRGB_WRITE_CONTROL_ENV: &str = "AERO_GLES_DISABLE_SRGB_WRITE_CONTROL";
const DISABLE_SRGB_ENV: &str = "AERO_GLES_DISABLE_SRGB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClientVersion {
    Es2,
    Es3,
}

impl ClientVersion {
    pub fn is_es3(self) -> bool {
        self >= Self::Es3
    }
}

bitflags! {
    /// Extensions granted to a context.
    ///
    /// Discovery happens outside of this crate; the context only consults the resolved set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Extensions: u32 {
        /// `GL_EXT_sRGB`
        const SRGB = 1 << 0;
        /// `GL_EXT_sRGB_write_control`
        const SRGB_WRITE_CONTROL = 1 << 1;
        /// `GL_EXT_color_buffer_float`
        const COLOR_BUFFER_FLOAT = 1 << 2;
        /// `GL_OES_depth_texture`
        const DEPTH_TEXTURE = 1 << 3;
        /// `GL_OES_packed_depth_stencil`
        const PACKED_DEPTH_STENCIL = 1 << 4;
        /// `GL_OES_rgb8_rgba8`
        const RGB8_RGBA8 = 1 << 5;
        /// `GL_OES_depth24`
        const DEPTH24 = 1 << 6;
    }
}

/// Which API version and extensions a context exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSet {
    pub version: ClientVersion,
    pub extensions: Extensions,
}

impl FeatureSet {
    pub fn new(version: ClientVersion, extensions: Extensions) -> Self {
        Self {
            version,
            extensions,
        }
    }

    pub fn is_es3(self) -> bool {
        self.version.is_es3()
    }

    pub fn has(self, extension: Extensions) -> bool {
        self.extensions.contains(extension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_texture_size: u32,
    pub max_cube_map_texture_size: u32,
    pub max_3d_texture_size: u32,
    pub max_array_texture_layers: u32,
    pub max_renderbuffer_size: u32,
    pub max_color_attachments: u32,
    pub max_samples: u32,
    pub max_combined_texture_image_units: u32,
    pub max_vertex_attribs: u32,
}

impl Limits {
    pub fn for_version(version: ClientVersion) -> Self {
        match version {
            ClientVersion::Es2 => Self {
                max_texture_size: 4096,
                max_cube_map_texture_size: 4096,
                max_3d_texture_size: 0,
                max_array_texture_layers: 0,
                max_renderbuffer_size: 4096,
                max_color_attachments: 1,
                max_samples: 0,
                max_combined_texture_image_units: 16,
                max_vertex_attribs: 16,
            },
            ClientVersion::Es3 => Self {
                max_texture_size: 4096,
                max_cube_map_texture_size: 4096,
                max_3d_texture_size: 256,
                max_array_texture_layers: 256,
                max_renderbuffer_size: 4096,
                max_color_attachments: 4,
                max_samples: 4,
                max_combined_texture_image_units: 32,
                max_vertex_attribs: 16,
            },
        }
    }
}

/// Description of the window-system surface backing framebuffer 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesc {
    pub width: u32,
    pub height: u32,
    pub format: InternalFormat,
}

impl Default for SurfaceDesc {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            format: InternalFormat::Rgba8,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {CLIENT_VERSION_ENV} value {0:?} (expected 2 or 3)")]
    InvalidClientVersion(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub client_version: ClientVersion,
    pub extensions: Extensions,
    pub limits: Limits,
    /// Surface for the default framebuffer. `None` creates a surfaceless context, for which
    /// framebuffer 0 is `GL_FRAMEBUFFER_UNDEFINED`.
    pub default_surface: Option<SurfaceDesc>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::for_version(ClientVersion::Es3)
    }
}

impl ContextConfig {
    pub fn for_version(client_version: ClientVersion) -> Self {
        Self {
            client_version,
            extensions: Extensions::all(),
            limits: Limits::for_version(client_version),
            default_surface: Some(SurfaceDesc::default()),
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn without_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions.remove(extensions);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_default_surface(mut self, surface: Option<SurfaceDesc>) -> Self {
        self.default_surface = surface;
        self
    }

    pub fn features(&self) -> FeatureSet {
        FeatureSet::new(self.client_version, self.extensions)
    }

    /// Builds a config from the process environment.
    ///
    /// - `AERO_GLES_CLIENT_VERSION`: `2` or `3` (default `3`)
    /// - `AERO_GLES_DISABLE_SRGB_WRITE_CONTROL`: drop `GL_EXT_sRGB_write_control`
    /// - `AERO_GLES_DISABLE_SRGB`: drop `GL_EXT_sRGB`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_version = match lookup(CLIENT_VERSION_ENV) {
            None => ClientVersion::Es3,
            Some(raw) => match raw.trim() {
                "" | "3" | "3.0" => ClientVersion::Es3,
                "2" | "2.0" => ClientVersion::Es2,
                _ => return Err(ConfigError::InvalidClientVersion(raw)),
            },
        };

        let mut config = Self::for_version(client_version);
        if truthy(lookup(DISABLE_SRGB_WRITE_CONTROL_ENV)) {
            config.extensions.remove(Extensions::SRGB_WRITE_CONTROL);
        }
        if truthy(lookup(DISABLE_SRGB_ENV)) {
            config.extensions.remove(Extensions::SRGB);
        }
        Ok(config)
    }
}

fn truthy(raw: Option<String>) -> bool {
    let Some(raw) = raw else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}
