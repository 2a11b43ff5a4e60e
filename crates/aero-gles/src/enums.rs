//! Packed forms of the GL enumerants used by the command surface.
//!
//! `from_u32` recognizes a token regardless of context version; whether the token is granted
//! to a particular context is a separate `is_supported` check. Both failures surface as
//! `GL_INVALID_ENUM`.

use bitflags::bitflags;

use crate::config::{Extensions, FeatureSet};
use crate::gl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Blend,
    CullFace,
    DepthTest,
    Dither,
    PolygonOffsetFill,
    SampleAlphaToCoverage,
    SampleCoverage,
    ScissorTest,
    StencilTest,
    RasterizerDiscard,
    PrimitiveRestartFixedIndex,
    FramebufferSrgb,
}

impl Capability {
    pub const ALL: [Capability; 12] = [
        Self::Blend,
        Self::CullFace,
        Self::DepthTest,
        Self::Dither,
        Self::PolygonOffsetFill,
        Self::SampleAlphaToCoverage,
        Self::SampleCoverage,
        Self::ScissorTest,
        Self::StencilTest,
        Self::RasterizerDiscard,
        Self::PrimitiveRestartFixedIndex,
        Self::FramebufferSrgb,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_BLEND => Self::Blend,
            gl::GL_CULL_FACE => Self::CullFace,
            gl::GL_DEPTH_TEST => Self::DepthTest,
            gl::GL_DITHER => Self::Dither,
            gl::GL_POLYGON_OFFSET_FILL => Self::PolygonOffsetFill,
            gl::GL_SAMPLE_ALPHA_TO_COVERAGE => Self::SampleAlphaToCoverage,
            gl::GL_SAMPLE_COVERAGE => Self::SampleCoverage,
            gl::GL_SCISSOR_TEST => Self::ScissorTest,
            gl::GL_STENCIL_TEST => Self::StencilTest,
            gl::GL_RASTERIZER_DISCARD => Self::RasterizerDiscard,
            gl::GL_PRIMITIVE_RESTART_FIXED_INDEX => Self::PrimitiveRestartFixedIndex,
            gl::GL_FRAMEBUFFER_SRGB_EXT => Self::FramebufferSrgb,
            _ => return None,
        })
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Blend => gl::GL_BLEND,
            Self::CullFace => gl::GL_CULL_FACE,
            Self::DepthTest => gl::GL_DEPTH_TEST,
            Self::Dither => gl::GL_DITHER,
            Self::PolygonOffsetFill => gl::GL_POLYGON_OFFSET_FILL,
            Self::SampleAlphaToCoverage => gl::GL_SAMPLE_ALPHA_TO_COVERAGE,
            Self::SampleCoverage => gl::GL_SAMPLE_COVERAGE,
            Self::ScissorTest => gl::GL_SCISSOR_TEST,
            Self::StencilTest => gl::GL_STENCIL_TEST,
            Self::RasterizerDiscard => gl::GL_RASTERIZER_DISCARD,
            Self::PrimitiveRestartFixedIndex => gl::GL_PRIMITIVE_RESTART_FIXED_INDEX,
            Self::FramebufferSrgb => gl::GL_FRAMEBUFFER_SRGB_EXT,
        }
    }

    pub fn is_supported(self, features: FeatureSet) -> bool {
        match self {
            Self::RasterizerDiscard | Self::PrimitiveRestartFixedIndex => features.is_es3(),
            Self::FramebufferSrgb => features.has(Extensions::SRGB_WRITE_CONTROL),
            _ => true,
        }
    }

    /// Initial value on context creation. `GL_EXT_sRGB_write_control` starts enabled so that
    /// sRGB attachments keep encoding for clients unaware of the extension.
    pub fn initially_enabled(self) -> bool {
        matches!(self, Self::Dither | Self::FramebufferSrgb)
    }
}

/// Texture binding targets. A texture's type is fixed to one of these on first bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
    Texture3D,
    Texture2DArray,
}

impl TextureTarget {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_TEXTURE_2D => Self::Texture2D,
            gl::GL_TEXTURE_CUBE_MAP => Self::CubeMap,
            gl::GL_TEXTURE_3D => Self::Texture3D,
            gl::GL_TEXTURE_2D_ARRAY => Self::Texture2DArray,
            _ => return None,
        })
    }

    pub fn is_supported(self, features: FeatureSet) -> bool {
        match self {
            Self::Texture2D | Self::CubeMap => true,
            Self::Texture3D | Self::Texture2DArray => features.is_es3(),
        }
    }

    /// Whether images of this texture type have layers addressable by `framebuffer_texture_layer`.
    pub fn is_layered(self) -> bool {
        matches!(self, Self::Texture3D | Self::Texture2DArray)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Target of a 2D image specification or 2D framebuffer attachment (`textarget`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageTarget {
    Texture2D,
    CubeFace(CubeFace),
}

impl ImageTarget {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_TEXTURE_2D => Self::Texture2D,
            gl::GL_TEXTURE_CUBE_MAP_POSITIVE_X => Self::CubeFace(CubeFace::PositiveX),
            gl::GL_TEXTURE_CUBE_MAP_NEGATIVE_X => Self::CubeFace(CubeFace::NegativeX),
            gl::GL_TEXTURE_CUBE_MAP_POSITIVE_Y => Self::CubeFace(CubeFace::PositiveY),
            gl::GL_TEXTURE_CUBE_MAP_NEGATIVE_Y => Self::CubeFace(CubeFace::NegativeY),
            gl::GL_TEXTURE_CUBE_MAP_POSITIVE_Z => Self::CubeFace(CubeFace::PositiveZ),
            gl::GL_TEXTURE_CUBE_MAP_NEGATIVE_Z => Self::CubeFace(CubeFace::NegativeZ),
            _ => return None,
        })
    }

    /// The binding target whose texture this image belongs to.
    pub fn texture_target(self) -> TextureTarget {
        match self {
            Self::Texture2D => TextureTarget::Texture2D,
            Self::CubeFace(_) => TextureTarget::CubeMap,
        }
    }

    pub fn face(self) -> Option<CubeFace> {
        match self {
            Self::Texture2D => None,
            Self::CubeFace(face) => Some(face),
        }
    }
}

/// Target of a 3D image specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeTarget {
    Texture3D,
    Texture2DArray,
}

impl VolumeTarget {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_TEXTURE_3D => Self::Texture3D,
            gl::GL_TEXTURE_2D_ARRAY => Self::Texture2DArray,
            _ => return None,
        })
    }

    pub fn texture_target(self) -> TextureTarget {
        match self {
            Self::Texture3D => TextureTarget::Texture3D,
            Self::Texture2DArray => TextureTarget::Texture2DArray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// `GL_FRAMEBUFFER`: binds both draw and read; reads back the draw binding.
    Framebuffer,
    Draw,
    Read,
}

impl FramebufferTarget {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_FRAMEBUFFER => Self::Framebuffer,
            gl::GL_DRAW_FRAMEBUFFER => Self::Draw,
            gl::GL_READ_FRAMEBUFFER => Self::Read,
            _ => return None,
        })
    }

    pub fn is_supported(self, features: FeatureSet) -> bool {
        match self {
            Self::Framebuffer => true,
            Self::Draw | Self::Read => features.is_es3(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentPoint {
    Color(u8),
    Depth,
    Stencil,
    DepthStencil,
}

impl AttachmentPoint {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_COLOR_ATTACHMENT0..=gl::GL_COLOR_ATTACHMENT15 => {
                Self::Color((value - gl::GL_COLOR_ATTACHMENT0) as u8)
            }
            gl::GL_DEPTH_ATTACHMENT => Self::Depth,
            gl::GL_STENCIL_ATTACHMENT => Self::Stencil,
            gl::GL_DEPTH_STENCIL_ATTACHMENT => Self::DepthStencil,
            _ => return None,
        })
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Color(index) => gl::GL_COLOR_ATTACHMENT0 + index as u32,
            Self::Depth => gl::GL_DEPTH_ATTACHMENT,
            Self::Stencil => gl::GL_STENCIL_ATTACHMENT,
            Self::DepthStencil => gl::GL_DEPTH_STENCIL_ATTACHMENT,
        }
    }

    pub fn is_color(self) -> bool {
        matches!(self, Self::Color(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_POINTS => Self::Points,
            gl::GL_LINES => Self::Lines,
            gl::GL_LINE_LOOP => Self::LineLoop,
            gl::GL_LINE_STRIP => Self::LineStrip,
            gl::GL_TRIANGLES => Self::Triangles,
            gl::GL_TRIANGLE_STRIP => Self::TriangleStrip,
            gl::GL_TRIANGLE_FAN => Self::TriangleFan,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

impl IndexType {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_UNSIGNED_BYTE => Self::UnsignedByte,
            gl::GL_UNSIGNED_SHORT => Self::UnsignedShort,
            gl::GL_UNSIGNED_INT => Self::UnsignedInt,
            _ => return None,
        })
    }
}

/// Client-side pixel data layout (`format` argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Alpha,
    Luminance,
    LuminanceAlpha,
    Red,
    Rg,
    Rgb,
    Rgba,
    DepthComponent,
    DepthStencil,
    SrgbExt,
    SrgbAlphaExt,
}

impl PixelFormat {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_ALPHA => Self::Alpha,
            gl::GL_LUMINANCE => Self::Luminance,
            gl::GL_LUMINANCE_ALPHA => Self::LuminanceAlpha,
            gl::GL_RED => Self::Red,
            gl::GL_RG => Self::Rg,
            gl::GL_RGB => Self::Rgb,
            gl::GL_RGBA => Self::Rgba,
            gl::GL_DEPTH_COMPONENT => Self::DepthComponent,
            gl::GL_DEPTH_STENCIL => Self::DepthStencil,
            gl::GL_SRGB_EXT => Self::SrgbExt,
            gl::GL_SRGB_ALPHA_EXT => Self::SrgbAlphaExt,
            _ => return None,
        })
    }

    pub fn is_supported(self, features: FeatureSet) -> bool {
        match self {
            Self::Alpha | Self::Luminance | Self::LuminanceAlpha | Self::Rgb | Self::Rgba => true,
            Self::Red | Self::Rg => features.is_es3(),
            Self::DepthComponent | Self::DepthStencil => {
                features.is_es3() || features.has(Extensions::DEPTH_TEXTURE)
            }
            Self::SrgbExt | Self::SrgbAlphaExt => features.has(Extensions::SRGB),
        }
    }

    pub fn components(self) -> u32 {
        match self {
            Self::Alpha | Self::Luminance | Self::Red | Self::DepthComponent => 1,
            Self::LuminanceAlpha | Self::Rg | Self::DepthStencil => 2,
            Self::Rgb | Self::SrgbExt => 3,
            Self::Rgba | Self::SrgbAlphaExt => 4,
        }
    }
}

/// Client-side component type (`type` argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    Float,
    HalfFloat,
    UnsignedShort4444,
    UnsignedShort5551,
    UnsignedShort565,
    UnsignedInt248,
}

impl PixelType {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_UNSIGNED_BYTE => Self::UnsignedByte,
            gl::GL_UNSIGNED_SHORT => Self::UnsignedShort,
            gl::GL_UNSIGNED_INT => Self::UnsignedInt,
            gl::GL_FLOAT => Self::Float,
            gl::GL_HALF_FLOAT => Self::HalfFloat,
            gl::GL_UNSIGNED_SHORT_4_4_4_4 => Self::UnsignedShort4444,
            gl::GL_UNSIGNED_SHORT_5_5_5_1 => Self::UnsignedShort5551,
            gl::GL_UNSIGNED_SHORT_5_6_5 => Self::UnsignedShort565,
            gl::GL_UNSIGNED_INT_24_8 => Self::UnsignedInt248,
            _ => return None,
        })
    }

    pub fn is_supported(self, features: FeatureSet) -> bool {
        match self {
            Self::UnsignedByte
            | Self::UnsignedShort4444
            | Self::UnsignedShort5551
            | Self::UnsignedShort565 => true,
            Self::Float | Self::HalfFloat => features.is_es3(),
            Self::UnsignedShort | Self::UnsignedInt | Self::UnsignedInt248 => {
                features.is_es3() || features.has(Extensions::DEPTH_TEXTURE)
            }
        }
    }

    /// Bytes per pixel for `format` when read back through `read_pixels`.
    pub fn bytes_per_pixel(self, format: PixelFormat) -> u32 {
        match self {
            Self::UnsignedByte => format.components(),
            Self::UnsignedShort | Self::HalfFloat => 2 * format.components(),
            Self::UnsignedInt | Self::Float => 4 * format.components(),
            Self::UnsignedShort4444 | Self::UnsignedShort5551 | Self::UnsignedShort565 => 2,
            Self::UnsignedInt248 => 4,
        }
    }
}

/// GL 3.0 `glClampColor` mode for `GL_CLAMP_READ_COLOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClampMode {
    True,
    False,
    #[default]
    FixedOnly,
}

impl ClampMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_TRUE => Self::True,
            gl::GL_FALSE => Self::False,
            gl::GL_FIXED_ONLY => Self::FixedOnly,
            _ => return None,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const DEPTH = gl::GL_DEPTH_BUFFER_BIT;
        const STENCIL = gl::GL_STENCIL_BUFFER_BIT;
        const COLOR = gl::GL_COLOR_BUFFER_BIT;
    }
}
