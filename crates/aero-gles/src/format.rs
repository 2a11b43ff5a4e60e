use crate::config::{Extensions, FeatureSet};
use crate::enums::{AttachmentPoint, PixelFormat, PixelType};
use crate::gl;

/// Encoding of the values stored in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Linear,
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatClass {
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

impl FormatClass {
    /// Whether an image of this class can back `point`.
    pub fn suits(self, point: AttachmentPoint) -> bool {
        match point {
            AttachmentPoint::Color(_) => self == Self::Color,
            AttachmentPoint::Depth => matches!(self, Self::Depth | Self::DepthStencil),
            AttachmentPoint::Stencil => matches!(self, Self::Stencil | Self::DepthStencil),
            AttachmentPoint::DepthStencil => self == Self::DepthStencil,
        }
    }
}

/// Availability of a format for one kind of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Never,
    Always,
    Es3,
    Extension(Extensions),
    Es3OrExtension(Extensions),
}

impl Support {
    pub fn is_available(self, features: FeatureSet) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::Es3 => features.is_es3(),
            Self::Extension(ext) => features.has(ext),
            Self::Es3OrExtension(ext) => features.is_es3() || features.has(ext),
        }
    }
}

/// Internal (storage) formats for textures and renderbuffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    // Unsized (ES2-style) formats.
    Alpha,
    Luminance,
    LuminanceAlpha,
    Rgb,
    Rgba,
    SrgbExt,
    SrgbAlphaExt,
    DepthComponent,
    DepthStencil,
    // Sized formats.
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Srgb8,
    Srgb8Alpha8,
    Rgba4,
    Rgb5A1,
    Rgb565,
    Rgba16f,
    Rgba32f,
    DepthComponent16,
    DepthComponent24,
    DepthComponent32f,
    Depth24Stencil8,
    StencilIndex8,
}

#[derive(Debug, Clone, Copy)]
pub struct FormatInfo {
    pub class: FormatClass,
    pub color_space: ColorSpace,
    pub sized: bool,
    pub float: bool,
    /// Usable with `tex_image_*`/`tex_storage_*`.
    pub texture: Support,
    /// Usable with `renderbuffer_storage*`.
    pub renderbuffer: Support,
    /// Renderable when attached to a framebuffer.
    pub renderable: Support,
    /// Accepted `(format, type)` pairs for texture uploads.
    pub upload: &'static [(PixelFormat, PixelType)],
}

use PixelFormat as F;
use PixelType as T;

const fn color(
    color_space: ColorSpace,
    sized: bool,
    texture: Support,
    renderbuffer: Support,
    renderable: Support,
    upload: &'static [(PixelFormat, PixelType)],
) -> FormatInfo {
    FormatInfo {
        class: FormatClass::Color,
        color_space,
        sized,
        float: false,
        texture,
        renderbuffer,
        renderable,
        upload,
    }
}

const fn depth_stencil(
    class: FormatClass,
    sized: bool,
    texture: Support,
    renderbuffer: Support,
    upload: &'static [(PixelFormat, PixelType)],
) -> FormatInfo {
    FormatInfo {
        class,
        color_space: ColorSpace::Linear,
        sized,
        float: false,
        texture,
        renderbuffer,
        renderable: Support::Always,
        upload,
    }
}

impl InternalFormat {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            gl::GL_ALPHA => Self::Alpha,
            gl::GL_LUMINANCE => Self::Luminance,
            gl::GL_LUMINANCE_ALPHA => Self::LuminanceAlpha,
            gl::GL_RGB => Self::Rgb,
            gl::GL_RGBA => Self::Rgba,
            gl::GL_SRGB_EXT => Self::SrgbExt,
            gl::GL_SRGB_ALPHA_EXT => Self::SrgbAlphaExt,
            gl::GL_DEPTH_COMPONENT => Self::DepthComponent,
            gl::GL_DEPTH_STENCIL => Self::DepthStencil,
            gl::GL_R8 => Self::R8,
            gl::GL_RG8 => Self::Rg8,
            gl::GL_RGB8 => Self::Rgb8,
            gl::GL_RGBA8 => Self::Rgba8,
            gl::GL_SRGB8 => Self::Srgb8,
            gl::GL_SRGB8_ALPHA8 => Self::Srgb8Alpha8,
            gl::GL_RGBA4 => Self::Rgba4,
            gl::GL_RGB5_A1 => Self::Rgb5A1,
            gl::GL_RGB565 => Self::Rgb565,
            gl::GL_RGBA16F => Self::Rgba16f,
            gl::GL_RGBA32F => Self::Rgba32f,
            gl::GL_DEPTH_COMPONENT16 => Self::DepthComponent16,
            gl::GL_DEPTH_COMPONENT24 => Self::DepthComponent24,
            gl::GL_DEPTH_COMPONENT32F => Self::DepthComponent32f,
            gl::GL_DEPTH24_STENCIL8 => Self::Depth24Stencil8,
            gl::GL_STENCIL_INDEX8 => Self::StencilIndex8,
            _ => return None,
        })
    }

    pub fn info(self) -> FormatInfo {
        use ColorSpace::{Linear, Srgb};
        use Support::{Always, Es3, Es3OrExtension, Extension, Never};

        match self {
            Self::Alpha => color(Linear, false, Always, Never, Never, &[(F::Alpha, T::UnsignedByte)]),
            Self::Luminance => color(Linear, false, Always, Never, Never, &[(F::Luminance, T::UnsignedByte)]),
            Self::LuminanceAlpha => color(
                Linear,
                false,
                Always,
                Never,
                Never,
                &[(F::LuminanceAlpha, T::UnsignedByte)],
            ),
            Self::Rgb => color(
                Linear,
                false,
                Always,
                Never,
                Always,
                &[(F::Rgb, T::UnsignedByte), (F::Rgb, T::UnsignedShort565)],
            ),
            Self::Rgba => color(
                Linear,
                false,
                Always,
                Never,
                Always,
                &[
                    (F::Rgba, T::UnsignedByte),
                    (F::Rgba, T::UnsignedShort4444),
                    (F::Rgba, T::UnsignedShort5551),
                ],
            ),
            Self::SrgbExt => color(
                Srgb,
                false,
                Extension(Extensions::SRGB),
                Never,
                Never,
                &[(F::SrgbExt, T::UnsignedByte)],
            ),
            Self::SrgbAlphaExt => color(
                Srgb,
                false,
                Extension(Extensions::SRGB),
                Never,
                Extension(Extensions::SRGB),
                &[(F::SrgbAlphaExt, T::UnsignedByte)],
            ),
            Self::DepthComponent => depth_stencil(
                FormatClass::Depth,
                false,
                Es3OrExtension(Extensions::DEPTH_TEXTURE),
                Never,
                &[
                    (F::DepthComponent, T::UnsignedShort),
                    (F::DepthComponent, T::UnsignedInt),
                ],
            ),
            Self::DepthStencil => depth_stencil(
                FormatClass::DepthStencil,
                false,
                Es3OrExtension(Extensions::PACKED_DEPTH_STENCIL),
                Never,
                &[(F::DepthStencil, T::UnsignedInt248)],
            ),
            Self::R8 => color(Linear, true, Es3, Es3, Es3, &[(F::Red, T::UnsignedByte)]),
            Self::Rg8 => color(Linear, true, Es3, Es3, Es3, &[(F::Rg, T::UnsignedByte)]),
            Self::Rgb8 => color(
                Linear,
                true,
                Es3,
                Es3OrExtension(Extensions::RGB8_RGBA8),
                Always,
                &[(F::Rgb, T::UnsignedByte)],
            ),
            Self::Rgba8 => color(
                Linear,
                true,
                Es3,
                Es3OrExtension(Extensions::RGB8_RGBA8),
                Always,
                &[(F::Rgba, T::UnsignedByte)],
            ),
            Self::Srgb8 => color(Srgb, true, Es3, Never, Never, &[(F::Rgb, T::UnsignedByte)]),
            Self::Srgb8Alpha8 => color(
                Srgb,
                true,
                Es3,
                Es3OrExtension(Extensions::SRGB),
                Es3OrExtension(Extensions::SRGB),
                &[(F::Rgba, T::UnsignedByte)],
            ),
            Self::Rgba4 => color(
                Linear,
                true,
                Es3,
                Always,
                Always,
                &[(F::Rgba, T::UnsignedByte), (F::Rgba, T::UnsignedShort4444)],
            ),
            Self::Rgb5A1 => color(
                Linear,
                true,
                Es3,
                Always,
                Always,
                &[(F::Rgba, T::UnsignedByte), (F::Rgba, T::UnsignedShort5551)],
            ),
            Self::Rgb565 => color(
                Linear,
                true,
                Es3,
                Always,
                Always,
                &[(F::Rgb, T::UnsignedByte), (F::Rgb, T::UnsignedShort565)],
            ),
            Self::Rgba16f => FormatInfo {
                float: true,
                ..color(
                    Linear,
                    true,
                    Es3,
                    Extension(Extensions::COLOR_BUFFER_FLOAT),
                    Extension(Extensions::COLOR_BUFFER_FLOAT),
                    &[(F::Rgba, T::HalfFloat), (F::Rgba, T::Float)],
                )
            },
            Self::Rgba32f => FormatInfo {
                float: true,
                ..color(
                    Linear,
                    true,
                    Es3,
                    Extension(Extensions::COLOR_BUFFER_FLOAT),
                    Extension(Extensions::COLOR_BUFFER_FLOAT),
                    &[(F::Rgba, T::Float)],
                )
            },
            Self::DepthComponent16 => depth_stencil(
                FormatClass::Depth,
                true,
                Es3,
                Always,
                &[
                    (F::DepthComponent, T::UnsignedShort),
                    (F::DepthComponent, T::UnsignedInt),
                ],
            ),
            Self::DepthComponent24 => depth_stencil(
                FormatClass::Depth,
                true,
                Es3,
                Es3OrExtension(Extensions::DEPTH24),
                &[(F::DepthComponent, T::UnsignedInt)],
            ),
            Self::DepthComponent32f => FormatInfo {
                float: true,
                ..depth_stencil(
                    FormatClass::Depth,
                    true,
                    Es3,
                    Es3,
                    &[(F::DepthComponent, T::Float)],
                )
            },
            Self::Depth24Stencil8 => depth_stencil(
                FormatClass::DepthStencil,
                true,
                Es3,
                Es3OrExtension(Extensions::PACKED_DEPTH_STENCIL),
                &[(F::DepthStencil, T::UnsignedInt248)],
            ),
            Self::StencilIndex8 => depth_stencil(FormatClass::Stencil, true, Never, Always, &[]),
        }
    }

    pub fn class(self) -> FormatClass {
        self.info().class
    }

    pub fn color_space(self) -> ColorSpace {
        self.info().color_space
    }

    pub fn accepts_upload(self, format: PixelFormat, ty: PixelType) -> bool {
        self.info().upload.contains(&(format, ty))
    }

    /// Whether an image in this format is renderable at `point` for the given feature set.
    pub fn is_renderable_at(self, point: AttachmentPoint, features: FeatureSet) -> bool {
        let info = self.info();
        info.class.suits(point) && info.renderable.is_available(features)
    }
}

/// Linear to sRGB transfer function for a single normalized channel.
pub fn linear_to_srgb(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    if x <= 0.003_130_8 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// Quantizes a normalized channel to UNORM8.
pub fn unorm8(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientVersion;

    #[test]
    fn srgb_formats_carry_the_srgb_color_space() {
        for format in [
            InternalFormat::SrgbExt,
            InternalFormat::SrgbAlphaExt,
            InternalFormat::Srgb8,
            InternalFormat::Srgb8Alpha8,
        ] {
            assert_eq!(format.color_space(), ColorSpace::Srgb, "{format:?}");
        }
        assert_eq!(InternalFormat::Rgba8.color_space(), ColorSpace::Linear);
    }

    #[test]
    fn srgb_alpha_is_renderable_only_with_ext_srgb() {
        let es2 = FeatureSet::new(ClientVersion::Es2, Extensions::empty());
        let es2_srgb = FeatureSet::new(ClientVersion::Es2, Extensions::SRGB);
        let point = AttachmentPoint::Color(0);
        assert!(!InternalFormat::SrgbAlphaExt.is_renderable_at(point, es2));
        assert!(InternalFormat::SrgbAlphaExt.is_renderable_at(point, es2_srgb));
        assert!(!InternalFormat::SrgbAlphaExt.is_renderable_at(AttachmentPoint::Depth, es2_srgb));
    }

    #[test]
    fn packed_depth_stencil_suits_both_depth_and_stencil_points() {
        let class = InternalFormat::Depth24Stencil8.class();
        assert!(class.suits(AttachmentPoint::Depth));
        assert!(class.suits(AttachmentPoint::Stencil));
        assert!(class.suits(AttachmentPoint::DepthStencil));
        assert!(!class.suits(AttachmentPoint::Color(0)));
        assert!(!FormatClass::Depth.suits(AttachmentPoint::DepthStencil));
    }

    #[test]
    fn linear_to_srgb_matches_reference_values() {
        // (13, 54, 133) interpreted as linear encodes to roughly (64, 127, 191).
        let encoded = [13u8, 54, 133].map(|c| unorm8(linear_to_srgb(c as f32 / 255.0)));
        for (got, want) in encoded.iter().zip([64u8, 127, 191]) {
            assert!(got.abs_diff(want) <= 1, "got {encoded:?}");
        }
        assert_eq!(unorm8(linear_to_srgb(0.0)), 0);
        assert_eq!(unorm8(linear_to_srgb(1.0)), 255);
    }
}
