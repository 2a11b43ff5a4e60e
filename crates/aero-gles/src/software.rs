//! CPU reference executor.
//!
//! Keeps an RGBA8 copy of every allocated image and implements draws as full-target fills
//! with a host-provided fragment color. It exists so the validation core can be exercised
//! end to end without a GPU; it is not a rasterizer.

use hashbrown::HashMap;
use tracing::trace;

use crate::config::SurfaceDesc;
use crate::dispatch::{
    DrawCall, Dispatcher, ImageSource, ReadRequest, RenderTarget, ResolvedAttachment,
    StorageAllocation,
};
use crate::enums::{ClearMask, PixelFormat, PixelType};
use crate::format::{linear_to_srgb, unorm8};
use crate::registry::{Handle, ObjectKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ImageKey {
    object: Handle,
    face: u8,
    level: u32,
}

impl ImageKey {
    fn for_source(source: &ImageSource) -> Self {
        match *source {
            ImageSource::DefaultSurface => Self {
                object: Handle::NONE,
                face: 0,
                level: 0,
            },
            ImageSource::Texture {
                handle,
                face,
                level,
                ..
            } => Self {
                object: handle,
                face: face.map_or(0, |face| face.index()),
                level,
            },
            ImageSource::Renderbuffer(handle) => Self {
                object: handle,
                face: 0,
                level: 0,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Image {
    width: u32,
    height: u32,
    depth: u32,
    /// Tightly packed RGBA8, layer-major.
    data: Vec<u8>,
}

impl Image {
    fn new(width: u32, height: u32, depth: u32) -> Self {
        let len = width as usize * height as usize * depth.max(1) as usize * 4;
        Self {
            width,
            height,
            depth: depth.max(1),
            data: vec![0; len],
        }
    }

    fn layer_range(&self, layer: u32) -> Option<std::ops::Range<usize>> {
        if layer >= self.depth {
            return None;
        }
        let layer_len = self.width as usize * self.height as usize * 4;
        let start = layer as usize * layer_len;
        Some(start..start + layer_len)
    }

    fn fill_layer(&mut self, layer: u32, texel: [u8; 4]) {
        if let Some(range) = self.layer_range(layer) {
            for px in self.data[range].chunks_exact_mut(4) {
                px.copy_from_slice(&texel);
            }
        }
    }

    fn texel(&self, layer: u32, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let range = self.layer_range(layer)?;
        let offset = range.start + (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Counters of work the executor actually performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareCounters {
    pub draws: u64,
    pub clears: u64,
    pub reads: u64,
    pub allocations: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone)]
pub struct SoftwareDispatcher {
    images: HashMap<ImageKey, Image>,
    fragment_color: [f32; 4],
    clear_color: [f32; 4],
    counters: SoftwareCounters,
}

impl Default for SoftwareDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDispatcher {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            fragment_color: [0.0, 0.0, 0.0, 1.0],
            clear_color: [0.0; 4],
            counters: SoftwareCounters::default(),
        }
    }

    /// Color written by every fragment of a draw, as linear values in `[0, 1]`.
    pub fn set_fragment_color(&mut self, rgba: [f32; 4]) {
        self.fragment_color = rgba;
    }

    /// Convenience for [`Self::set_fragment_color`] with UNORM8 components.
    pub fn set_fragment_color_u8(&mut self, rgba: [u8; 4]) {
        self.fragment_color = rgba.map(|c| c as f32 / 255.0);
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    pub fn counters(&self) -> SoftwareCounters {
        self.counters
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    fn write_targets(&mut self, target: &RenderTarget, color: [f32; 4]) {
        for att in target.color_attachments() {
            let texel = encode(color, att.srgb_encode);
            let layer = match att.source {
                ImageSource::Texture { layer, .. } => layer,
                _ => 0,
            };
            let key = ImageKey::for_source(&att.source);
            let image = self
                .images
                .entry(key)
                .or_insert_with(|| Image::new(att.width, att.height, layer + 1));
            image.fill_layer(layer, texel);
        }
    }
}

fn encode(color: [f32; 4], srgb: bool) -> [u8; 4] {
    let [r, g, b, a] = color;
    if srgb {
        [
            unorm8(linear_to_srgb(r)),
            unorm8(linear_to_srgb(g)),
            unorm8(linear_to_srgb(b)),
            unorm8(a),
        ]
    } else {
        [unorm8(r), unorm8(g), unorm8(b), unorm8(a)]
    }
}

impl Dispatcher for SoftwareDispatcher {
    fn default_surface(&mut self, surface: &SurfaceDesc) {
        self.images.insert(
            ImageKey::for_source(&ImageSource::DefaultSurface),
            Image::new(surface.width, surface.height, 1),
        );
    }

    fn storage_allocated(&mut self, allocation: &StorageAllocation, pixels: Option<&[u8]>) {
        let key = ImageKey {
            object: allocation.object,
            face: allocation.face.map_or(0, |face| face.index()),
            level: allocation.level,
        };
        let mut image = Image::new(allocation.width, allocation.height, allocation.depth);
        if let Some(pixels) = pixels.filter(|p| p.len() == image.data.len()) {
            image.data.copy_from_slice(pixels);
        }
        self.images.insert(key, image);
        self.counters.allocations += 1;
    }

    fn object_deleted(&mut self, handle: Handle, kind: ObjectKind) {
        if matches!(kind, ObjectKind::Texture | ObjectKind::Renderbuffer) {
            self.images.retain(|key, _| key.object != handle);
        }
        self.counters.deletions += 1;
    }

    fn clear(&mut self, target: &RenderTarget, mask: ClearMask) {
        self.counters.clears += 1;
        if mask.contains(ClearMask::COLOR) {
            self.write_targets(target, self.clear_color);
        }
    }

    fn draw(&mut self, target: &RenderTarget, call: &DrawCall) {
        self.counters.draws += 1;
        trace!(framebuffer = %target.framebuffer, ?call, "software draw");
        self.write_targets(target, self.fragment_color);
    }

    fn read_pixels(&mut self, source: &ResolvedAttachment, request: &ReadRequest, out: &mut [u8]) {
        self.counters.reads += 1;
        let layer = match source.source {
            ImageSource::Texture { layer, .. } => layer,
            _ => 0,
        };
        let Some(image) = self.images.get(&ImageKey::for_source(&source.source)) else {
            return;
        };

        let bpp = request.ty.bytes_per_pixel(request.format) as usize;
        for row in 0..request.height {
            for col in 0..request.width {
                let (Ok(x), Ok(y)) = (
                    u32::try_from(i64::from(request.x) + i64::from(col)),
                    u32::try_from(i64::from(request.y) + i64::from(row)),
                ) else {
                    continue;
                };
                let Some(texel) = image.texel(layer, x, y) else {
                    continue;
                };
                let offset = (row as usize * request.width as usize + col as usize) * bpp;
                let Some(dst) = out.get_mut(offset..offset + bpp) else {
                    return;
                };
                match (request.format, request.ty) {
                    (PixelFormat::Rgba, PixelType::UnsignedByte) => dst.copy_from_slice(&texel),
                    (PixelFormat::Rgba, PixelType::Float) => {
                        for (chunk, c) in dst.chunks_exact_mut(4).zip(texel) {
                            chunk.copy_from_slice(&(c as f32 / 255.0).to_le_bytes());
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::enums::{AttachmentPoint, DrawMode};
    use crate::format::InternalFormat;

    fn target(handle: Handle, srgb_encode: bool) -> (RenderTarget, ResolvedAttachment) {
        let att = ResolvedAttachment {
            point: AttachmentPoint::Color(0),
            source: ImageSource::Texture {
                handle,
                face: None,
                level: 0,
                layer: 0,
            },
            width: 2,
            height: 2,
            samples: 0,
            format: InternalFormat::Srgb8Alpha8,
            srgb_encode,
        };
        (
            RenderTarget {
                framebuffer: Handle(1),
                attachments: vec![att],
            },
            att,
        )
    }

    fn read_rgba8(dispatcher: &mut SoftwareDispatcher, att: &ResolvedAttachment) -> [u8; 4] {
        let request = ReadRequest {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
            ty: PixelType::UnsignedByte,
        };
        let mut out = [0u8; 4];
        dispatcher.read_pixels(att, &request, &mut out);
        out
    }

    const DRAW: DrawCall = DrawCall::Arrays {
        mode: DrawMode::Triangles,
        first: 0,
        count: 6,
    };

    #[test]
    fn draw_encodes_only_when_requested() {
        let mut dispatcher = SoftwareDispatcher::new();
        dispatcher.set_fragment_color_u8([13, 54, 133, 255]);

        let (plain, plain_att) = target(Handle(5), false);
        dispatcher.draw(&plain, &DRAW);
        assert_eq!(read_rgba8(&mut dispatcher, &plain_att), [13, 54, 133, 255]);

        let (encoded, encoded_att) = target(Handle(6), true);
        dispatcher.draw(&encoded, &DRAW);
        let got = read_rgba8(&mut dispatcher, &encoded_att);
        for (g, want) in got.iter().zip([64u8, 127, 191, 255]) {
            assert!(g.abs_diff(want) <= 1, "got {got:?}");
        }
        assert_eq!(dispatcher.counters().draws, 2);
    }

    #[test]
    fn deleting_an_object_drops_its_images() {
        let mut dispatcher = SoftwareDispatcher::new();
        dispatcher.storage_allocated(
            &StorageAllocation {
                object: Handle(3),
                kind: ObjectKind::Texture,
                face: None,
                level: 0,
                width: 4,
                height: 4,
                depth: 1,
                samples: 0,
                format: InternalFormat::Rgba8,
            },
            None,
        );
        assert_eq!(dispatcher.image_count(), 1);
        dispatcher.object_deleted(Handle(3), ObjectKind::Texture);
        assert_eq!(dispatcher.image_count(), 0);
    }

    #[test]
    fn float_read_back_normalizes_stored_bytes() {
        let mut dispatcher = SoftwareDispatcher::new();
        dispatcher.set_clear_color([1.0, 0.0, 0.0, 1.0]);
        let (target, att) = target(Handle(9), false);
        dispatcher.clear(&target, ClearMask::COLOR);

        let request = ReadRequest {
            x: 1,
            y: 1,
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
            ty: PixelType::Float,
        };
        let mut out = [0u8; 16];
        dispatcher.read_pixels(&att, &request, &mut out);
        let red = f32::from_le_bytes([out[0], out[1], out[2], out[3]]);
        let green = f32::from_le_bytes([out[4], out[5], out[6], out[7]]);
        assert_eq!((red, green), (1.0, 0.0));
    }
}
