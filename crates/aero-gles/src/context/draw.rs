//! Commands gated on framebuffer completeness.

use tracing::trace;

use super::Context;
use crate::dispatch::Dispatcher;
use crate::validation::{self, ReadPixelsArgs};

impl<D: Dispatcher> Context<D> {
    pub fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        let Some(draw) = self.execute("glDrawArrays", |cx| {
            validation::validate_draw_arrays(cx, mode, first, count)
        }) else {
            return;
        };
        self.dispatcher.draw(&draw.target, &draw.call);
        self.stats.draws_dispatched += 1;
    }

    /// `offset` is the byte offset into the bound element array buffer.
    pub fn draw_elements(&mut self, mode: u32, count: i32, index_type: u32, offset: usize) {
        let Some(draw) = self.execute("glDrawElements", |cx| {
            validation::validate_draw_elements(cx, mode, count, index_type, offset)
        }) else {
            return;
        };
        self.dispatcher.draw(&draw.target, &draw.call);
        self.stats.draws_dispatched += 1;
    }

    pub fn clear(&mut self, mask: u32) {
        let Some(clear) = self.execute("glClear", |cx| validation::validate_clear(cx, mask)) else {
            return;
        };
        self.dispatcher.clear(&clear.target, clear.mask);
        self.stats.clears_dispatched += 1;
    }

    /// `glReadPixels` from color attachment 0 of the read framebuffer into `out`, rows packed
    /// tightly from the bottom.
    #[allow(clippy::too_many_arguments)]
    pub fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) {
        let args = ReadPixelsArgs {
            x,
            y,
            width,
            height,
            format,
            ty,
            buffer_len: out.len(),
        };
        let Some(read) = self.execute("glReadPixels", |cx| validation::validate_read_pixels(cx, &args))
        else {
            return;
        };
        trace!(
            context = %self.id,
            framebuffer = %read.framebuffer,
            width = read.request.width,
            height = read.request.height,
            "dispatching read"
        );
        self.dispatcher.read_pixels(&read.source, &read.request, out);
        self.stats.reads_dispatched += 1;
    }
}
