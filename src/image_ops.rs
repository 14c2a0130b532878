//! Crop/resize raw RGBA buffers to a target render size.
//!
//! No filtering. Callers guarantee `dst_w <= src_w` and `dst_h <= src_h`.

use crate::frame::Bitmap;
use image::RgbaImage;

const BYTES_PER_PIXEL: usize = 4;

/// Crop a row-major RGBA8 buffer from `(src_w, src_h)` down to
/// `(dst_w, dst_h)`.
///
/// - If the sizes match, the buffer is wrapped unchanged.
/// - If only the height shrinks (`src_w == dst_w`, `src_h > dst_h`), the
///   leading `dst_w * dst_h * 4` bytes are used directly — the source
///   rows are already contiguous at the destination width.
/// - Otherwise each destination row copies the first `dst_w` pixels of
///   the corresponding source row.
///
/// # Panics
/// Panics if `buffer` is shorter than `src_w * src_h * 4` bytes, or if
/// `dst_w > src_w` or `dst_h > src_h` — both are caller-guaranteed
/// preconditions, not recoverable runtime errors.
pub fn crop(buffer: &[u8], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Bitmap {
    assert!(dst_w <= src_w && dst_h <= src_h, "crop target must not exceed source");
    let required = src_w as usize * src_h as usize * BYTES_PER_PIXEL;
    assert!(
        buffer.len() >= required,
        "crop buffer too short: have {}, need {}",
        buffer.len(),
        required
    );

    let image = if (src_w, src_h) == (dst_w, dst_h) {
        RgbaImage::from_raw(src_w, src_h, buffer[..required].to_vec())
            .expect("buffer length matches src_w * src_h * 4")
    } else if src_w == dst_w && src_h > dst_h {
        let len = dst_w as usize * dst_h as usize * BYTES_PER_PIXEL;
        RgbaImage::from_raw(dst_w, dst_h, buffer[..len].to_vec())
            .expect("buffer length matches dst_w * dst_h * 4")
    } else {
        let row_bytes = dst_w as usize * BYTES_PER_PIXEL;
        let src_row_bytes = src_w as usize * BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(row_bytes * dst_h as usize);
        for row in 0..dst_h as usize {
            let start = row * src_row_bytes;
            out.extend_from_slice(&buffer[start..start + row_bytes]);
        }
        RgbaImage::from_raw(dst_w, dst_h, out).expect("row copy produces exact buffer length")
    };

    Bitmap::new(image)
}

/// Compute the render-size crop target for a video frame whose codec
/// reported `(dw, dh)`. The reported size is not trusted as final:
/// `scale = ceil(render_h / dh)`, `out_w = round(render_w / scale)`,
/// `out_h = round(render_h / scale)`.
pub fn render_crop_target(dw: u32, dh: u32, render_w: u32, render_h: u32) -> (u32, u32) {
    let scale = (render_h as f64 / dh as f64).ceil().max(1.0);
    let out_w = (render_w as f64 / scale).round() as u32;
    let out_h = (render_h as f64 / scale).round() as u32;
    (out_w.min(dw), out_h.min(dh))
}
