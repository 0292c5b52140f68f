//! Frame resampling.
//!
//! Scales a source frame into the existing geometry of a destination frame,
//! converting RGB input to YUV 4:2:0 (BT.601, limited range) on the way.
//! Each Y/U/V plane is resized independently as a single-channel image.

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use tessera_common::config::ScalingAlgorithm;
use tessera_common::error::{TesseraError, TesseraResult};

use crate::format::PixelFormat;
use crate::frame::VideoFrame;

/// Resizes/reformats one frame's content into another frame's allocation.
pub trait Resampler: Send + Sync {
    /// Fill `dst` (keeping its dimensions and format) from `src`.
    fn scale(&self, src: &VideoFrame, dst: &mut VideoFrame) -> TesseraResult<()>;
}

/// CPU scaler backed by `fast_image_resize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scaler {
    algorithm: ScalingAlgorithm,
}

impl Scaler {
    pub fn new(algorithm: ScalingAlgorithm) -> Self {
        Self { algorithm }
    }

    fn options(&self) -> ResizeOptions {
        let alg = match self.algorithm {
            ScalingAlgorithm::Nearest => ResizeAlg::Nearest,
            ScalingAlgorithm::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        };
        ResizeOptions::new().resize_alg(alg)
    }
}

impl Resampler for Scaler {
    fn scale(&self, src: &VideoFrame, dst: &mut VideoFrame) -> TesseraResult<()> {
        if dst.format() != PixelFormat::Yuv420p {
            return Err(TesseraError::format(format!(
                "Scaler only produces yuv420p, destination is {}",
                dst.format()
            )));
        }

        let converted;
        let src = match src.format() {
            PixelFormat::Yuv420p => src,
            PixelFormat::Rgb24 => {
                converted = rgb_to_yuv420p(src)?;
                &converted
            }
        };

        let options = self.options();
        let mut resizer = Resizer::new();
        for plane in 0..PixelFormat::Yuv420p.plane_count() {
            let (sw, sh) = PixelFormat::Yuv420p.plane_dims(plane, src.width(), src.height());
            let (dw, dh) = PixelFormat::Yuv420p.plane_dims(plane, dst.width(), dst.height());

            let input = ImageRef::new(sw as u32, sh as u32, src.plane(plane), PixelType::U8)
                .map_err(|e| TesseraError::format(format!("Source plane {plane}: {e}")))?;
            let mut output =
                Image::from_slice_u8(dw as u32, dh as u32, dst.plane_mut(plane), PixelType::U8)
                    .map_err(|e| TesseraError::format(format!("Destination plane {plane}: {e}")))?;

            resizer
                .resize(&input, &mut output, &options)
                .map_err(|e| TesseraError::format(format!("Resize of plane {plane} failed: {e}")))?;
        }
        Ok(())
    }
}

/// Convert a packed RGB frame to planar YUV 4:2:0 at the same size.
///
/// Chroma is the average of each 2x2 block.
pub fn rgb_to_yuv420p(src: &VideoFrame) -> TesseraResult<VideoFrame> {
    if src.format() != PixelFormat::Rgb24 {
        return Err(TesseraError::format(format!(
            "Expected rgb24 input, got {}",
            src.format()
        )));
    }

    let (w, h) = (src.width() as usize, src.height() as usize);
    let rgb = src.plane(0);
    let pixel = |x: usize, y: usize| {
        let i = (y * w + x) * 3;
        (rgb[i] as i32, rgb[i + 1] as i32, rgb[i + 2] as i32)
    };

    let mut out = VideoFrame::allocate(src.width(), src.height(), PixelFormat::Yuv420p)?;

    {
        let luma = out.plane_mut(0);
        for y in 0..h {
            for x in 0..w {
                let (r, g, b) = pixel(x, y);
                luma[y * w + x] = (16 + ((66 * r + 129 * g + 25 * b + 128) >> 8)) as u8;
            }
        }
    }

    let (cw, ch) = PixelFormat::Yuv420p.plane_dims(1, src.width(), src.height());
    let mut u_plane = vec![0u8; cw * ch];
    let mut v_plane = vec![0u8; cw * ch];
    for cy in 0..ch {
        for cx in 0..cw {
            let (mut r, mut g, mut b, mut n) = (0, 0, 0, 0);
            for y in (cy * 2)..(cy * 2 + 2).min(h) {
                for x in (cx * 2)..(cx * 2 + 2).min(w) {
                    let (pr, pg, pb) = pixel(x, y);
                    r += pr;
                    g += pg;
                    b += pb;
                    n += 1;
                }
            }
            let (r, g, b) = (r / n, g / n, b / n);
            u_plane[cy * cw + cx] = (128 + ((-38 * r - 74 * g + 112 * b + 128) >> 8)) as u8;
            v_plane[cy * cw + cx] = (128 + ((112 * r - 94 * g - 18 * b + 128) >> 8)) as u8;
        }
    }
    out.plane_mut(1).copy_from_slice(&u_plane);
    out.plane_mut(2).copy_from_slice(&v_plane);

    Ok(out)
}
