//! A small software rasterizer for card snapshots.
//!
//! Draws the card as a block layout: header band, one row per text line,
//! a swatch per badge, and the bio paragraphs when expanded. Image references
//! are checked the way a browser canvas would: relative and `data:` refs are
//! same-origin, absolute refs must come from a host that serves CORS headers.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use super::{CaptureError, RasterImage, RasterOptions, Rasterizer};
use crate::card::CardView;
use crate::config::RasterConfig;

const HEADER_HEIGHT: u32 = 48;
const LINE_HEIGHT: u32 = 24;
const BADGE_ROW_HEIGHT: u32 = 40;
const BADGE_SIZE: u32 = 28;
const BADGE_GAP: u32 = 8;
const PADDING: u32 = 16;
const CORNER: u32 = 12;

/// Upper bound on the RGBA canvas allocated for one capture.
const MAX_CANVAS_BYTES: u64 = 256 * 1024 * 1024;

const CARD_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const HEADER_FILL: Rgba<u8> = Rgba([72, 61, 139, 255]);
const TEXT_FILL: Rgba<u8> = Rgba([210, 210, 220, 255]);
const DRAG_FILL: Rgba<u8> = Rgba([232, 244, 253, 255]);
const OPAQUE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rasterizes cards into PNG images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRasterizer {
    card_width: u32,
    cors_hosts: Vec<String>,
}

impl CardRasterizer {
    /// Create a rasterizer.
    #[must_use]
    pub fn new(card_width: u32, cors_hosts: Vec<String>) -> Self {
        Self {
            card_width,
            cors_hosts,
        }
    }

    fn check_origins(&self, view: &CardView, use_cors: bool) -> Result<(), CaptureError> {
        for src in view.image_refs() {
            let Some(host) = cross_origin_host(src) else {
                continue;
            };
            let allowed = use_cors
                && self
                    .cors_hosts
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(host));
            if !allowed {
                return Err(CaptureError::TaintedImage {
                    src: src.to_string(),
                });
            }
        }
        Ok(())
    }

    fn draw(&self, view: &CardView, options: &RasterOptions) -> Result<RgbaImage, CaptureError> {
        let layout = Layout::measure(view);
        let width = scaled(self.card_width, options.scale);
        let height = scaled(layout.height, options.scale);
        let bytes = u64::from(width) * u64::from(height) * 4;
        if bytes > MAX_CANVAS_BYTES {
            return Err(CaptureError::Unsupported(format!(
                "{width}x{height} canvas exceeds {MAX_CANVAS_BYTES} bytes"
            )));
        }
        let background = if options.transparent_background {
            CLEAR
        } else {
            OPAQUE_BACKGROUND
        };

        let mut canvas = RgbaImage::from_pixel(width, height, background);
        let corner = scaled(CORNER, options.scale);
        let body = if view.drag_over { DRAG_FILL } else { CARD_FILL };
        fill_rounded(&mut canvas, corner, body);

        let header = scaled(HEADER_HEIGHT, options.scale);
        fill_rect(&mut canvas, 0, 0, width, header, HEADER_FILL, corner);

        let pad = scaled(PADDING, options.scale);
        let line = scaled(LINE_HEIGHT, options.scale);
        let bar = (line / 2).max(1);
        let mut y = header;
        for _ in 0..layout.text_lines_before_badges {
            fill_rect(&mut canvas, pad, y + line / 4, width / 2, bar, TEXT_FILL, 0);
            y += line;
        }

        let size = scaled(BADGE_SIZE, options.scale);
        let gap = scaled(BADGE_GAP, options.scale);
        let mut x = pad;
        for badge in &view.badges {
            if x + size > width.saturating_sub(pad) {
                break;
            }
            fill_rect(&mut canvas, x, y + gap / 2, size, size, swatch(badge.id.as_str()), 0);
            x += size + gap;
        }
        y += scaled(BADGE_ROW_HEIGHT, options.scale);

        for _ in 0..layout.text_lines_after_badges {
            let span = width.saturating_sub(2 * pad);
            fill_rect(&mut canvas, pad, y + line / 4, span, bar, TEXT_FILL, 0);
            y += line;
        }
        Ok(canvas)
    }
}

impl From<&RasterConfig> for CardRasterizer {
    fn from(config: &RasterConfig) -> Self {
        Self::new(config.card_width, config.cors_hosts.clone())
    }
}

#[async_trait]
impl Rasterizer for CardRasterizer {
    async fn rasterize(
        &self,
        view: &CardView,
        options: &RasterOptions,
    ) -> Result<RasterImage, CaptureError> {
        self.check_origins(view, options.use_cors)?;

        let canvas = self.draw(view, options)?;
        let (width, height) = canvas.dimensions();
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        debug!(card = %view.key, width, height, bytes = png.len(), "Card rasterized");
        Ok(RasterImage { width, height, png })
    }
}

/// Vertical layout in logical pixels.
struct Layout {
    text_lines_before_badges: u32,
    text_lines_after_badges: u32,
    height: u32,
}

impl Layout {
    fn measure(view: &CardView) -> Self {
        let text_lines_before_badges = 1 + u32::from(view.specialisation.is_some());

        let mut after = 1 + u32::from(view.phone.is_some());
        if let Some(bio) = &view.bio {
            // toggle label, plus paragraphs when expanded
            after += 1;
            if bio.expanded {
                after += u32::try_from(bio.paragraphs.len()).unwrap_or(u32::MAX);
            }
        }
        if view.removal_notice {
            after += 1;
        }

        let height = HEADER_HEIGHT
            + LINE_HEIGHT * text_lines_before_badges
            + BADGE_ROW_HEIGHT
            + LINE_HEIGHT.saturating_mul(after)
            + PADDING;
        Self {
            text_lines_before_badges,
            text_lines_after_badges: after,
            height,
        }
    }
}

/// The host of an image reference that is not same-origin.
fn cross_origin_host(src: &str) -> Option<&str> {
    let rest = src
        .strip_prefix("https://")
        .or_else(|| src.strip_prefix("http://"))
        .or_else(|| src.strip_prefix("//"))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    Some(authority.split(':').next().unwrap_or(authority))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(value: u32, scale: f32) -> u32 {
    ((f64::from(value) * f64::from(scale)).round() as u32).max(1)
}

fn swatch(id: &str) -> Rgba<u8> {
    let hash = id
        .bytes()
        .fold(0x811c_9dc5_u32, |acc, b| (acc ^ u32::from(b)).wrapping_mul(0x0100_0193));
    let [r, g, b, _] = hash.to_le_bytes();
    Rgba([r, g, b, 255])
}

fn fill_rounded(canvas: &mut RgbaImage, radius: u32, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    fill_rect(canvas, 0, 0, width, height, color, radius);
}

/// Fill a rectangle, clipping to the canvas and to rounded canvas corners.
fn fill_rect(
    canvas: &mut RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    color: Rgba<u8>,
    radius: u32,
) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    let x_end = x.saturating_add(width).min(canvas_width);
    let y_end = y.saturating_add(height).min(canvas_height);
    for py in y..y_end {
        for px in x..x_end {
            if radius == 0 || inside_rounded(px, py, canvas_width, canvas_height, radius) {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

fn inside_rounded(x: u32, y: u32, width: u32, height: u32, radius: u32) -> bool {
    let dx = if x < radius {
        radius - x
    } else if x >= width.saturating_sub(radius) {
        x + 1 + radius - width
    } else {
        return true;
    };
    let dy = if y < radius {
        radius - y
    } else if y >= height.saturating_sub(radius) {
        y + 1 + radius - height
    } else {
        return true;
    };
    let (dx, dy, radius) = (u64::from(dx), u64::from(dy), u64::from(radius));
    dx * dx + dy * dy <= radius * radius
}
