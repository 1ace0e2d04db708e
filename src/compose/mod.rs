use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage, imageops};
use std::io::Cursor;
use tiny_skia::Pixmap;
use tracing::{debug, warn};
use usvg::Options;

mod erase;
mod outline;
mod pixmap;
mod text;

pub use text::TextStyle;

use crate::font::OverlayFont;
use crate::geometry::TextField;

pub const DEFAULT_BLUR_RADIUS: f32 = 10.0;
pub const DEFAULT_FIELD_CAP: usize = 150;
pub const DEFAULT_OUTLINE_COLOR: [u8; 4] = [0x7f, 0xff, 0x00, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Blur the original text away and draw the field text on top.
    Overlay,
    /// Only draw each field's padded box.
    Outline { color: [u8; 4] },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    pub field_cap: usize,
    pub blur_radius: f32,
    pub style: TextStyle,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            field_cap: DEFAULT_FIELD_CAP,
            blur_radius: DEFAULT_BLUR_RADIUS,
            style: TextStyle::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub png: Vec<u8>,
    /// Fields that actually produced pixels.
    pub drawn: usize,
}

/// Draws fields back onto the source image. CPU bound; run it off the async
/// scheduler.
#[derive(Debug, Clone)]
pub struct Composer {
    font: OverlayFont,
    options: ComposeOptions,
}

impl Composer {
    pub fn new(font: OverlayFont, options: ComposeOptions) -> Self {
        Self { font, options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    pub fn compose(&self, image: &[u8], fields: &[TextField], mode: RenderMode) -> Result<Composition> {
        let mut canvas = image::load_from_memory(image)
            .with_context(|| "failed to decode source image")?
            .to_rgba8();

        let fields = if fields.len() > self.options.field_cap {
            warn!(
                "drawing only {} of {} fields",
                self.options.field_cap,
                fields.len()
            );
            &fields[..self.options.field_cap]
        } else {
            fields
        };

        let drawn = match mode {
            RenderMode::Overlay => self.overlay(&mut canvas, fields),
            RenderMode::Outline { color } => outline_fields(&mut canvas, fields, color)?,
        };
        debug!("drew {} of {} fields", drawn, fields.len());

        Ok(Composition {
            png: encode_png(canvas)?,
            drawn,
        })
    }

    fn overlay(&self, canvas: &mut RgbaImage, fields: &[TextField]) -> usize {
        // every area is blurred before any text is drawn so neighbours never
        // smear fresh text
        for field in fields {
            if let Some(area) = field.padded_coords() {
                erase::blur_area(canvas, area, self.options.blur_radius);
            }
        }

        let options = Options {
            fontdb: self.font.database(),
            ..Options::default()
        };
        let mut drawn = 0;
        for field in fields {
            let (Some(area), Some(font_size), Some(stroke_width)) =
                (field.padded_coords(), field.font_size(), field.stroke_width())
            else {
                continue;
            };
            let Some(rendered) = text::render_text(
                &field.text,
                font_size,
                stroke_width,
                self.font.family(),
                &self.options.style,
                &options,
            ) else {
                warn!("could not render {:?}, leaving the area blurred", field.text);
                continue;
            };
            let layer = text::fit_to_field(rendered, field);
            imageops::overlay(canvas, &layer, i64::from(area.left), i64::from(area.upper));
            drawn += 1;
        }
        drawn
    }
}

fn outline_fields(canvas: &mut RgbaImage, fields: &[TextField], color: [u8; 4]) -> Result<usize> {
    // boxes go on their own layer; only the band pixels reach the canvas
    let mut layer = Pixmap::new(canvas.width(), canvas.height())
        .ok_or_else(|| anyhow!("image has no pixels"))?;
    let paint = outline::solid_paint(color);
    let mut drawn = 0;
    for field in fields {
        let (Some(area), Some(thickness)) = (field.padded_coords(), field.stroke_width()) else {
            continue;
        };
        outline::stroke_box(&mut layer, area, thickness, &paint);
        drawn += 1;
    }
    pixmap::paint_over(canvas, &layer);
    Ok(drawn)
}

fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .with_context(|| "failed to encode PNG")?;
    Ok(bytes)
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(value: &str) -> Result<[u8; 4]> {
    let hex = value.trim().trim_start_matches('#');
    let channel = |index: usize, len: usize| {
        let digits = &hex[index * len..(index + 1) * len];
        let parsed = u8::from_str_radix(digits, 16)
            .map_err(|_| anyhow!("invalid color '{}'", value))?;
        Ok::<u8, anyhow::Error>(if len == 1 { parsed * 17 } else { parsed })
    };
    if !hex.is_ascii() {
        return Err(anyhow!("invalid color '{}'", value));
    }
    match hex.len() {
        3 => Ok([channel(0, 1)?, channel(1, 1)?, channel(2, 1)?, 0xff]),
        6 => Ok([channel(0, 2)?, channel(1, 2)?, channel(2, 2)?, 0xff]),
        8 => Ok([channel(0, 2)?, channel(1, 2)?, channel(2, 2)?, channel(3, 2)?]),
        _ => Err(anyhow!("invalid color '{}'", value)),
    }
}
