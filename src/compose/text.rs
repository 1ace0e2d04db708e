use image::{RgbaImage, imageops};
use resvg::render;
use tiny_skia::{Pixmap, Transform};
use tracing::{debug, warn};
use usvg::{Options, Tree};

use super::pixmap::from_pixmap;
use crate::geometry::{SnappedAngle, TextField};

/// Glyph style used for every replacement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    pub fill: String,
    pub stroke: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            fill: "white".to_string(),
            stroke: "black".to_string(),
        }
    }
}

/// Renders `text` tightly cropped to its inked area, stroke included.
/// Returns `None` when nothing would be visible, e.g. no usable font.
pub fn render_text(
    text: &str,
    font_size: i32,
    stroke_width: i32,
    family: &str,
    style: &TextStyle,
    options: &Options<'_>,
) -> Option<RgbaImage> {
    let svg = text_svg(text, font_size, stroke_width, family, style);
    let tree = match Tree::from_str(&svg, options) {
        Ok(tree) => tree,
        Err(err) => {
            warn!("failed to build text layer for {:?}: {}", text, err);
            return None;
        }
    };

    let bbox = tree.root().abs_stroke_bounding_box();
    let left = bbox.left().floor();
    let top = bbox.top().floor();
    let width = (bbox.right().ceil() - left) as u32;
    let height = (bbox.bottom().ceil() - top) as u32;
    if width == 0 || height == 0 {
        debug!("text {:?} has no ink", text);
        return None;
    }

    let mut pixmap = Pixmap::new(width, height)?;
    render(
        &tree,
        Transform::from_translate(-left, -top),
        &mut pixmap.as_mut(),
    );
    from_pixmap(&pixmap)
}

fn text_svg(text: &str, font_size: i32, stroke_width: i32, family: &str, style: &TextStyle) -> String {
    let size = font_size.max(1);
    // canvas size only matters for percentage units, the text is measured separately
    let width = (text.chars().count() as i32 + 2) * size;
    let height = size * 2;
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="0" y="{size}" font-size="{size}" font-family="{family}" fill="{fill}" stroke="{stroke}" stroke-width="{stroke_width}" stroke-linejoin="round" paint-order="stroke" xml:space="preserve">{text}</text></svg>"#,
        width = width,
        height = height,
        size = size,
        family = escape_xml(family),
        fill = escape_xml(&style.fill),
        stroke = escape_xml(&style.stroke),
        // SVG strokes are centered on the outline
        stroke_width = stroke_width.max(0) * 2,
        text = escape_xml(text),
    )
}

/// Shrinks the rendered text to fit the field (never enlarges it) and turns
/// it to the field's angle, counter-clockwise.
pub fn fit_to_field(rendered: RgbaImage, field: &TextField) -> RgbaImage {
    let max_width = field.width().unwrap_or(0).max(1) as u32;
    let max_height = field.height().unwrap_or(0).max(1) as u32;
    let width = rendered.width().min(max_width);
    let height = rendered.height().min(max_height);
    let scaled = if (width, height) == rendered.dimensions() {
        rendered
    } else {
        imageops::resize(&rendered, width, height, imageops::FilterType::CatmullRom)
    };
    rotate_ccw(scaled, field.angle())
}

fn rotate_ccw(image: RgbaImage, angle: SnappedAngle) -> RgbaImage {
    match angle {
        SnappedAngle::Deg0 | SnappedAngle::Deg360 => image,
        SnappedAngle::Deg90 => imageops::rotate270(&image),
        SnappedAngle::Deg180 => imageops::rotate180(&image),
        SnappedAngle::Deg270 => imageops::rotate90(&image),
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
