use tiny_skia::{Paint, Pixmap, Rect, Transform};

use crate::geometry::BoxCoords;

/// Strokes an unfilled rectangle whose edges are inclusive, growing the
/// line inwards by `thickness` pixels.
pub fn stroke_box(pixmap: &mut Pixmap, area: BoxCoords, thickness: i32, paint: &Paint<'_>) {
    let left = area.left as f32;
    let upper = area.upper as f32;
    let width = (area.right - area.left + 1) as f32;
    let height = (area.lower - area.upper + 1) as f32;
    let thickness = thickness.max(1) as f32;

    let bands = [
        Rect::from_xywh(left, upper, width, thickness),
        Rect::from_xywh(left, upper + height - thickness, width, thickness),
        Rect::from_xywh(left, upper, thickness, height),
        Rect::from_xywh(left + width - thickness, upper, thickness, height),
    ];
    for band in bands.into_iter().flatten() {
        pixmap.fill_rect(band, paint, Transform::identity(), None);
    }
}

pub fn solid_paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    let [r, g, b, a] = rgba;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = false;
    paint
}
