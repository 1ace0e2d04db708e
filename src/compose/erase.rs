use image::{RgbaImage, imageops};

use crate::geometry::BoxCoords;

/// Blurs the pixels under `area` in place. The area is clipped to the canvas.
pub fn blur_area(canvas: &mut RgbaImage, area: BoxCoords, sigma: f32) -> bool {
    let Some((x, y, width, height)) = clip(canvas, area) else {
        return false;
    };
    let cropped = imageops::crop_imm(canvas, x, y, width, height).to_image();
    let blurred = imageops::blur(&cropped, sigma);
    imageops::replace(canvas, &blurred, i64::from(x), i64::from(y));
    true
}

fn clip(canvas: &RgbaImage, area: BoxCoords) -> Option<(u32, u32, u32, u32)> {
    let left = area.left.max(0) as u32;
    let upper = area.upper.max(0) as u32;
    let right = (area.right.max(0) as u32).min(canvas.width());
    let lower = (area.lower.max(0) as u32).min(canvas.height());
    if right <= left || lower <= upper {
        return None;
    }
    Some((left, upper, right - left, lower - upper))
}
