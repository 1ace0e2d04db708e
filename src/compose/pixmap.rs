use image::{Rgba, RgbaImage};
use tiny_skia::Pixmap;

/// Copies a premultiplied pixmap back into a straight-alpha image.
pub fn from_pixmap(pixmap: &Pixmap) -> Option<RgbaImage> {
    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
}

/// Replaces every canvas pixel the layer painted. Untouched layer pixels
/// leave the canvas as it was, translucent source pixels included.
pub fn paint_over(canvas: &mut RgbaImage, layer: &Pixmap) {
    let width = layer.width().min(canvas.width());
    let height = layer.height().min(canvas.height());
    for y in 0..height {
        for x in 0..width {
            let Some(pixel) = layer.pixel(x, y) else {
                continue;
            };
            if pixel.alpha() == 0 {
                continue;
            }
            let color = pixel.demultiply();
            canvas.put_pixel(
                x,
                y,
                Rgba([color.red(), color.green(), color.blue(), color.alpha()]),
            );
        }
    }
}
