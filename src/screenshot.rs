/*!
Framebuffer PNG dumps (feature `screenshot`).
*/

use std::path::Path;

use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Save a packed-color framebuffer as an RGBA PNG.
pub fn save_png<P: AsRef<Path>>(path: P, framebuffer: &[u32]) -> Result<(), image::ImageError> {
    let mut img = image::RgbaImage::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
    for (pixel, &color) in img.pixels_mut().zip(framebuffer) {
        *pixel = image::Rgba([
            (color >> 16) as u8,
            (color >> 8) as u8,
            color as u8,
            (color >> 24) as u8,
        ]);
    }
    img.save(path)
}
