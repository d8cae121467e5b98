use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;
use std::path::Path;

/// 白底画布上一道黑色竖线，类似手写的 "1"
pub fn canvas_stroke(size: u32) -> GrayImage {
    let left = size * 9 / 20;
    let right = size * 11 / 20;
    GrayImage::from_fn(size, size, |x, y| {
        if (left..right).contains(&x) && (size / 8..size * 7 / 8).contains(&y) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

pub fn png_bytes(image: &GrayImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}

pub fn png_base64(image: &GrayImage) -> String {
    base64::engine::general_purpose::STANDARD.encode(png_bytes(image))
}

pub fn png_data_url(image: &GrayImage) -> String {
    format!("data:image/png;base64,{}", png_base64(image))
}

pub fn write_png(path: &Path, image: &GrayImage) {
    image.save(path).expect("write png");
}
