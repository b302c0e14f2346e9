//! Helpers shared by the tests.

use std::io::Cursor;
use std::time::{Duration, Instant};

use bytes::Bytes;
use image::RgbaImage;

/// Small PNG, encoded on the fly.
pub fn png() -> Bytes {
    let mut buffer = Cursor::new(Vec::new());
    RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    Bytes::from(buffer.into_inner())
}

const PATIENCE: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds, blocking the thread in between.
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < PATIENCE, "gave up waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Like [`wait_until`], but yields to the Tokio runtime, so that mock servers can run.
pub async fn wait_until_async(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < PATIENCE, "gave up waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
