use crate::qrcode::{QrCode, QUIET_ZONE, SIZE};

use image::{ImageBuffer, Luma};
use std::fmt::Write;

/*---- Options ----*/

/// Rendering settings for [`to_svg_string`].
///
/// The quiet zone is fixed at four modules; only the overall size and the colors vary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Requested width and height in pixels. The rendered document is the largest whole
    /// multiple of the module count that fits, but never smaller than one pixel per module.
    pub size: u32,
    /// RGB color of dark modules.
    pub dark: [u8; 3],
    /// RGB color of the background and light modules.
    pub light: [u8; 3],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: 192,
            dark: [0, 0, 0],
            light: [255, 255, 255],
        }
    }
}

impl RenderOptions {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

/*---- Utilities ----*/

/// Modules across the rendered image, quiet zone included.
pub const fn total_modules() -> u32 {
    (SIZE + 2 * QUIET_ZONE) as u32
}

/// Returns the integer number of pixels per module for the requested image size.
pub fn module_scale(size: u32) -> u32 {
    (size / total_modules()).max(1)
}

fn hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Returns a string of SVG code for an image depicting the given QR Code.
///
/// The document has one background rectangle covering the whole image and one path holding a
/// square per dark module. Its width and height are `(41 + 8) * scale` for the scale derived from
/// `options.size`. The string always uses Unix newlines (\n), regardless of the platform.
///
/// # Example
///
/// ```rust
/// use qrsvg::helper::{to_svg_string, RenderOptions};
///
/// let qr = qrsvg::encode_symbol("Hello, World!").unwrap();
/// let svg = to_svg_string(&qr, &RenderOptions::with_size(200));
/// assert!(svg.contains("width=\"196\""));
/// ```
pub fn to_svg_string(qr: &QrCode, options: &RenderOptions) -> String {
    let scale = module_scale(options.size);
    let dimension = total_modules() * scale;
    let margin = QUIET_ZONE as u32 * scale;

    let mut path = String::new();
    for y in 0..qr.size() {
        for x in 0..qr.size() {
            if !qr.get_module(x, y) {
                continue;
            }
            if !path.is_empty() {
                path.push(' ');
            }
            let px = margin + x as u32 * scale;
            let py = margin + y as u32 * scale;
            // Writing to a String cannot fail.
            let _ = write!(path, "M{},{}h{2}v{2}h-{2}z", px, py, scale);
        }
    }

    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {0} {0}\" width=\"{0}\" height=\"{0}\" shape-rendering=\"crispEdges\" stroke=\"none\">\n",
        dimension
    );
    result += &format!(
        "\t<rect width=\"{0}\" height=\"{0}\" fill=\"{1}\"/>\n",
        dimension,
        hex_color(options.light)
    );
    result += &format!("\t<path d=\"{}\" fill=\"{}\"/>\n", path, hex_color(options.dark));
    result += "</svg>\n";
    result
}

/// Renders the QR Code into a grayscale image buffer with a four-module quiet zone.
///
/// # Arguments
///
/// * `qr` - The QR Code to render.
/// * `scale` - Pixels per module; 0 is treated as 1.
///
/// # Example
///
/// ```
/// use qrsvg::helper::to_image_buffer;
///
/// let qr = qrsvg::encode_symbol("Hello, World!").unwrap();
/// let img = to_image_buffer(&qr, 2);
/// assert_eq!(img.dimensions(), (98, 98));
/// ```
pub fn to_image_buffer(qr: &QrCode, scale: u32) -> ImageBuffer<Luma<u8>, Vec<u8>> {
    let scale = scale.max(1);
    let dimension = total_modules() * scale;
    let border = QUIET_ZONE as i32;
    ImageBuffer::from_fn(dimension, dimension, |x, y| {
        let qr_x = (x / scale) as i32 - border;
        let qr_y = (y / scale) as i32 - border;
        if qr.get_module(qr_x, qr_y) {
            Luma([0u8]) // Black
        } else {
            Luma([255u8]) // White
        }
    })
}

/// Returns the QR Code as text, two characters per module, quiet zone included.
pub fn to_text_string(qr: &QrCode) -> String {
    let border = QUIET_ZONE as i32;
    let mut result = String::new();
    for y in -border..qr.size() + border {
        for x in -border..qr.size() + border {
            let c: char = if qr.get_module(x, y) { '█' } else { ' ' };
            result.push(c);
            result.push(c);
        }
        result.push('\n');
    }
    result
}
