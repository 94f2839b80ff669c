//! # qrsvg
//!
//! A Rust library for turning short text into a QR code rendered as SVG.
//!
//! `qrsvg` always produces the same kind of symbol: QR Code Model 2, version 6 (41×41 modules),
//! error correction level Medium, byte mode. That holds up to 106 bytes of UTF-8. The best of the
//! eight mask patterns is chosen by penalty score, and the result is rendered as a minimal SVG
//! document, a grayscale image buffer, or console text.
//!
//! ## Example
//!
//! Generate an SVG string:
//!
//! ```rust
//! let svg = qrsvg::encode("HELLO", 200).unwrap();
//! assert!(svg.contains("width=\"196\""));
//! ```
//!
//! Errors are reported rather than panicking:
//!
//! ```rust
//! use qrsvg::EncodeError;
//!
//! assert_eq!(qrsvg::encode("", 200), Err(EncodeError::Input));
//! assert!(matches!(
//!     qrsvg::encode(&"x".repeat(107), 200),
//!     Err(EncodeError::Capacity { .. })
//! ));
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Core QR code encoding functionality.
//! - [`helper`]: Utilities for rendering QR codes in various formats.

pub mod helper;
pub mod qrcode;

use std::sync::OnceLock;

use image::{ImageBuffer, Luma};

pub use crate::helper::RenderOptions;
pub use crate::qrcode::{EncodeError, Mask, QrCode, QrEncoder};

fn shared_encoder() -> &'static QrEncoder {
    static ENCODER: OnceLock<QrEncoder> = OnceLock::new();
    ENCODER.get_or_init(QrEncoder::new)
}

/// Encodes `text` and renders it as an SVG document about `size` pixels wide.
///
/// # Errors
///
/// [`EncodeError::Input`] if `text` is empty, [`EncodeError::Capacity`] if it is longer than
/// 106 bytes.
pub fn encode(text: &str, size: u32) -> Result<String, EncodeError> {
    encode_with(text, &RenderOptions::with_size(size))
}

/// Like [`encode`], with full control over the rendering.
pub fn encode_with(text: &str, options: &RenderOptions) -> Result<String, EncodeError> {
    let qr = encode_symbol(text)?;
    Ok(helper::to_svg_string(&qr, options))
}

/// Encodes `text` into a symbol without rendering it.
pub fn encode_symbol(text: &str) -> Result<QrCode, EncodeError> {
    shared_encoder().encode_text(text)
}

/// Encodes `text` and renders it as a grayscale image about `size` pixels wide.
///
/// # Example
///
/// ```
/// let img = qrsvg::encode_image("Hello, World!", 200).unwrap();
/// assert_eq!(img.dimensions(), (196, 196));
/// ```
pub fn encode_image(text: &str, size: u32) -> Result<ImageBuffer<Luma<u8>, Vec<u8>>, EncodeError> {
    let qr = encode_symbol(text)?;
    Ok(helper::to_image_buffer(&qr, helper::module_scale(size)))
}
