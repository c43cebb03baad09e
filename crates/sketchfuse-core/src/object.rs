//! Canvas object data model.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Identifier for a placed canvas object.
///
/// Assigned by the registry from a monotone counter; unique for the lifetime
/// of a session and never reused.
pub type ObjectId = u64;

/// Encoding of a sketch image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect the format from the payload's magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(ImageFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }
}

/// Opaque sketch pixel content.
///
/// The core never inspects pixels; it only ferries them between the canvas
/// and the generation service. Data is kept base64-encoded for cheap JSON
/// serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchImage {
    /// Payload encoding.
    pub format: ImageFormat,
    /// Image bytes, base64-encoded.
    pub data_base64: String,
}

impl SketchImage {
    /// Wrap raw image bytes, detecting the format from magic bytes.
    /// Returns `None` for payloads in an unrecognized format.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let format = ImageFormat::from_magic_bytes(data)?;
        Some(Self {
            format,
            data_base64: STANDARD.encode(data),
        })
    }

    /// Decode the payload back to raw bytes.
    /// Returns `None` if the stored base64 is malformed.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        STANDARD.decode(&self.data_base64).ok()
    }

    /// MIME type of the payload.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// One placed sketch on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    /// Session-unique identifier.
    pub id: ObjectId,
    /// Top-left corner in the shared canvas coordinate space.
    /// Mutated only while the object is being dragged.
    pub position: Point,
    /// Stacking order. Strictly increases on creation and on being brought
    /// to front; the registry is the sole author of z values.
    pub z: u64,
    /// Source pixel content, opaque to the core.
    pub image: Option<SketchImage>,
}

impl CanvasObject {
    /// Create an object. Callers other than the registry are expected to be
    /// tests building fixed scenarios.
    pub fn new(id: ObjectId, position: Point, z: u64, image: Option<SketchImage>) -> Self {
        Self {
            id,
            position,
            z,
            image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal 1x1 PNG header prefix is enough for format sniffing.
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_magic_bytes(PNG_MAGIC), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), None);
        assert_eq!(ImageFormat::from_magic_bytes(&[0x89]), None);
    }

    #[test]
    fn test_image_roundtrip() {
        let image = SketchImage::from_bytes(PNG_MAGIC).unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.to_bytes().unwrap(), PNG_MAGIC);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(SketchImage::from_bytes(b"not an image").is_none());
    }

    #[test]
    fn test_object_serde_roundtrip() {
        let object = CanvasObject::new(7, Point::new(12.0, 34.0), 3, None);
        let json = serde_json::to_string(&object).unwrap();
        let back: CanvasObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, object);
    }
}
