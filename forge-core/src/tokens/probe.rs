//! Upload admission for design screenshots.
//!
//! The transport's upload-safety scanner (PII, SVG XSS, magic numbers) runs
//! before the core and hands over a verdict object; this module consumes
//! that verdict and enforces the size and dimension contract: ≤10 MB,
//! PNG/JPG/SVG, ≥50×50 px, ≤25 megapixels. All limits are inclusive.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ForgeError, ForgeResult};

/// Verdict produced by the upload-safety collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadVerdict {
    pub is_safe: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl UploadVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            issues: Vec::new(),
            reason: None,
        }
    }

    pub fn unsafe_because(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            is_safe: false,
            issues: vec![reason.clone()],
            reason: Some(reason),
        }
    }
}

/// Admission limits. Defaults match the upload contract.
#[derive(Debug, Clone)]
pub struct ImageLimits {
    pub max_bytes: usize,
    pub min_side_px: u32,
    pub max_pixels: u64,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            min_side_px: 50,
            max_pixels: 25_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Png,
    Jpeg,
    Svg,
}

/// An admitted upload, with its content digest for cache keying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub kind: UploadKind,
    pub byte_len: usize,
    /// Pixel dimensions. `None` for SVGs without explicit width/height.
    pub dimensions: Option<(u32, u32)>,
    /// SHA-256 of the raw bytes, hex-encoded.
    pub digest: String,
}

fn kind_from_mime(mime: &str) -> ForgeResult<UploadKind> {
    match mime {
        "image/png" => Ok(UploadKind::Png),
        "image/jpeg" | "image/jpg" => Ok(UploadKind::Jpeg),
        "image/svg+xml" => Ok(UploadKind::Svg),
        other => Err(ForgeError::InvalidInput(format!(
            "unsupported image type '{other}', expected PNG, JPG, or SVG"
        ))),
    }
}

/// Pull numeric `width="…"`/`height="…"` attributes off the SVG root, when
/// present. Percentage and unit-suffixed values other than px are skipped.
fn svg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let head = std::str::from_utf8(&bytes[..bytes.len().min(2048)]).ok()?;
    let svg_tag = head.find("<svg")?;
    let tag_end = head[svg_tag..].find('>')? + svg_tag;
    let tag = &head[svg_tag..tag_end];

    let attr = |name: &str| -> Option<u32> {
        let needle = format!("{name}=\"");
        let start = tag.find(&needle)? + needle.len();
        let end = tag[start..].find('"')? + start;
        let raw = tag[start..end].trim().trim_end_matches("px");
        raw.parse::<f64>().ok().map(|v| v.round() as u32)
    };

    Some((attr("width")?, attr("height")?))
}

/// Validate an upload against the safety verdict and the admission limits.
pub fn admit_image(
    bytes: &[u8],
    mime: &str,
    verdict: &UploadVerdict,
    limits: &ImageLimits,
) -> ForgeResult<ImageInfo> {
    if !verdict.is_safe {
        let reason = verdict
            .reason
            .clone()
            .unwrap_or_else(|| "upload rejected by safety scan".into());
        return Err(ForgeError::InvalidInput(reason));
    }

    let kind = kind_from_mime(mime)?;

    if bytes.is_empty() {
        return Err(ForgeError::InvalidInput("empty upload".into()));
    }
    if bytes.len() > limits.max_bytes {
        return Err(ForgeError::InvalidInput(format!(
            "image is {} bytes, limit is {} bytes",
            bytes.len(),
            limits.max_bytes
        )));
    }

    let dimensions = match kind {
        UploadKind::Svg => svg_dimensions(bytes),
        UploadKind::Png | UploadKind::Jpeg => {
            let reader = image::ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()
                .map_err(|e| ForgeError::InvalidInput(format!("unreadable image: {e}")))?;
            let (w, h) = reader
                .into_dimensions()
                .map_err(|e| ForgeError::InvalidInput(format!("corrupt image: {e}")))?;
            Some((w, h))
        }
    };

    if let Some((w, h)) = dimensions {
        if w < limits.min_side_px || h < limits.min_side_px {
            return Err(ForgeError::InvalidInput(format!(
                "image is {w}x{h}px, minimum is {0}x{0}px",
                limits.min_side_px
            )));
        }
        let pixels = w as u64 * h as u64;
        if pixels > limits.max_pixels {
            return Err(ForgeError::InvalidInput(format!(
                "image is {pixels} pixels, limit is {} pixels",
                limits.max_pixels
            )));
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(bytes);

    Ok(ImageInfo {
        kind,
        byte_len: bytes.len(),
        dimensions,
        digest: format!("{:x}", hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal PNG encoding of a `w`x`h` gray image.
    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_luma8(w, h);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_minimum_dimensions_are_inclusive() {
        let ok = admit_image(
            &png_bytes(50, 50),
            "image/png",
            &UploadVerdict::safe(),
            &ImageLimits::default(),
        );
        assert!(ok.is_ok());
        assert_eq!(ok.unwrap().dimensions, Some((50, 50)));

        let too_small = admit_image(
            &png_bytes(49, 49),
            "image/png",
            &UploadVerdict::safe(),
            &ImageLimits::default(),
        );
        match too_small {
            Err(ForgeError::InvalidInput(msg)) => assert!(msg.contains("49x49")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_byte_limit_is_inclusive() {
        // Use a tiny limit so the test doesn't need a 10 MB fixture; the
        // comparison logic is the same.
        let bytes = png_bytes(60, 60);
        let limits = ImageLimits {
            max_bytes: bytes.len(),
            ..Default::default()
        };
        assert!(admit_image(&bytes, "image/png", &UploadVerdict::safe(), &limits).is_ok());

        let limits_minus_one = ImageLimits {
            max_bytes: bytes.len() - 1,
            ..Default::default()
        };
        assert!(matches!(
            admit_image(&bytes, "image/png", &UploadVerdict::safe(), &limits_minus_one),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_megapixel_limit_is_inclusive() {
        let bytes = png_bytes(100, 100);
        let at_limit = ImageLimits {
            max_pixels: 10_000,
            ..Default::default()
        };
        assert!(admit_image(&bytes, "image/png", &UploadVerdict::safe(), &at_limit).is_ok());

        let below_limit = ImageLimits {
            max_pixels: 9_999,
            ..Default::default()
        };
        assert!(matches!(
            admit_image(&bytes, "image/png", &UploadVerdict::safe(), &below_limit),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unsafe_verdict_rejects_before_decode() {
        let err = admit_image(
            b"not an image at all",
            "image/png",
            &UploadVerdict::unsafe_because("svg script payload"),
            &ImageLimits::default(),
        );
        match err {
            Err(ForgeError::InvalidInput(msg)) => assert!(msg.contains("script")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_mime_rejected() {
        assert!(matches!(
            admit_image(
                &png_bytes(60, 60),
                "image/webp",
                &UploadVerdict::safe(),
                &ImageLimits::default()
            ),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_corrupt_png_rejected() {
        let mut bytes = png_bytes(60, 60);
        bytes.truncate(12);
        assert!(matches!(
            admit_image(&bytes, "image/png", &UploadVerdict::safe(), &ImageLimits::default()),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_svg_with_explicit_dimensions() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="120"><rect/></svg>"#;
        let info = admit_image(
            svg,
            "image/svg+xml",
            &UploadVerdict::safe(),
            &ImageLimits::default(),
        )
        .unwrap();
        assert_eq!(info.kind, UploadKind::Svg);
        assert_eq!(info.dimensions, Some((200, 120)));
    }

    #[test]
    fn test_small_svg_rejected() {
        let svg = br#"<svg width="20" height="20"></svg>"#;
        assert!(matches!(
            admit_image(svg, "image/svg+xml", &UploadVerdict::safe(), &ImageLimits::default()),
            Err(ForgeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_svg_without_dimensions_is_admitted() {
        let svg = br#"<svg viewBox="0 0 24 24"><path d="M0 0"/></svg>"#;
        let info = admit_image(
            svg,
            "image/svg+xml",
            &UploadVerdict::safe(),
            &ImageLimits::default(),
        )
        .unwrap();
        assert_eq!(info.dimensions, None);
    }

    #[test]
    fn test_digest_is_stable() {
        let bytes = png_bytes(60, 60);
        let a = admit_image(&bytes, "image/png", &UploadVerdict::safe(), &ImageLimits::default())
            .unwrap();
        let b = admit_image(&bytes, "image/png", &UploadVerdict::safe(), &ImageLimits::default())
            .unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest.len(), 64);
    }
}
