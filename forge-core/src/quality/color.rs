//! Color math: WCAG relative luminance and contrast, CIE Lab conversion,
//! and the CIE76 ΔE difference used for token adherence.

use crate::error::{ForgeError, ForgeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parse `#RRGGBB`.
pub fn parse_hex(s: &str) -> ForgeResult<Rgb> {
    let hex = s
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| ForgeError::InvalidInput(format!("'{s}' is not a #RRGGBB color")))?;
    Ok(Rgb {
        r: u8::from_str_radix(&hex[0..2], 16).expect("validated hex"),
        g: u8::from_str_radix(&hex[2..4], 16).expect("validated hex"),
        b: u8::from_str_radix(&hex[4..6], 16).expect("validated hex"),
    })
}

fn srgb_linearize(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// WCAG relative luminance in [0, 1].
pub fn relative_luminance(color: Rgb) -> f64 {
    0.2126 * srgb_linearize(color.r)
        + 0.7152 * srgb_linearize(color.g)
        + 0.0722 * srgb_linearize(color.b)
}

/// WCAG contrast ratio in [1, 21].
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (relative_luminance(a), relative_luminance(b));
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// CIE Lab coordinates under the D65 illuminant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

pub fn rgb_to_lab(color: Rgb) -> Lab {
    // sRGB → linear → XYZ (D65)
    let r = srgb_linearize(color.r);
    let g = srgb_linearize(color.g);
    let b = srgb_linearize(color.b);

    let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
    let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
    let z = r * 0.0193 + g * 0.1192 + b * 0.9505;

    // Normalize by D65 white point
    let xn = x / 0.95047;
    let yn = y / 1.0;
    let zn = z / 1.08883;

    fn f(t: f64) -> f64 {
        const DELTA: f64 = 6.0 / 29.0;
        if t > DELTA.powi(3) {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    }

    Lab {
        l: 116.0 * f(yn) - 16.0,
        a: 500.0 * (f(xn) - f(yn)),
        b: 200.0 * (f(yn) - f(zn)),
    }
}

/// CIE76 color difference: Euclidean distance in Lab space. ΔE ≤ 2 is at
/// the just-noticeable-difference boundary.
pub fn delta_e_cie76(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (rgb_to_lab(a), rgb_to_lab(b));
    ((la.l - lb.l).powi(2) + (la.a - lb.a).powi(2) + (la.b - lb.b).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#3B82F6").unwrap(), Rgb { r: 59, g: 130, b: 246 });
        assert_eq!(parse_hex("#000000").unwrap(), BLACK);
        assert!(parse_hex("#fff").is_err());
        assert!(parse_hex("3B82F6").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_luminance_extremes() {
        assert!(relative_luminance(BLACK).abs() < 1e-9);
        assert!((relative_luminance(WHITE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_black_white_contrast_is_21() {
        assert!((contrast_ratio(BLACK, WHITE) - 21.0).abs() < 1e-6);
        assert!((contrast_ratio(WHITE, BLACK) - 21.0).abs() < 1e-6);
    }

    #[test]
    fn test_same_color_contrast_is_1() {
        let c = parse_hex("#3B82F6").unwrap();
        assert!((contrast_ratio(c, c) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_known_contrast_pair() {
        // #767676 on white is the canonical 4.54:1 AA boundary gray.
        let gray = parse_hex("#767676").unwrap();
        let ratio = contrast_ratio(gray, WHITE);
        assert!((ratio - 4.54).abs() < 0.01, "got {ratio}");
    }

    #[test]
    fn test_lab_white_point() {
        let lab = rgb_to_lab(WHITE);
        assert!((lab.l - 100.0).abs() < 0.1);
        assert!(lab.a.abs() < 0.5);
        assert!(lab.b.abs() < 0.5);
    }

    #[test]
    fn test_delta_e_identical_is_zero() {
        let c = parse_hex("#3B82F6").unwrap();
        assert!(delta_e_cie76(c, c).abs() < 1e-9);
    }

    #[test]
    fn test_delta_e_near_colors_within_jnd() {
        let a = parse_hex("#3B82F6").unwrap();
        let b = parse_hex("#3B83F6").unwrap();
        assert!(delta_e_cie76(a, b) <= 2.0);
    }

    #[test]
    fn test_delta_e_far_colors_large() {
        let blue = parse_hex("#3B82F6").unwrap();
        let red = parse_hex("#EF4444").unwrap();
        assert!(delta_e_cie76(blue, red) > 20.0);
    }
}
