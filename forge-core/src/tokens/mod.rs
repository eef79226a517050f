//! Design token model, validation, fallbacks, Figma semantic mapping, and
//! upload admission.

pub mod fallback;
pub mod figma_map;
pub mod probe;
pub mod types;

pub use fallback::{apply_fallbacks, default_tokens, FALLBACK_CONFIDENCE_THRESHOLD};
pub use figma_map::{classify_style, FigmaStyleType, SemanticSlot, StyleMapping};
pub use probe::{admit_image, ImageInfo, ImageLimits, UploadKind, UploadVerdict};
pub use types::{
    ColorTokens, CssLength, DesignTokens, NamedToken, RadiusScale, SizeScale, SlotKind,
    SpacingScale, TokenField, TokenViolation, Typography,
};
