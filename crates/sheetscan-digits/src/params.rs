use serde::{Deserialize, Serialize};

/// Tuning for both digit recognizers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DigitParams {
    /// Per-segment contrast cap before on/off averaging.
    pub contrast_cap: f32,
    /// Minimum on-minus-off score to accept the best digit.
    pub accept_score: f32,
    /// Raw contrast above which a segment counts as strong.
    pub strong_contrast: f32,
    /// Relaxed score floor for the single-strong-segment escape clause.
    pub escape_score: f32,
    /// An off segment this dark vetoes the escape clause.
    pub off_veto_contrast: f32,
    /// Score at which confidence saturates.
    pub confidence_scale: f32,
    /// Confidence assigned on acceptance with fewer than two strong
    /// segments.
    pub weak_confidence: f32,
    /// Background-strip pad, in segment thicknesses.
    pub strip_pad_factor: f32,
    /// Side of the synthetic glyphs used by the template matcher.
    pub glyph_size: usize,
}

impl Default for DigitParams {
    fn default() -> Self {
        Self {
            contrast_cap: 60.0,
            accept_score: 8.0,
            strong_contrast: 6.0,
            escape_score: 5.0,
            off_veto_contrast: 15.0,
            confidence_scale: 25.0,
            weak_confidence: 0.4,
            strip_pad_factor: 1.8,
            glyph_size: 21,
        }
    }
}

/// One recognized student-ID cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigitRecognition {
    pub cell_index: usize,
    pub digit: Option<u8>,
    pub confidence: f32,
}
