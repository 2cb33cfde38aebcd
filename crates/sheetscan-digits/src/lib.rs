//! Student-ID digit recognition.
//!
//! Two independent readers run over the ID cells: the segment-contrast
//! recognizer (primary) and a glyph template matcher (secondary). Both
//! sequences are surfaced to callers; the one with more readable digits is
//! presented as primary, the segment method winning ties.

mod params;
mod recognizer;
mod template_match;

pub use params::{DigitParams, DigitRecognition};
pub use recognizer::recognize_segments;
pub use template_match::{glyph, recognize_template};

/// Count of readable digits in a sequence.
fn readable(seq: &[DigitRecognition]) -> usize {
    seq.iter().filter(|r| r.digit.is_some()).count()
}

/// Pick the primary sequence: more non-null digits wins, segments win ties.
pub fn choose_digit_primary<'a>(
    segments: &'a [DigitRecognition],
    template: &'a [DigitRecognition],
) -> &'a [DigitRecognition] {
    if readable(segments) >= readable(template) {
        segments
    } else {
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(digits: &[Option<u8>]) -> Vec<DigitRecognition> {
        digits
            .iter()
            .enumerate()
            .map(|(i, &d)| DigitRecognition {
                cell_index: i,
                digit: d,
                confidence: if d.is_some() { 0.8 } else { 0.0 },
            })
            .collect()
    }

    #[test]
    fn more_readable_digits_win() {
        let segments = seq(&[Some(1), None, Some(3)]);
        let template = seq(&[Some(1), Some(2), Some(3)]);
        let primary = choose_digit_primary(&segments, &template);
        assert_eq!(primary[1].digit, Some(2));
    }

    #[test]
    fn segments_win_ties() {
        let segments = seq(&[Some(1), Some(2)]);
        let template = seq(&[Some(7), Some(8)]);
        let primary = choose_digit_primary(&segments, &template);
        assert_eq!(primary[0].digit, Some(1));
    }
}
