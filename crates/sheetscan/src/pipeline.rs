//! The grading pipeline: preprocess, locate, rectify, detect, arbitrate.

use std::time::Instant;

use sheetscan_bubbles::{
    aggregate_confidence, choose_primary, detect_circle, detect_contour, detect_template,
    overall_confidence, DetectorOutput, DetectorThresholds, PageView,
};
use sheetscan_core::{
    adaptive_threshold_gaussian, close, downscale_to_max, ellipse_kernel, gaussian_blur, open,
    BinaryImage, GrayImage, GrayImageView,
};
use sheetscan_digits::{choose_digit_primary, recognize_segments, recognize_template, DigitParams};
use sheetscan_layout::{build_grid, ExamTemplate, LayoutConstants};
use sheetscan_markers::{locate_markers, rectify_page, scale_to_canonical, MarkerLocatorParams};

use crate::error::GradeError;
use crate::quality::image_quality;
use crate::result::OcrResult;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Input images larger than this on their longest edge are downscaled.
pub const MAX_INPUT_DIM: usize = 3500;

/// Full pipeline configuration. The defaults implement the printed-sheet
/// contract; real deployments mostly tweak `thresholds`.
#[derive(Clone, Debug, Default)]
pub struct GraderConfig {
    pub layout: LayoutConstants,
    pub thresholds: DetectorThresholds,
    pub digits: DigitParams,
    pub markers: MarkerLocatorParams,
}

/// Sheet grader: one instance can serve any number of independent calls.
#[derive(Clone, Debug, Default)]
pub struct SheetGrader {
    config: GraderConfig,
}

impl SheetGrader {
    pub fn new(config: GraderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Grade encoded image bytes.
    #[cfg(feature = "image")]
    pub fn grade_bytes(
        &self,
        bytes: &[u8],
        template: &ExamTemplate,
    ) -> Result<OcrResult, GradeError> {
        let gray = crate::decode::decode_gray(bytes)?;
        self.grade_gray(gray, template)
    }

    /// Grade a decoded grayscale image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray, template), fields(width = gray.width, height = gray.height, questions = template.questions.len()))
    )]
    pub fn grade_gray(
        &self,
        gray: GrayImage,
        template: &ExamTemplate,
    ) -> Result<OcrResult, GradeError> {
        template.validate()?;
        let started = Instant::now();
        let layout = &self.config.layout;
        let th = &self.config.thresholds;

        // C1: bounded input size, grayscale reference, binarized ink mask.
        let gray = match downscale_to_max(&gray.view(), MAX_INPUT_DIM) {
            Some(smaller) => {
                log::debug!("downscaled input to {}x{}", smaller.width, smaller.height);
                smaller
            }
            None => gray,
        };
        let binary = binarize(&gray.view());

        // C2: fiducials; failure is survivable.
        let sheet_bounds = locate_markers(&binary, &self.config.markers);
        let bounds_found = sheet_bounds.is_some();
        if !bounds_found {
            log::warn!("marker detection failed, grading the unrectified page");
        }

        // C9 observes the preprocessor output.
        let quality = image_quality(&gray.view(), bounds_found);

        // C3: canonical page.
        let rectified = match &sheet_bounds {
            Some(corners) => rectify_page(&gray.view(), corners, layout)
                .unwrap_or_else(|| scale_to_canonical(&gray.view(), layout)),
            None => scale_to_canonical(&gray.view(), layout),
        };

        // C4: expected geometry.
        let grid = build_grid(template, layout);

        // Shared rectified views for C5/C6/C8.
        let rect_blurred = gaussian_blur(&rectified.view(), 5);
        let rect_binary = binarize(&rectified.view());
        let page = PageView {
            gray: rectified.view(),
            blurred: rect_blurred.view(),
            binary: &rect_binary,
            px_per_mm: layout.px_per_mm,
        };

        // C5 + C6.
        let template_out = detect_template(&page, &grid, th);
        let circle_out = detect_circle(&page, &grid, th);
        log::debug!(
            "detector aggregates: template {:.3}, circle {:.3}",
            aggregate_confidence(&template_out.results),
            aggregate_confidence(&circle_out.results),
        );

        // C7: primary selection, contour fallback, failure only when every
        // detector came back empty.
        let question_count = template.questions.len();
        let primary: DetectorOutput =
            match choose_primary(&template_out, &circle_out, question_count, th) {
                Some(chosen) => chosen.clone(),
                None => {
                    log::debug!("no detector cleared the confidence floor, running contour fallback");
                    let contour = detect_contour(&page, &grid, th);
                    if !contour.results.is_empty() {
                        contour
                    } else if !template_out.results.is_empty() || !circle_out.results.is_empty() {
                        let t = aggregate_confidence(&template_out.results);
                        let c = aggregate_confidence(&circle_out.results);
                        if c > t && !circle_out.results.is_empty() {
                            circle_out.clone()
                        } else if !template_out.results.is_empty() {
                            template_out.clone()
                        } else {
                            circle_out.clone()
                        }
                    } else {
                        return Err(GradeError::NoContent);
                    }
                }
            };

        // C8: both digit readers over the same rectified grayscale.
        let digits_segments = recognize_segments(
            &rectified.view(),
            &grid.digit_cells,
            layout.px_per_mm,
            &self.config.digits,
        );
        let digits_template = recognize_template(
            &rectified.view(),
            &grid.digit_cells,
            layout.px_per_mm,
            &self.config.digits,
        );
        let digits_primary = choose_digit_primary(&digits_segments, &digits_template).to_vec();

        let overall = overall_confidence(&primary.results, th, bounds_found);

        Ok(OcrResult {
            bubbles_primary: primary.results,
            bubbles_template: template_out.results,
            bubbles_circle: circle_out.results,
            primary_detector: primary.kind,
            digits_primary,
            digits_segments,
            digits_template,
            sheet_bounds,
            image_quality: quality,
            overall_confidence: overall,
            processing_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// The C1 binarization chain: 3x3 blur, inverted adaptive Gaussian
/// threshold, opening with a 2x2 element, closing with a 3x3 element.
fn binarize(gray: &GrayImageView<'_>) -> BinaryImage {
    let blurred = gaussian_blur(gray, 3);
    let thresholded = adaptive_threshold_gaussian(&blurred.view(), 11, 2.0, true);
    let opened = open(&thresholded, &ellipse_kernel(2, 2));
    close(&opened, &ellipse_kernel(3, 3))
}

/// Grade with the default configuration.
pub fn grade(gray: GrayImage, template: &ExamTemplate) -> Result<OcrResult, GradeError> {
    SheetGrader::default().grade_gray(gray, template)
}

/// Grade encoded bytes with the default configuration.
#[cfg(feature = "image")]
pub fn grade_bytes(bytes: &[u8], template: &ExamTemplate) -> Result<OcrResult, GradeError> {
    SheetGrader::default().grade_bytes(bytes, template)
}
