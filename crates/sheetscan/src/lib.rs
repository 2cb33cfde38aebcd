//! High-level facade for the `sheetscan-*` workspace.
//!
//! Grades printed multiple-choice / true-false answer sheets from a
//! photograph: fiducial corner markers anchor a homography onto a
//! canonical A4 page, two independent bubble detectors sample fill at the
//! template grid, an arbiter reconciles them, and the student-ID cells go
//! through a seven-segment recognizer.
//!
//! ```no_run
//! use sheetscan::{grade_bytes, ExamTemplate, Question, QuestionKind};
//!
//! let template = ExamTemplate {
//!     questions: (1..=10)
//!         .map(|number| Question { number, kind: QuestionKind::multiple_choice() })
//!         .collect(),
//!     ..Default::default()
//! };
//! let bytes = std::fs::read("sheet.jpg").unwrap();
//! let result = grade_bytes(&bytes, &template).unwrap();
//! for bubble in &result.bubbles_primary {
//!     println!("{}: {:?}", bubble.question_number, bubble.answer);
//! }
//! ```

pub use sheetscan_bubbles as bubbles;
pub use sheetscan_core as core;
pub use sheetscan_digits as digits;
pub use sheetscan_layout as layout;
pub use sheetscan_markers as markers;

mod error;
mod pipeline;
mod quality;
mod result;

#[cfg(feature = "image")]
pub mod decode;

pub use error::GradeError;
pub use pipeline::{grade, GraderConfig, SheetGrader, MAX_INPUT_DIM};
pub use quality::image_quality;
pub use result::OcrResult;

#[cfg(feature = "image")]
pub use pipeline::grade_bytes;

pub use sheetscan_bubbles::{BubbleResult, DetectorKind, DetectorThresholds};
pub use sheetscan_digits::{DigitParams, DigitRecognition};
pub use sheetscan_layout::{
    ExamTemplate, LayoutConstants, Question, QuestionKind, TemplateError,
};
pub use sheetscan_markers::SheetCorners;
