//! Printed answer-sheet layout contract.
//!
//! Everything geometric about the sheet lives here: the exam template
//! model, the layout constants shared by the print and scan sides, the
//! derived grid of expected bubbles and student-ID cells, the
//! seven-segment glyph table, and a synthetic renderer used by the
//! round-trip tests.

mod constants;
mod grid;
mod render;
pub mod segments;
mod template;

pub use constants::LayoutConstants;
pub use grid::{build_grid, BubbleExpectation, DigitCell, SheetGrid};
pub use render::{render_sheet, render_sheet_with_grid, RenderOptions, SheetMarks};
pub use template::{ExamTemplate, Question, QuestionKind, TemplateError, MAX_ID_DIGITS};
