//! Template grid builder: expected bubble and student-ID cell positions on
//! the canonical page, in millimetres.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use sheetscan_core::Rect;

use crate::constants::LayoutConstants;
use crate::template::{ExamTemplate, Question, QuestionKind};

/// Expected bubble geometry for one question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BubbleExpectation {
    pub question_number: u32,
    pub kind: QuestionKind,
    /// Question box on the canonical page.
    pub box_mm: Rect,
    /// One center per option, left to right.
    pub centers_mm: Vec<Point2<f32>>,
    /// Row across all sections.
    pub row_index: usize,
    /// Column within the row, 0..5.
    pub column_index: usize,
}

impl BubbleExpectation {
    #[inline]
    pub fn options(&self) -> usize {
        self.centers_mm.len()
    }

    /// Y of the bubble row (all centers share it).
    #[inline]
    pub fn bubble_y_mm(&self) -> f32 {
        self.centers_mm[0].y
    }
}

/// One student-ID cell on the canonical page.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DigitCell {
    pub cell_index: usize,
    pub rect_mm: Rect,
}

/// Full derived geometry for one template.
#[derive(Clone, Debug)]
pub struct SheetGrid {
    pub bubbles: Vec<BubbleExpectation>,
    pub digit_cells: Vec<DigitCell>,
    pub bubble_radius_mm: f32,
}

/// Consecutive questions with identical `(kind, options)` print as one
/// section; the grid builder reconstructs that grouping.
fn sections(questions: &[Question]) -> Vec<&[Question]> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for i in 1..=questions.len() {
        let split = i == questions.len() || questions[i].kind != questions[start].kind;
        if split {
            out.push(&questions[start..i]);
            start = i;
        }
    }
    out
}

/// Walk the vertical layout cursor and emit every expected bubble and
/// student-ID cell.
pub fn build_grid(template: &ExamTemplate, layout: &LayoutConstants) -> SheetGrid {
    let mut y = layout.top_cursor_mm;

    if template.student_info_enabled {
        y += layout.student_info_height_mm;
    }

    let mut digit_cells = Vec::new();
    if template.student_id_enabled {
        y += layout.id_label_height_mm + layout.id_instruction_height_mm;

        let digits = template.student_id_digits as usize;
        let per_row = layout.id_cells_per_row;
        let rows = digits.div_ceil(per_row);
        let row_pitch = layout.id_cell_height_mm + layout.id_cell_spacing_mm + layout.id_row_extra_mm;
        let x0 = layout.id_row_origin_mm();

        for cell_index in 0..digits {
            let r = cell_index / per_row;
            let c = cell_index % per_row;
            let x = x0 + c as f32 * (layout.id_cell_width_mm + layout.id_cell_spacing_mm);
            let rect_mm = Rect::new(
                x,
                y + r as f32 * row_pitch,
                layout.id_cell_width_mm,
                layout.id_cell_height_mm,
            );
            digit_cells.push(DigitCell { cell_index, rect_mm });
        }

        y += rows as f32 * row_pitch + layout.id_block_trailer_mm;
        y += layout.id_example_label_mm + layout.id_example_digit_mm + layout.id_example_trailer_mm;
    }

    y += layout.instructions_height_mm + layout.start_marker_height_mm;

    let mut bubbles = Vec::with_capacity(template.questions.len());
    let mut global_row = 0usize;

    for section in sections(&template.questions) {
        y += layout.section_header_mm;

        let per_row = layout.questions_per_row;
        let rows = section.len().div_ceil(per_row);
        let options = section[0].kind.options();
        let offsets = layout.bubble_offsets_mm(options);

        for (i, q) in section.iter().enumerate() {
            let r = i / per_row;
            let c = i % per_row;

            let box_x = layout.margin_mm
                + c as f32 * layout.question_width_mm
                + layout.question_padding_mm;
            let box_y = y + r as f32 * layout.row_height_mm;
            let box_mm = Rect::new(
                box_x,
                box_y,
                layout.question_width_mm - 2.0 * layout.question_padding_mm,
                layout.row_height_mm - 2.0,
            );

            let center_x = box_mm.x + 0.5 * box_mm.width;
            let bubble_y = box_y + layout.bubble_row_offset_mm;
            let centers_mm = offsets
                .iter()
                .map(|&dx| Point2::new(center_x + dx, bubble_y))
                .collect();

            bubbles.push(BubbleExpectation {
                question_number: q.number,
                kind: q.kind,
                box_mm,
                centers_mm,
                row_index: global_row + r,
                column_index: c,
            });
        }

        global_row += rows;
        y += rows as f32 * layout.row_height_mm + layout.section_trailer_mm;
    }

    SheetGrid {
        bubbles,
        digit_cells,
        bubble_radius_mm: layout.bubble_radius_mm,
    }
}
