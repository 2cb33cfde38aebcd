use serde::{Deserialize, Serialize};

/// Single source of truth for the printed-sheet geometry.
///
/// The renderer and every detector derive their positions from this record;
/// a value changed here moves both sides of the contract together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutConstants {
    /// A4 portrait page, millimetres.
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Canonical-page resolution.
    pub px_per_mm: f32,

    /// Fiducial marker: outer black square side and its distance from the
    /// page edges, plus the nested white/black squares.
    pub marker_size_mm: f32,
    pub marker_margin_mm: f32,
    pub marker_inner_white_mm: f32,
    pub marker_inner_black_mm: f32,
    /// Corner search zone as a fraction of the shorter image edge.
    pub corner_zone_frac: f32,

    /// Vertical cursor origin for the body content.
    pub top_cursor_mm: f32,
    pub student_info_height_mm: f32,
    pub id_label_height_mm: f32,
    pub id_instruction_height_mm: f32,
    pub id_cell_width_mm: f32,
    pub id_cell_height_mm: f32,
    pub id_cell_spacing_mm: f32,
    pub id_cells_per_row: usize,
    pub id_row_extra_mm: f32,
    pub id_block_trailer_mm: f32,
    pub id_example_label_mm: f32,
    pub id_example_digit_mm: f32,
    pub id_example_trailer_mm: f32,
    pub instructions_height_mm: f32,
    pub start_marker_height_mm: f32,

    pub section_header_mm: f32,
    pub section_trailer_mm: f32,
    pub questions_per_row: usize,
    pub margin_mm: f32,
    pub question_width_mm: f32,
    pub question_padding_mm: f32,
    pub row_height_mm: f32,
    pub bubble_row_offset_mm: f32,
    pub bubble_radius_mm: f32,
    pub bubble_spacing_mm: f32,
}

impl Default for LayoutConstants {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            px_per_mm: 10.0,

            marker_size_mm: 12.0,
            marker_margin_mm: 5.0,
            marker_inner_white_mm: 8.0,
            marker_inner_black_mm: 4.0,
            corner_zone_frac: 0.22,

            top_cursor_mm: 34.0,
            student_info_height_mm: 10.0,
            id_label_height_mm: 6.0,
            id_instruction_height_mm: 8.0,
            id_cell_width_mm: 7.0,
            id_cell_height_mm: 10.0,
            id_cell_spacing_mm: 1.5,
            id_cells_per_row: 10,
            id_row_extra_mm: 6.0,
            id_block_trailer_mm: 4.0,
            id_example_label_mm: 5.0,
            id_example_digit_mm: 6.0,
            id_example_trailer_mm: 6.0,
            instructions_height_mm: 6.0,
            start_marker_height_mm: 8.0,

            section_header_mm: 8.0,
            section_trailer_mm: 5.0,
            questions_per_row: 5,
            margin_mm: 20.0,
            question_width_mm: 34.0,
            question_padding_mm: 2.0,
            row_height_mm: 20.0,
            bubble_row_offset_mm: 8.0,
            bubble_radius_mm: 2.5,
            bubble_spacing_mm: 8.0,
        }
    }
}

impl LayoutConstants {
    #[inline]
    pub fn canonical_width_px(&self) -> usize {
        (self.page_width_mm * self.px_per_mm).round() as usize
    }

    #[inline]
    pub fn canonical_height_px(&self) -> usize {
        (self.page_height_mm * self.px_per_mm).round() as usize
    }

    #[inline]
    pub fn bubble_radius_px(&self) -> f32 {
        self.bubble_radius_mm * self.px_per_mm
    }

    /// Width of one full row of student-ID cells.
    pub fn id_row_width_mm(&self) -> f32 {
        let n = self.id_cells_per_row as f32;
        n * self.id_cell_width_mm + (n - 1.0) * self.id_cell_spacing_mm
    }

    /// X origin of the student-ID cell grid: rows are centered on the page.
    pub fn id_row_origin_mm(&self) -> f32 {
        (self.page_width_mm - self.id_row_width_mm()) * 0.5
    }

    /// Bubble-center x offsets from the question-box center for an option
    /// count in 2..=4.
    pub fn bubble_offsets_mm(&self, options: usize) -> Vec<f32> {
        let half = (options as f32 - 1.0) * 0.5;
        (0..options)
            .map(|i| (i as f32 - half) * self.bubble_spacing_mm)
            .collect()
    }
}
