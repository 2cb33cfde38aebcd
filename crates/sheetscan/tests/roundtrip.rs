//! End-to-end tests on synthetically rendered sheets.
//!
//! The renderer and the pipeline share one `LayoutConstants`, so these
//! exercise the full print-then-scan contract: render a sheet from a
//! template and an answer key, grade the image, compare.

use nalgebra::Point2;
use sheetscan::core::{estimate_homography, warp_perspective_gray, GrayImage, Homography};
use sheetscan::layout::{
    build_grid, render_sheet, ExamTemplate, LayoutConstants, Question, QuestionKind,
    RenderOptions, SheetMarks,
};
use sheetscan::{grade, OcrResult};

fn mc_template(count: u32) -> ExamTemplate {
    ExamTemplate {
        questions: (1..=count)
            .map(|number| Question {
                number,
                kind: QuestionKind::multiple_choice(),
            })
            .collect(),
        ..Default::default()
    }
}

fn render(template: &ExamTemplate, marks: &SheetMarks) -> GrayImage {
    render_sheet(
        template,
        &LayoutConstants::default(),
        marks,
        &RenderOptions::default(),
    )
}

fn letters(template: &ExamTemplate, key: &[usize]) -> Vec<Option<char>> {
    template
        .questions
        .iter()
        .zip(key)
        .map(|(q, &opt)| q.kind.letter(opt))
        .collect()
}

fn assert_invariants(result: &OcrResult, template: &ExamTemplate) {
    // Full-length, positionally aligned primary sequence.
    assert_eq!(result.bubbles_primary.len(), template.questions.len());
    for (b, q) in result.bubbles_primary.iter().zip(&template.questions) {
        assert_eq!(b.question_number, q.number);
        // Any answer letter is legal for its question kind.
        if let Some(letter) = b.answer {
            let legal: Vec<char> = (0..q.kind.options())
                .map(|i| q.kind.letter(i).unwrap())
                .collect();
            assert!(legal.contains(&letter), "illegal {letter} for {:?}", q.kind);
        }
        assert!((0.0..=1.0).contains(&b.confidence));
    }
    assert!((0.0..=1.0).contains(&result.image_quality));
    assert!((0.0..=1.0).contains(&result.overall_confidence));
}

#[test]
fn clean_sheet_round_trips_the_answer_key() {
    let template = mc_template(10);
    let key = [0usize, 1, 2, 3, 0, 1, 2, 3, 0, 1];
    let img = render(&template, &SheetMarks::from_answer_key(&key));

    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);

    assert_eq!(result.answers(), letters(&template, &key));
    assert!(result.sheet_bounds.is_some());
    for b in &result.bubbles_primary {
        assert!(b.confidence >= 0.9, "q{}: {}", b.question_number, b.confidence);
    }
    assert!(
        result.overall_confidence >= 0.85,
        "overall = {}",
        result.overall_confidence
    );
}

#[test]
fn mixed_kinds_round_trip() {
    let mut questions = Vec::new();
    for number in 1..=3u32 {
        questions.push(Question {
            number,
            kind: QuestionKind::MultipleChoice { options: 2 },
        });
    }
    for number in 4..=6u32 {
        questions.push(Question {
            number,
            kind: QuestionKind::MultipleChoice { options: 3 },
        });
    }
    for number in 7..=10u32 {
        questions.push(Question {
            number,
            kind: QuestionKind::multiple_choice(),
        });
    }
    for number in 11..=15u32 {
        questions.push(Question {
            number,
            kind: QuestionKind::TrueFalse,
        });
    }
    let template = ExamTemplate {
        questions,
        ..Default::default()
    };

    let key = [1usize, 0, 1, 2, 0, 1, 3, 0, 2, 1, 0, 1, 0, 1, 0];
    let img = render(&template, &SheetMarks::from_answer_key(&key));

    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);
    assert_eq!(result.answers(), letters(&template, &key));
}

#[test]
fn rotated_and_skewed_capture_still_reads() {
    let template = mc_template(10);
    let key = [0usize, 1, 2, 3, 0, 1, 2, 3, 0, 1];
    let sheet = render(&template, &SheetMarks::from_answer_key(&key));

    // Simulate a 3-degree rotated, mildly keystoned phone capture on a
    // slightly larger canvas.
    let (out_w, out_h) = (2300usize, 3150usize);
    let angle = 3.0f32.to_radians();
    let (s, c) = angle.sin_cos();
    let center = Point2::new(out_w as f32 * 0.5, out_h as f32 * 0.5);
    let place = |x: f32, y: f32, squeeze: f32| {
        // Keystone: the top edge is narrower than the bottom one.
        let px = (x - 1050.0) * squeeze + 1050.0 + 100.0;
        let py = y + 90.0;
        let dx = px - center.x;
        let dy = py - center.y;
        Point2::new(center.x + c * dx - s * dy, center.y + s * dx + c * dy)
    };
    let out_corners = [
        place(0.0, 0.0, 0.93),
        place(2100.0, 0.0, 0.93),
        place(2100.0, 2970.0, 1.0),
        place(0.0, 2970.0, 1.0),
    ];
    let sheet_corners = [
        Point2::new(0.0f32, 0.0),
        Point2::new(2100.0, 0.0),
        Point2::new(2100.0, 2970.0),
        Point2::new(0.0, 2970.0),
    ];
    let h = estimate_homography(&out_corners, &sheet_corners).expect("capture homography");
    let captured = warp_perspective_gray(&sheet.view(), &h, out_w, out_h);

    let result = grade(captured, &template).expect("graded");
    assert_invariants(&result, &template);
    assert!(result.sheet_bounds.is_some());
    assert_eq!(result.answers(), letters(&template, &key));
    for b in &result.bubbles_primary {
        assert!(b.confidence >= 0.7, "q{}: {}", b.question_number, b.confidence);
    }
}

#[test]
fn damaged_fiducials_degrade_gracefully() {
    let template = mc_template(10);
    let key = [0usize, 1, 2, 3, 0, 1, 2, 3, 0, 1];
    let mut img = render(&template, &SheetMarks::from_answer_key(&key));

    // Tear off the two top markers.
    for y in 0..250usize {
        for x in 0..250usize {
            img.set(x, y, 255);
            img.set(img.width - 1 - x, y, 255);
        }
    }

    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);
    assert!(result.sheet_bounds.is_none());
    assert!(
        result.overall_confidence <= 0.8 + 1e-4,
        "overall = {}",
        result.overall_confidence
    );
    // The render is already at canonical scale, so answers survive the
    // missing rectification.
    assert_eq!(result.answers(), letters(&template, &key));
}

#[test]
fn double_mark_picks_the_darker_fill() {
    let template = mc_template(10);
    let key = [0usize, 1, 2, 3, 0, 1, 2, 3, 0, 1];
    let mut marks = SheetMarks::from_answer_key(&key);
    // Question 5 (index 4): option A at 70%, option C at 50%.
    marks.bubbles.retain(|&(q, _, _)| q != 4);
    marks.bubbles.push((4, 0, 0.7));
    marks.bubbles.push((4, 2, 0.5));

    let img = render(&template, &marks);
    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);

    let q5 = &result.bubbles_primary[4];
    assert_eq!(q5.answer, Some('A'));
    assert!(q5.distinct, "expected a distinct pick");
    assert!(q5.confidence > 0.99, "confidence = {}", q5.confidence);
}

#[test]
fn blank_question_reads_unanswered() {
    let template = mc_template(10);
    let key = [0usize, 1, 2, 3, 0, 1, 2, 3, 0, 1];
    let mut marks = SheetMarks::from_answer_key(&key);
    // Question 7 (index 6) left blank.
    marks.bubbles.retain(|&(q, _, _)| q != 6);

    let img = render(&template, &marks);
    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);

    let q7 = &result.bubbles_primary[6];
    assert_eq!(q7.answer, None);
    assert!(q7.confidence < 0.4, "confidence = {}", q7.confidence);
}

#[test]
fn student_id_cells_read_back() {
    let mut template = mc_template(5);
    template.student_id_enabled = true;
    template.student_id_digits = 6;
    let key = [0usize, 1, 2, 3, 0];
    let marks = SheetMarks::from_answer_key(&key).with_digits(&[1, 2, 3, 4, 5, 6]);

    let img = render(&template, &marks);
    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);

    assert_eq!(result.digits_segments.len(), 6);
    assert_eq!(result.digits_template.len(), 6);
    let digits: Vec<Option<u8>> = result.digits_primary.iter().map(|d| d.digit).collect();
    assert_eq!(
        digits,
        vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)]
    );
    for d in &result.digits_primary {
        assert!(d.confidence >= 0.4, "cell {}: {}", d.cell_index, d.confidence);
    }
    assert_eq!(result.student_id(), "123456");
}

#[test]
fn grading_is_deterministic() {
    let template = mc_template(5);
    let key = [0usize, 1, 2, 3, 0];
    let img = render(&template, &SheetMarks::from_answer_key(&key));

    let mut a = grade(img.clone(), &template).expect("first run");
    let mut b = grade(img, &template).expect("second run");
    a.processing_ms = 0;
    b.processing_ms = 0;
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn identity_rewarp_changes_nothing() {
    let template = mc_template(5);
    let key = [3usize, 2, 1, 0, 3];
    let img = render(&template, &SheetMarks::from_answer_key(&key));
    let rewarped = warp_perspective_gray(&img.view(), &Homography::identity(), 2100, 2970);

    let direct = grade(img, &template).expect("direct");
    let warped = grade(rewarped, &template).expect("rewarped");
    assert_eq!(direct.answers(), warped.answers());
}

#[test]
fn mark_outside_a_two_option_grid_is_ignored() {
    let template = ExamTemplate {
        questions: vec![Question {
            number: 1,
            kind: QuestionKind::MultipleChoice { options: 2 },
        }],
        ..Default::default()
    };
    let mut img = render(&template, &SheetMarks::default());

    // Ink a blob where a third option would sit; the grid never samples
    // there, so the question must stay unanswered.
    let grid = build_grid(&template, &LayoutConstants::default());
    let b = &grid.bubbles[0];
    let cx = (b.box_mm.x + 0.5 * b.box_mm.width + 12.0) * 10.0;
    let cy = b.bubble_y_mm() * 10.0;
    for y in 0..img.height {
        for x in 0..img.width {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= 25.0 * 25.0 {
                img.set(x, y, 0);
            }
        }
    }

    let result = grade(img, &template).expect("graded");
    assert_invariants(&result, &template);
    assert_eq!(result.bubbles_primary[0].answer, None);
}

#[test]
fn blank_page_returns_unanswered_everything() {
    let template = mc_template(5);
    let img = GrayImage::new(2100, 2970, 255);

    let result = grade(img, &template).expect("graded");
    assert_eq!(result.bubbles_primary.len(), 5);
    assert!(result.bubbles_primary.iter().all(|b| b.answer.is_none()));
    assert!(result.sheet_bounds.is_none());
    assert!(result.overall_confidence < 0.2);
}

#[test]
fn invalid_template_is_rejected() {
    let template = ExamTemplate {
        questions: vec![Question {
            number: 1,
            kind: QuestionKind::MultipleChoice { options: 5 },
        }],
        ..Default::default()
    };
    let img = GrayImage::new(2100, 2970, 255);
    assert!(matches!(
        grade(img, &template),
        Err(sheetscan::GradeError::Template(_))
    ));
}
