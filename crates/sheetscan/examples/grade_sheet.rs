//! Grade a photographed answer sheet against a template.
//!
//! Usage: grade_sheet <image> <template.json>
//!
//! The template file is the serde form of `ExamTemplate`, e.g.
//! `{"student_id_enabled":true,"student_id_digits":6,"questions":[{"number":1,"kind":{"kind":"multiple_choice","options":4}}]}`.

use std::path::PathBuf;

use env_logger::Env;
use log::info;
use sheetscan::{grade_bytes, ExamTemplate};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let (Some(image_path), Some(template_path)) = (args.next(), args.next()) else {
        eprintln!("usage: grade_sheet <image> <template.json>");
        std::process::exit(2);
    };

    let template_json =
        std::fs::read_to_string(PathBuf::from(&template_path)).expect("read template");
    let template: ExamTemplate = serde_json::from_str(&template_json).expect("parse template");

    let bytes = std::fs::read(PathBuf::from(&image_path)).expect("read image");
    info!("grading {} against {} questions", image_path, template.questions.len());

    match grade_bytes(&bytes, &template) {
        Ok(result) => {
            info!(
                "graded in {} ms, overall confidence {:.2}, quality {:.2}",
                result.processing_ms, result.overall_confidence, result.image_quality
            );
            println!("{}", serde_json::to_string_pretty(&result).expect("serialize result"));
        }
        Err(err) => {
            eprintln!("grading failed: {err}");
            std::process::exit(1);
        }
    }
}
