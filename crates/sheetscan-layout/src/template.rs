use serde::{Deserialize, Serialize};

/// Upper bound on student-ID cells a sheet can carry.
pub const MAX_ID_DIGITS: u8 = 40;

/// Question flavor. True/false questions always have exactly two options
/// (T and F), which the type encodes directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { options: u8 },
    TrueFalse,
}

impl QuestionKind {
    /// Multiple choice with the default four options.
    pub fn multiple_choice() -> Self {
        QuestionKind::MultipleChoice { options: 4 }
    }

    #[inline]
    pub fn options(&self) -> usize {
        match self {
            QuestionKind::MultipleChoice { options } => *options as usize,
            QuestionKind::TrueFalse => 2,
        }
    }

    /// Printed letter for an option index, `None` outside the legal set.
    pub fn letter(&self, index: usize) -> Option<char> {
        if index >= self.options() {
            return None;
        }
        match self {
            QuestionKind::MultipleChoice { .. } => Some((b'A' + index as u8) as char),
            QuestionKind::TrueFalse => Some(if index == 0 { 'T' } else { 'F' }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub number: u32,
    pub kind: QuestionKind,
}

/// Declarative description of a printed sheet. Immutable for the duration
/// of a scan.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExamTemplate {
    #[serde(default)]
    pub student_info_enabled: bool,
    #[serde(default)]
    pub student_id_enabled: bool,
    #[serde(default)]
    pub student_id_digits: u8,
    pub questions: Vec<Question>,
}

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("student id digit count {0} exceeds the {MAX_ID_DIGITS}-cell limit")]
    TooManyIdDigits(u8),
    #[error("question {number}: multiple choice needs 2 to 4 options, got {options}")]
    BadOptionCount { number: u32, options: u8 },
    #[error("question numbers must increase strictly (saw {previous} then {current})")]
    NonIncreasingNumbers { previous: u32, current: u32 },
    #[error("template has no questions")]
    NoQuestions,
}

impl ExamTemplate {
    /// Check the template against the printable layout contract.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.student_id_digits > MAX_ID_DIGITS {
            return Err(TemplateError::TooManyIdDigits(self.student_id_digits));
        }
        if self.questions.is_empty() {
            return Err(TemplateError::NoQuestions);
        }

        let mut previous: Option<u32> = None;
        for q in &self.questions {
            if let QuestionKind::MultipleChoice { options } = q.kind {
                if !(2..=4).contains(&options) {
                    return Err(TemplateError::BadOptionCount {
                        number: q.number,
                        options,
                    });
                }
            }
            if let Some(prev) = previous {
                if q.number <= prev {
                    return Err(TemplateError::NonIncreasingNumbers {
                        previous: prev,
                        current: q.number,
                    });
                }
            }
            previous = Some(q.number);
        }
        Ok(())
    }

    /// Number of student-ID cells the sheet carries.
    pub fn id_cell_count(&self) -> usize {
        if self.student_id_enabled {
            self.student_id_digits as usize
        } else {
            0
        }
    }
}
