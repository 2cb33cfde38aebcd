use sheetscan_layout::TemplateError;

/// Errors produced by a grading call.
///
/// Marker-detection failures and degenerate sampling geometry are not
/// errors: the pipeline recovers locally and reports them through
/// `sheet_bounds` and the confidence fields instead.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    #[cfg(feature = "image")]
    #[error("input is not a decodable image")]
    Decode(#[source] image::ImageError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("no content detected on the sheet")]
    NoContent,
}
