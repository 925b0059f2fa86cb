//! Submission-side types: the selected image, form fields, and the
//! per-submission state machine the views observe.

use bytes::Bytes;

use crate::domain::api::{RecognitionResult, RegistrationResponse};

/// An image chosen by the operator, ready to become the binary part of a
/// multipart request. The original filename and content type are preserved.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    /// Builds a file payload, guessing the content type from the filename.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Overrides the guessed content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Form fields accompanying a registration submission.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub student_id: String,
}

impl RegistrationForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            student_id: String::new(),
        }
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = student_id.into();
        self
    }

    /// Trimmed name, `None` when effectively empty.
    pub fn trimmed_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Trimmed optional student id, `None` when effectively empty.
    pub fn trimmed_student_id(&self) -> Option<&str> {
        let id = self.student_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

/// What a finished submission produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Recognition(RecognitionResult),
    Registration(RegistrationResponse),
}

/// Lifecycle of one submission:
/// `Empty -> FileSelected -> Submitting -> {Succeeded, Failed}`, with both
/// terminal states returning to `Empty` on reset or `FileSelected` on the
/// next file selection.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Empty,
    FileSelected,
    Submitting,
    Succeeded(SubmissionOutcome),
    Failed { message: String },
}

impl SubmissionState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_file_guesses_content_type() {
        let file = ImageFile::new("photo.jpg", vec![0xff, 0xd8]);
        assert_eq!(file.content_type, "image/jpeg");

        let file = ImageFile::new("photo.png", vec![0x89]);
        assert_eq!(file.content_type, "image/png");

        let file = ImageFile::new("photo", vec![0x00]);
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[test]
    fn test_content_type_override() {
        let file = ImageFile::new("capture", vec![0xff]).with_content_type("image/jpeg");
        assert_eq!(file.content_type, "image/jpeg");
    }

    #[test]
    fn test_form_trims_fields() {
        let form = RegistrationForm::new("  Alice  ").with_student_id("  ");

        assert_eq!(form.trimmed_name(), Some("Alice"));
        assert_eq!(form.trimmed_student_id(), None);
    }

    #[test]
    fn test_whitespace_name_counts_as_empty() {
        assert_eq!(RegistrationForm::new("   ").trimmed_name(), None);
        assert_eq!(RegistrationForm::default().trimmed_name(), None);
    }
}
