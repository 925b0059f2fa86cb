//! Submission pipeline: validates a chosen image, builds the multipart
//! request, and normalizes the response, tracking the submission state
//! machine along the way.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::api::{RecognitionResponse, RecognitionResult, RegistrationResponse};
use crate::domain::mutation::MutationDescriptor;
use crate::domain::submission::{ImageFile, RegistrationForm, SubmissionOutcome, SubmissionState};
use crate::domain::ClientError;
use crate::infrastructure::api;
use crate::infrastructure::mutation::MutationExecutor;

const GENERIC_FAILURE: &str = "Submission failed";

/// Drives one submission at a time through
/// `Empty -> FileSelected -> Submitting -> {Succeeded, Failed}`.
///
/// Validation failures are synchronous and never reach the network; the
/// state stays at `FileSelected`. Successful calls route through the
/// mutation executor, so dependent views refresh without manual action.
#[derive(Debug)]
pub struct SubmissionPipeline {
    executor: Arc<MutationExecutor>,
    state: SubmissionState,
    file: Option<ImageFile>,
}

impl SubmissionPipeline {
    pub fn new(executor: Arc<MutationExecutor>) -> Self {
        Self {
            executor,
            state: SubmissionState::Empty,
            file: None,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Selecting a file clears any finished submission.
    pub fn select_file(&mut self, file: ImageFile) {
        self.file = Some(file);
        self.state = SubmissionState::FileSelected;
    }

    /// Returns to `Empty`, dropping the selection and any finished state.
    pub fn reset(&mut self) {
        self.file = None;
        self.state = SubmissionState::Empty;
    }

    /// Submits the selected image for recognition.
    pub async fn submit_recognition(&mut self) -> Result<RecognitionResult, ClientError> {
        let file = self.selected_file()?;
        self.state = SubmissionState::Submitting;

        let outcome = self
            .execute_decoded::<RecognitionResponse>(
                api::recognize_faces(file),
                &MutationDescriptor::recognize_faces(),
            )
            .await;

        match outcome {
            Ok(response) => {
                let result = RecognitionResult::from(response);
                debug!(faces = result.total_faces_detected, "recognition succeeded");
                self.state =
                    SubmissionState::Succeeded(SubmissionOutcome::Recognition(result.clone()));
                Ok(result)
            }
            Err(error) => {
                self.state = SubmissionState::Failed {
                    message: failure_message(&error),
                };
                Err(error)
            }
        }
    }

    /// Submits the selected image and form to register a new identity.
    pub async fn submit_registration(
        &mut self,
        form: &RegistrationForm,
    ) -> Result<RegistrationResponse, ClientError> {
        let Some(name) = form.trimmed_name() else {
            return Err(ClientError::validation("Student name is required"));
        };
        let file = self.selected_file()?;
        self.state = SubmissionState::Submitting;

        let outcome = self
            .execute_decoded::<RegistrationResponse>(
                api::register_student(name, form.trimmed_student_id(), file),
                &MutationDescriptor::register_identity(),
            )
            .await;

        match outcome {
            Ok(response) => {
                debug!(faces = response.faces_detected, "registration succeeded");
                self.state =
                    SubmissionState::Succeeded(SubmissionOutcome::Registration(response.clone()));
                Ok(response)
            }
            Err(error) => {
                self.state = SubmissionState::Failed {
                    message: failure_message(&error),
                };
                Err(error)
            }
        }
    }

    fn selected_file(&self) -> Result<ImageFile, ClientError> {
        self.file
            .clone()
            .ok_or_else(|| ClientError::validation("Please select an image"))
    }

    async fn execute_decoded<T: serde::de::DeserializeOwned>(
        &self,
        spec: crate::infrastructure::transport::RequestSpec,
        descriptor: &MutationDescriptor,
    ) -> Result<T, ClientError> {
        let value: Value = self.executor.execute(spec, descriptor).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::decode(format!("Malformed response: {}", e)))
    }
}

/// The server's own message is surfaced verbatim when present; every other
/// failure kind gets the generic fallback.
fn failure_message(error: &ClientError) -> String {
    error
        .server_message()
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}
