use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::domain::{Grade, Registration, RegistrationId, RegistrationStatus};
use super::repository::{FestivalRepository, RepositoryError};

/// Staff-side mutations on existing registrations.
pub struct ResultService<R> {
    repository: Arc<R>,
}

impl<R> ResultService<R>
where
    R: FestivalRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Records (or with `None`, clears) the grade. The whole team shares one record.
    ///
    /// Attendance is not checked here: grading an absent entry is allowed, it just never scores.
    pub fn set_grade(
        &self,
        registration_id: &RegistrationId,
        grade: Option<Grade>,
    ) -> Result<Registration, ResultError> {
        let updated = self
            .repository
            .update_grade(registration_id, grade)
            .map_err(|error| ResultError::from_repository(error, registration_id))?;

        info!(
            registration_id = %registration_id.0,
            grade = grade.map(Grade::label).unwrap_or("NONE"),
            "grade recorded"
        );
        Ok(updated)
    }

    /// Marks a registration cancelled. Rows are never deleted, so quota and scoring simply stop
    /// counting it. Repeated cancellation is a no-op.
    pub fn cancel(&self, registration_id: &RegistrationId) -> Result<Registration, ResultError> {
        let current = self
            .repository
            .registration(registration_id)?
            .ok_or_else(|| ResultError::NotFound(registration_id.clone()))?;

        if current.status == RegistrationStatus::Cancelled {
            return Ok(current);
        }

        let updated = self
            .repository
            .update_status(registration_id, RegistrationStatus::Cancelled)
            .map_err(|error| ResultError::from_repository(error, registration_id))?;

        info!(registration_id = %registration_id.0, "registration cancelled");
        Ok(updated)
    }

    /// Certificates go to registrations with at least one present attendance mark.
    pub fn certificate_eligible(&self, registration_id: &RegistrationId) -> Result<bool, ResultError> {
        let registration = self
            .repository
            .registration(registration_id)?
            .ok_or_else(|| ResultError::NotFound(registration_id.clone()))?;

        if !registration.status.is_active() {
            return Ok(false);
        }
        Ok(self.repository.has_present_attendance(registration_id)?)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResultError {
    #[error("registration {0:?} not found")]
    NotFound(RegistrationId),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ResultError {
    fn from_repository(error: RepositoryError, registration_id: &RegistrationId) -> Self {
        match error {
            RepositoryError::NotFound => ResultError::NotFound(registration_id.clone()),
            other => ResultError::Internal(other.to_string()),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            ResultError::NotFound(_) => "NOT_FOUND",
            ResultError::Internal(_) => "INTERNAL",
        }
    }

    pub fn detail(&self) -> Value {
        match self {
            ResultError::NotFound(registration_id) => {
                json!({ "registration_id": registration_id })
            }
            ResultError::Internal(_) => json!({}),
        }
    }
}

impl From<RepositoryError> for ResultError {
    fn from(value: RepositoryError) -> Self {
        ResultError::Internal(value.to_string())
    }
}
