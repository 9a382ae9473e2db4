use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    Grade, House, Participation, Program, ProgramId, ProgramOccupancy, Registration,
    RegistrationDraft, RegistrationId, RegistrationStatus, User, UserId,
};

/// Storage abstraction over the shared registration tables.
///
/// `create_registrations` is the only multi-row write and must be all-or-nothing: either every
/// draft lands with its full roster or nothing does. Implementations enforce uniqueness of
/// non-cancelled `(user, program)` pairs at write time and report it as
/// [`RepositoryError::Conflict`], because admission pre-checks can race.
pub trait FestivalRepository: Send + Sync {
    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn program(&self, id: &ProgramId) -> Result<Option<Program>, RepositoryError>;
    fn houses(&self) -> Result<Vec<House>, RepositoryError>;
    fn registration(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError>;
    fn registrations(&self) -> Result<Vec<Registration>, RepositoryError>;
    fn members_of(&self, id: &RegistrationId) -> Result<Vec<UserId>, RepositoryError>;

    /// Registrations the user leads or belongs to, cancelled ones included.
    fn participations(&self, user_id: &UserId) -> Result<Vec<Participation>, RepositoryError>;

    /// Leaders and members of the program's non-cancelled registrations.
    fn occupancy(&self, program_id: &ProgramId) -> Result<ProgramOccupancy, RepositoryError>;

    fn create_registrations(
        &self,
        drafts: &[RegistrationDraft],
    ) -> Result<Vec<Registration>, RepositoryError>;

    fn update_grade(
        &self,
        id: &RegistrationId,
        grade: Option<Grade>,
    ) -> Result<Registration, RepositoryError>;

    fn update_status(
        &self,
        id: &RegistrationId,
        status: RegistrationStatus,
    ) -> Result<Registration, RepositoryError>;

    /// Attendance is owned elsewhere; the core only asks whether any present mark exists.
    fn has_present_attendance(&self, id: &RegistrationId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (mail, push, ...). Delivery is best effort.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &RegistrationNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationNotice {
    pub template: String,
    pub user_id: UserId,
    pub registration_id: RegistrationId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
