use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for festival participants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for houses (the scoring unit).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HouseId(pub String);

/// Identifier wrapper for festival programs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

/// Identifier wrapper for stored registrations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

/// Identity snapshot owned by the identity subsystem; only `id` and `house_id` drive admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub house_id: Option<HouseId>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramType {
    Solo,
    Group,
}

impl ProgramType {
    pub const fn is_group(self) -> bool {
        matches!(self, ProgramType::Group)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ProgramType::Solo => "SOLO",
            ProgramType::Group => "GROUP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramCategory {
    OnStage,
    OffStage,
}

/// Festival event students can enroll in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub kind: ProgramType,
    pub category: ProgramCategory,
    /// Inclusive bounds on the team size, leader included.
    pub min_members: u32,
    pub max_members: u32,
    pub is_active: bool,
}

impl Program {
    pub fn accepts_team_of(&self, size: u32) -> bool {
        (self.min_members..=self.max_members).contains(&size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub const fn is_active(self) -> bool {
        !matches!(self, RegistrationStatus::Cancelled)
    }

    pub const fn label(self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Confirmed => "CONFIRMED",
            RegistrationStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Placement awarded by staff once a performance is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Participation,
    SecondRunnerUp,
    FirstRunnerUp,
    Winner,
}

impl Grade {
    pub const fn label(self) -> &'static str {
        match self {
            Grade::Participation => "PARTICIPATION",
            Grade::SecondRunnerUp => "SECOND_RUNNER_UP",
            Grade::FirstRunnerUp => "FIRST_RUNNER_UP",
            Grade::Winner => "WINNER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    /// Leader for group entries, the performer for solo entries.
    pub user_id: UserId,
    pub program_id: ProgramId,
    /// Leader's house at creation time; never moved by later reassignment.
    pub house_id: HouseId,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub status: RegistrationStatus,
    pub grade: Option<Grade>,
    pub created_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub registration_id: RegistrationId,
    pub user_id: UserId,
}

/// Validated registration waiting to be written alongside its roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub user_id: UserId,
    pub program_id: ProgramId,
    pub house_id: HouseId,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub status: RegistrationStatus,
    pub member_ids: Vec<UserId>,
}

/// Whether a user took part in a registration as its leader or as a teammate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRole {
    Leader,
    Member,
}

/// A registration a user is involved in, joined with the program fields quota accounting needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participation {
    pub registration_id: RegistrationId,
    pub program_id: ProgramId,
    pub kind: ProgramType,
    pub category: ProgramCategory,
    pub role: ParticipationRole,
    pub status: RegistrationStatus,
}

/// Users already committed to a program through non-cancelled registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramOccupancy {
    pub leaders: Vec<UserId>,
    pub members: Vec<UserId>,
}

impl ProgramOccupancy {
    pub fn is_leader(&self, user_id: &UserId) -> bool {
        self.leaders.contains(user_id)
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }
}

/// Public projection of a registration and its roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationView {
    pub registration_id: RegistrationId,
    pub program_id: ProgramId,
    pub house_id: HouseId,
    pub leader_id: UserId,
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub member_ids: Vec<UserId>,
    pub roster_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
}

impl RegistrationView {
    pub fn new(registration: &Registration, members: &[UserId]) -> Self {
        Self {
            registration_id: registration.id.clone(),
            program_id: registration.program_id.clone(),
            house_id: registration.house_id.clone(),
            leader_id: registration.user_id.clone(),
            status: registration.status,
            group_name: registration.group_name.clone(),
            member_ids: members.to_vec(),
            roster_size: 1 + members.len() as u32,
            grade: registration.grade,
        }
    }
}
