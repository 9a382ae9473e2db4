//! Registration admission: quota accounting, roster validation and the atomic write.
//!
//! Checks run fail-fast in a fixed order so every rejection names the first rule that failed.
//! Batches are evaluated strictly left to right and each accepted item consumes quota before
//! the next one is looked at.

mod limits;
mod quota;
mod roster;

pub use limits::{QuotaLimits, QuotaUsage};
pub use quota::{QuotaBucket, QuotaCounts};
pub use roster::RosterViolation;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::domain::{
    HouseId, Participation, Program, ProgramId, ProgramType, Registration, RegistrationDraft,
    RegistrationStatus, RegistrationView, UserId,
};
use super::repository::{FestivalRepository, Notifier, RegistrationNotice, RepositoryError};
use crate::config::ConfigProvider;
use roster::{normalize_members, validate_roster, Candidate};

/// Status given to every admitted registration; there is no later confirmation step.
const ADMITTED_STATUS: RegistrationStatus = RegistrationStatus::Confirmed;

/// One program a student asks to join, alone or leading a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub program_id: ProgramId,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

impl RegistrationRequest {
    pub fn solo(program_id: ProgramId) -> Self {
        Self {
            program_id,
            is_group: false,
            group_name: None,
            member_ids: Vec::new(),
        }
    }

    pub fn group(program_id: ProgramId, group_name: impl Into<String>, members: Vec<UserId>) -> Self {
        Self {
            program_id,
            is_group: true,
            group_name: Some(group_name.into()),
            member_ids: members,
        }
    }
}

/// Batch item that stopped evaluation, with its position in the submitted list.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedItem {
    pub index: usize,
    pub program_id: ProgramId,
    pub error: AdmissionError,
}

/// Result of a batch admission that committed at least one registration.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAdmission {
    pub created: Vec<RegistrationView>,
    /// Programs dropped because the user already takes part in them.
    pub skipped: Vec<ProgramId>,
    pub rejected: Option<RejectedItem>,
}

/// Reasons an admission request is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdmissionError {
    #[error("user {0:?} not found")]
    UserNotFound(UserId),
    #[error("user has no house assigned")]
    HouseNotAssigned,
    #[error("program {0:?} is unavailable")]
    ProgramUnavailable(ProgramId),
    #[error("program {program_id:?} only accepts {} entries", .expected.label())]
    TypeMismatch {
        program_id: ProgramId,
        expected: ProgramType,
    },
    #[error("group entry for {0:?} needs a group name")]
    GroupNameRequired(ProgramId),
    #[error("already registered for {0:?}")]
    AlreadyRegistered(ProgramId),
    #[error("every requested program is already registered")]
    NothingNew,
    #[error(transparent)]
    Roster(#[from] RosterViolation),
    #[error("{} limit of {max} reached", .bucket.code())]
    LimitExceeded { bucket: QuotaBucket, max: u32 },
    #[error("teammate {user_id:?} has reached the {} limit of {max}", .bucket.code())]
    MemberLimitExceeded {
        user_id: UserId,
        bucket: QuotaBucket,
        max: u32,
    },
    #[error("registration raced with a concurrent write: {0}")]
    DuplicateConstraint(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl AdmissionError {
    pub const fn code(&self) -> &'static str {
        match self {
            AdmissionError::UserNotFound(_) => "NOT_FOUND",
            AdmissionError::HouseNotAssigned => "HOUSE_NOT_ASSIGNED",
            AdmissionError::ProgramUnavailable(_) => "PROGRAM_UNAVAILABLE",
            AdmissionError::TypeMismatch { .. } => "TYPE_MISMATCH",
            AdmissionError::GroupNameRequired(_) => "GROUP_NAME_REQUIRED",
            AdmissionError::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            AdmissionError::NothingNew => "NOTHING_NEW",
            AdmissionError::Roster(violation) => violation.code(),
            AdmissionError::LimitExceeded { .. } | AdmissionError::MemberLimitExceeded { .. } => {
                "LIMIT_EXCEEDED"
            }
            AdmissionError::DuplicateConstraint(_) => "DUPLICATE_CONSTRAINT",
            AdmissionError::Internal(_) => "INTERNAL",
        }
    }

    /// Structured context a transport layer needs to render a message.
    pub fn detail(&self) -> Value {
        match self {
            AdmissionError::UserNotFound(user_id) => json!({ "user_id": user_id }),
            AdmissionError::ProgramUnavailable(program_id)
            | AdmissionError::GroupNameRequired(program_id)
            | AdmissionError::AlreadyRegistered(program_id) => json!({ "program_id": program_id }),
            AdmissionError::TypeMismatch {
                program_id,
                expected,
            } => json!({ "program_id": program_id, "expected": expected }),
            AdmissionError::Roster(violation) => violation.detail(),
            AdmissionError::LimitExceeded { bucket, max } => {
                json!({ "bucket": bucket, "max": max })
            }
            AdmissionError::MemberLimitExceeded {
                user_id,
                bucket,
                max,
            } => json!({ "user_id": user_id, "bucket": bucket, "max": max }),
            AdmissionError::HouseNotAssigned
            | AdmissionError::NothingNew
            | AdmissionError::DuplicateConstraint(_)
            | AdmissionError::Internal(_) => json!({}),
        }
    }
}

impl From<RepositoryError> for AdmissionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(constraint) => AdmissionError::DuplicateConstraint(constraint),
            other => AdmissionError::Internal(other.to_string()),
        }
    }
}

/// Running quota counts for one admission call: the leader's and each teammate's seen so far.
struct QuotaLedger {
    leader: QuotaCounts,
    members: BTreeMap<UserId, QuotaCounts>,
}

impl QuotaLedger {
    fn new(leader: QuotaCounts) -> Self {
        Self {
            leader,
            members: BTreeMap::new(),
        }
    }
}

/// Validates registration requests and writes the admitted ones.
pub struct AdmissionController<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    limits: Arc<dyn ConfigProvider>,
}

impl<R, N> AdmissionController<R, N>
where
    R: FestivalRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, limits: Arc<dyn ConfigProvider>) -> Self {
        Self {
            repository,
            notifier,
            limits,
        }
    }

    /// Admit one registration. Fails with the first rule it breaks.
    pub fn register_single(
        &self,
        user_id: &UserId,
        request: RegistrationRequest,
    ) -> Result<RegistrationView, AdmissionError> {
        let house_id = self.leader_house(user_id)?;
        let program = self.admissible_program(&request)?;

        let participations = self.repository.participations(user_id)?;
        if participates_in(&participations, &program.id) {
            debug!(user_id = %user_id.0, program_id = %program.id.0, "duplicate registration refused");
            return Err(AdmissionError::AlreadyRegistered(program.id));
        }

        let limits = QuotaLimits::resolve(self.limits.as_ref());
        let mut ledger = QuotaLedger::new(QuotaCounts::tally(&participations));
        let draft = self.prepare(user_id, &house_id, &program, request, &limits, &mut ledger)?;

        let mut views = self.commit(vec![draft])?;
        views.pop().ok_or_else(|| {
            AdmissionError::Internal("store returned no registration".to_string())
        })
    }

    /// Admit several registrations in request order.
    ///
    /// Items for programs the user already takes part in are dropped up front. The remainder is
    /// evaluated left to right until one fails; everything accepted before that commits in a
    /// single write and the failure is reported alongside.
    pub fn register_batch(
        &self,
        user_id: &UserId,
        requests: Vec<RegistrationRequest>,
    ) -> Result<BatchAdmission, AdmissionError> {
        let house_id = self.leader_house(user_id)?;
        let participations = self.repository.participations(user_id)?;

        let mut covered: BTreeSet<ProgramId> = participations
            .iter()
            .filter(|participation| participation.status.is_active())
            .map(|participation| participation.program_id.clone())
            .collect();

        let mut skipped = Vec::new();
        let mut remainder = Vec::new();
        for (index, request) in requests.into_iter().enumerate() {
            if covered.insert(request.program_id.clone()) {
                remainder.push((index, request));
            } else {
                skipped.push(request.program_id);
            }
        }

        if remainder.is_empty() {
            info!(user_id = %user_id.0, skipped = skipped.len(), "batch carried nothing new");
            return Err(AdmissionError::NothingNew);
        }

        let limits = QuotaLimits::resolve(self.limits.as_ref());
        let mut ledger = QuotaLedger::new(QuotaCounts::tally(&participations));
        let mut drafts = Vec::with_capacity(remainder.len());
        let mut rejected = None;

        for (index, request) in remainder {
            let program_id = request.program_id.clone();
            let outcome = self
                .admissible_program(&request)
                .and_then(|program| {
                    self.prepare(user_id, &house_id, &program, request, &limits, &mut ledger)
                });

            match outcome {
                Ok(draft) => drafts.push(draft),
                Err(error) => {
                    debug!(
                        user_id = %user_id.0,
                        program_id = %program_id.0,
                        index,
                        code = error.code(),
                        "batch item rejected"
                    );
                    rejected = Some(RejectedItem {
                        index,
                        program_id,
                        error,
                    });
                    break;
                }
            }
        }

        if drafts.is_empty() {
            return Err(match rejected {
                Some(item) => item.error,
                None => AdmissionError::NothingNew,
            });
        }

        let created = self.commit(drafts)?;
        Ok(BatchAdmission {
            created,
            skipped,
            rejected,
        })
    }

    /// Current counts per bucket next to the limits in force right now.
    pub fn quota_usage(&self, user_id: &UserId) -> Result<QuotaUsage, AdmissionError> {
        if self.repository.user(user_id)?.is_none() {
            return Err(AdmissionError::UserNotFound(user_id.clone()));
        }
        let participations = self.repository.participations(user_id)?;
        let limits = QuotaLimits::resolve(self.limits.as_ref());
        Ok(QuotaUsage::new(QuotaCounts::tally(&participations), limits))
    }

    fn leader_house(&self, user_id: &UserId) -> Result<HouseId, AdmissionError> {
        let user = self
            .repository
            .user(user_id)?
            .ok_or_else(|| AdmissionError::UserNotFound(user_id.clone()))?;
        user.house_id.ok_or(AdmissionError::HouseNotAssigned)
    }

    fn admissible_program(&self, request: &RegistrationRequest) -> Result<Program, AdmissionError> {
        let program = self
            .repository
            .program(&request.program_id)?
            .filter(|program| program.is_active)
            .ok_or_else(|| AdmissionError::ProgramUnavailable(request.program_id.clone()))?;

        if request.is_group != program.kind.is_group() {
            return Err(AdmissionError::TypeMismatch {
                program_id: program.id,
                expected: program.kind,
            });
        }

        if request.is_group && blank(request.group_name.as_deref()) {
            return Err(AdmissionError::GroupNameRequired(program.id));
        }

        Ok(program)
    }

    /// Roster and quota checks; on success the item's bucket is charged to the leader and to
    /// every teammate in `ledger`.
    fn prepare(
        &self,
        user_id: &UserId,
        house_id: &HouseId,
        program: &Program,
        request: RegistrationRequest,
        limits: &QuotaLimits,
        ledger: &mut QuotaLedger,
    ) -> Result<RegistrationDraft, AdmissionError> {
        let member_ids = if request.is_group {
            normalize_members(user_id, &request.member_ids)
        } else {
            Vec::new()
        };

        if request.is_group {
            let candidates = member_ids
                .iter()
                .map(|id| {
                    Ok(Candidate {
                        id: id.clone(),
                        user: self.repository.user(id)?,
                    })
                })
                .collect::<Result<Vec<_>, RepositoryError>>()?;
            let occupancy = self.repository.occupancy(&program.id)?;
            validate_roster(house_id, program, &candidates, &occupancy)?;
        }

        let bucket = QuotaBucket::classify(program.kind, program.category);
        if !limits.admits_another(&ledger.leader, bucket) {
            return Err(AdmissionError::LimitExceeded {
                bucket,
                max: limits.max(bucket),
            });
        }

        for member_id in &member_ids {
            let counts = match ledger.members.entry(member_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let participations = self.repository.participations(member_id)?;
                    entry.insert(QuotaCounts::tally(&participations))
                }
            };
            if !limits.admits_another(counts, bucket) {
                debug!(
                    user_id = %member_id.0,
                    program_id = %program.id.0,
                    bucket = bucket.code(),
                    "teammate quota exhausted"
                );
                return Err(AdmissionError::MemberLimitExceeded {
                    user_id: member_id.clone(),
                    bucket,
                    max: limits.max(bucket),
                });
            }
        }

        ledger.leader.record(bucket);
        for member_id in &member_ids {
            if let Some(counts) = ledger.members.get_mut(member_id) {
                counts.record(bucket);
            }
        }

        Ok(RegistrationDraft {
            user_id: user_id.clone(),
            program_id: program.id.clone(),
            house_id: house_id.clone(),
            is_group: request.is_group,
            group_name: request
                .group_name
                .filter(|_| request.is_group)
                .map(|name| name.trim().to_string()),
            status: ADMITTED_STATUS,
            member_ids,
        })
    }

    fn commit(&self, drafts: Vec<RegistrationDraft>) -> Result<Vec<RegistrationView>, AdmissionError> {
        let created = self.repository.create_registrations(&drafts).map_err(|error| {
            warn!(%error, items = drafts.len(), "registration write failed");
            AdmissionError::from(error)
        })?;

        let views: Vec<RegistrationView> = created
            .iter()
            .zip(&drafts)
            .map(|(registration, draft)| RegistrationView::new(registration, &draft.member_ids))
            .collect();

        for (registration, draft) in created.iter().zip(&drafts) {
            info!(
                registration_id = %registration.id.0,
                user_id = %registration.user_id.0,
                program_id = %registration.program_id.0,
                roster_size = 1 + draft.member_ids.len(),
                "registration admitted"
            );
            self.announce(registration, &draft.member_ids);
        }

        Ok(views)
    }

    /// Best-effort notices; delivery failures never undo an admission.
    fn announce(&self, registration: &Registration, member_ids: &[UserId]) {
        let mut details = BTreeMap::new();
        details.insert("program_id".to_string(), registration.program_id.0.clone());
        details.insert("status".to_string(), registration.status.label().to_string());
        details.insert(
            "roster_size".to_string(),
            (1 + member_ids.len()).to_string(),
        );

        let leader_notice = RegistrationNotice {
            template: "registration_confirmed".to_string(),
            user_id: registration.user_id.clone(),
            registration_id: registration.id.clone(),
            details: details.clone(),
        };

        let mut member_details = details;
        member_details.insert("leader_id".to_string(), registration.user_id.0.clone());
        if let Some(name) = &registration.group_name {
            member_details.insert("group_name".to_string(), name.clone());
        }

        let member_notices = member_ids.iter().map(|member_id| RegistrationNotice {
            template: "added_to_team".to_string(),
            user_id: member_id.clone(),
            registration_id: registration.id.clone(),
            details: member_details.clone(),
        });

        for notice in std::iter::once(leader_notice).chain(member_notices) {
            if let Err(error) = self.notifier.notify(&notice) {
                warn!(
                    %error,
                    registration_id = %notice.registration_id.0,
                    user_id = %notice.user_id.0,
                    template = %notice.template,
                    "notification dropped"
                );
            }
        }
    }
}

fn participates_in(participations: &[Participation], program_id: &ProgramId) -> bool {
    participations
        .iter()
        .any(|participation| participation.status.is_active() && &participation.program_id == program_id)
}

fn blank(value: Option<&str>) -> bool {
    value.map(|name| name.trim().is_empty()).unwrap_or(true)
}
