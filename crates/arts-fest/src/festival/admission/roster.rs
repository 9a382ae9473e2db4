use serde_json::{json, Value};

use super::super::domain::{HouseId, Program, ProgramOccupancy, User, UserId};

/// Reasons a proposed team roster cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterViolation {
    #[error("team member {0:?} does not exist")]
    UnknownMember(UserId),
    #[error("team member {0:?} belongs to another house")]
    CrossHouseMember(UserId),
    #[error("team of {size} is outside the allowed range {min}..={max}")]
    TeamSizeOutOfRange { size: u32, min: u32, max: u32 },
    #[error("team member {0:?} already registered for this program")]
    MemberAlreadyRegistered(UserId),
    #[error("team member {0:?} already belongs to a team for this program")]
    MemberAlreadyOnTeam(UserId),
}

impl RosterViolation {
    pub const fn code(&self) -> &'static str {
        match self {
            RosterViolation::UnknownMember(_) => "NOT_FOUND",
            RosterViolation::CrossHouseMember(_) => "CROSS_HOUSE_MEMBER",
            RosterViolation::TeamSizeOutOfRange { .. } => "TEAM_SIZE_OUT_OF_RANGE",
            RosterViolation::MemberAlreadyRegistered(_) => "MEMBER_ALREADY_REGISTERED",
            RosterViolation::MemberAlreadyOnTeam(_) => "MEMBER_ALREADY_ON_TEAM",
        }
    }

    pub fn detail(&self) -> Value {
        match self {
            RosterViolation::UnknownMember(user_id)
            | RosterViolation::CrossHouseMember(user_id)
            | RosterViolation::MemberAlreadyRegistered(user_id)
            | RosterViolation::MemberAlreadyOnTeam(user_id) => json!({ "user_id": user_id }),
            RosterViolation::TeamSizeOutOfRange { size, min, max } => {
                json!({ "size": size, "min": min, "max": max })
            }
        }
    }
}

/// Candidate teammate as submitted, paired with the user record it resolved to (if any).
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub id: UserId,
    pub user: Option<User>,
}

/// Drops repeated ids and the leader themself, keeping submission order.
pub(crate) fn normalize_members(leader: &UserId, member_ids: &[UserId]) -> Vec<UserId> {
    let mut normalized: Vec<UserId> = Vec::with_capacity(member_ids.len());
    for id in member_ids {
        if id != leader && !normalized.contains(id) {
            normalized.push(id.clone());
        }
    }
    normalized
}

/// Applies the roster rules in order: house homogeneity, team size, then overlap with the
/// program's existing leaders and teams.
pub(crate) fn validate_roster(
    leader_house: &HouseId,
    program: &Program,
    candidates: &[Candidate],
    occupancy: &ProgramOccupancy,
) -> Result<(), RosterViolation> {
    for candidate in candidates {
        match &candidate.user {
            None => return Err(RosterViolation::UnknownMember(candidate.id.clone())),
            Some(user) if user.house_id.as_ref() != Some(leader_house) => {
                return Err(RosterViolation::CrossHouseMember(candidate.id.clone()));
            }
            Some(_) => {}
        }
    }

    let size = 1 + candidates.len() as u32;
    if !program.accepts_team_of(size) {
        return Err(RosterViolation::TeamSizeOutOfRange {
            size,
            min: program.min_members,
            max: program.max_members,
        });
    }

    if let Some(candidate) = candidates
        .iter()
        .find(|candidate| occupancy.is_leader(&candidate.id))
    {
        return Err(RosterViolation::MemberAlreadyRegistered(
            candidate.id.clone(),
        ));
    }

    if let Some(candidate) = candidates
        .iter()
        .find(|candidate| occupancy.is_member(&candidate.id))
    {
        return Err(RosterViolation::MemberAlreadyOnTeam(candidate.id.clone()));
    }

    Ok(())
}
