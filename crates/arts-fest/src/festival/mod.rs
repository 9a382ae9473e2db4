//! Festival registration core: who may enter which program, how graded results roll up into
//! house scores, and how those scores are ranked.

pub mod admission;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod results;
pub mod router;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use admission::{
    AdmissionController, AdmissionError, BatchAdmission, QuotaBucket, QuotaCounts, QuotaLimits,
    QuotaUsage, RegistrationRequest, RejectedItem, RosterViolation,
};
pub use domain::{
    Grade, GroupMember, House, HouseId, Program, ProgramCategory, ProgramId, ProgramType,
    Registration, RegistrationId, RegistrationStatus, RegistrationView, Role, User, UserId,
};
pub use memory::{InMemoryFestivalStore, InMemoryNotifier};
pub use repository::{
    FestivalRepository, Notifier, NotifyError, RegistrationNotice, RepositoryError,
};
pub use results::{ResultError, ResultService};
pub use router::{festival_router, FestivalState};
pub use scoring::{
    podium, points, rank_competition, rank_dense, HouseScore, Leaderboard, Podium, RankGroup,
    RankedHouse, ScoringError, ScoringService,
};
