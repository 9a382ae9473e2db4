mod leaderboard;

pub use leaderboard::{podium, rank_competition, rank_dense, Podium, RankGroup, RankedHouse};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Grade, House, HouseId, Registration, RegistrationId};
use super::repository::{FestivalRepository, RepositoryError};

/// Fixed point table. Participation and ungraded entries score nothing.
pub const fn points(grade: Option<Grade>) -> u32 {
    match grade {
        Some(Grade::Winner) => 5,
        Some(Grade::FirstRunnerUp) => 4,
        Some(Grade::SecondRunnerUp) => 3,
        Some(Grade::Participation) | None => 0,
    }
}

/// Adds the points for `grade` to a running total, pinning at `u32::MAX`.
const fn add_points(total: u32, grade: Option<Grade>) -> u32 {
    total.saturating_add(points(grade))
}

/// A house with its accumulated score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseScore {
    pub house_id: HouseId,
    pub name: String,
    pub color: String,
    pub score: u32,
}

/// Both ranking views derived from one score snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub scores: Vec<HouseScore>,
    pub podium: Podium,
    pub standings: Vec<RankedHouse>,
}

impl Leaderboard {
    pub fn from_scores(scores: Vec<HouseScore>) -> Self {
        let podium = podium(&scores);
        let standings = rank_competition(&scores);
        Self {
            scores,
            podium,
            standings,
        }
    }
}

/// Sums points per house over non-cancelled registrations with a present attendance mark.
///
/// Every house appears exactly once, in the order given, even with no scoring entries. A team
/// registration counts once no matter how many members it has.
pub fn tally_house_scores(
    houses: &[House],
    registrations: &[Registration],
    present: &BTreeSet<RegistrationId>,
) -> Vec<HouseScore> {
    let mut totals: BTreeMap<&HouseId, u32> = BTreeMap::new();
    for registration in registrations {
        if !registration.status.is_active() || !present.contains(&registration.id) {
            continue;
        }
        let total = totals.entry(&registration.house_id).or_default();
        *total = add_points(*total, registration.grade);
    }

    houses
        .iter()
        .map(|house| HouseScore {
            house_id: house.id.clone(),
            name: house.name.clone(),
            color: house.color.clone(),
            score: totals.get(&house.id).copied().unwrap_or(0),
        })
        .collect()
}

/// Recomputes house totals from current registrations on every call.
pub struct ScoringService<R> {
    repository: Arc<R>,
}

impl<R> ScoringService<R>
where
    R: FestivalRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn compute_house_scores(&self) -> Result<Vec<HouseScore>, ScoringError> {
        let houses = self.repository.houses()?;
        let registrations = self.repository.registrations()?;

        // Attendance only matters for entries that could add points.
        let mut present = BTreeSet::new();
        for registration in &registrations {
            if registration.status.is_active()
                && points(registration.grade) > 0
                && self.repository.has_present_attendance(&registration.id)?
            {
                present.insert(registration.id.clone());
            }
        }

        let scores = tally_house_scores(&houses, &registrations, &present);
        debug!(
            houses = scores.len(),
            scored_entries = present.len(),
            "house scores recomputed"
        );
        Ok(scores)
    }

    pub fn leaderboard(&self) -> Result<Leaderboard, ScoringError> {
        Ok(Leaderboard::from_scores(self.compute_house_scores()?))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("internal failure: {0}")]
    Internal(String),
}

impl ScoringError {
    pub const fn code(&self) -> &'static str {
        "INTERNAL"
    }
}

impl From<RepositoryError> for ScoringError {
    fn from(value: RepositoryError) -> Self {
        ScoringError::Internal(value.to_string())
    }
}
