use serde::{Deserialize, Serialize};

use super::super::domain::{Participation, ProgramCategory, ProgramType};

/// Unit against which numeric registration limits are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaBucket {
    OnStageSolo,
    OnStageGroup,
    OffStageTotal,
}

impl QuotaBucket {
    pub const ALL: [QuotaBucket; 3] = [
        QuotaBucket::OnStageSolo,
        QuotaBucket::OnStageGroup,
        QuotaBucket::OffStageTotal,
    ];

    /// Off-stage entries share one bucket whatever their type.
    pub const fn classify(kind: ProgramType, category: ProgramCategory) -> Self {
        match (category, kind) {
            (ProgramCategory::OnStage, ProgramType::Solo) => QuotaBucket::OnStageSolo,
            (ProgramCategory::OnStage, ProgramType::Group) => QuotaBucket::OnStageGroup,
            (ProgramCategory::OffStage, _) => QuotaBucket::OffStageTotal,
        }
    }

    /// Key used to look the bucket's limit up in the settings store.
    pub const fn config_key(self) -> &'static str {
        match self {
            QuotaBucket::OnStageSolo => "max_on_stage_solo",
            QuotaBucket::OnStageGroup => "max_on_stage_group",
            QuotaBucket::OffStageTotal => "max_off_stage_total",
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            QuotaBucket::OnStageSolo => "ON_STAGE_SOLO",
            QuotaBucket::OnStageGroup => "ON_STAGE_GROUP",
            QuotaBucket::OffStageTotal => "OFF_STAGE_TOTAL",
        }
    }
}

/// Per-bucket counts of a user's live registrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCounts {
    pub on_stage_solo: u32,
    pub on_stage_group: u32,
    pub off_stage_total: u32,
}

impl QuotaCounts {
    /// Counts every non-cancelled participation, led or joined as a teammate.
    pub fn tally<'a, I>(participations: I) -> Self
    where
        I: IntoIterator<Item = &'a Participation>,
    {
        participations
            .into_iter()
            .filter(|participation| participation.status.is_active())
            .fold(Self::default(), |mut counts, participation| {
                counts.record(QuotaBucket::classify(
                    participation.kind,
                    participation.category,
                ));
                counts
            })
    }

    pub const fn get(&self, bucket: QuotaBucket) -> u32 {
        match bucket {
            QuotaBucket::OnStageSolo => self.on_stage_solo,
            QuotaBucket::OnStageGroup => self.on_stage_group,
            QuotaBucket::OffStageTotal => self.off_stage_total,
        }
    }

    /// Adds one tentative entry, e.g. an item accepted earlier in the same batch.
    pub fn record(&mut self, bucket: QuotaBucket) {
        let slot = match bucket {
            QuotaBucket::OnStageSolo => &mut self.on_stage_solo,
            QuotaBucket::OnStageGroup => &mut self.on_stage_group,
            QuotaBucket::OffStageTotal => &mut self.off_stage_total,
        };
        *slot = slot.saturating_add(1);
    }
}
