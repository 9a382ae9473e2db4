use serde::{Deserialize, Serialize};

use super::quota::{QuotaBucket, QuotaCounts};
use crate::config::ConfigProvider;

/// Configured maximum per quota bucket, as seen at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub max_on_stage_solo: u32,
    pub max_on_stage_group: u32,
    pub max_off_stage_total: u32,
}

impl QuotaLimits {
    /// Reads all three limits; anything missing resolves to 0 and closes that bucket.
    pub fn resolve(provider: &dyn ConfigProvider) -> Self {
        Self::resolve_or(provider, Self::default())
    }

    pub fn resolve_or(provider: &dyn ConfigProvider, fallback: QuotaLimits) -> Self {
        let read = |bucket: QuotaBucket| {
            provider
                .get_int(bucket.config_key())
                .unwrap_or_else(|| fallback.max(bucket))
        };

        Self {
            max_on_stage_solo: read(QuotaBucket::OnStageSolo),
            max_on_stage_group: read(QuotaBucket::OnStageGroup),
            max_off_stage_total: read(QuotaBucket::OffStageTotal),
        }
    }

    pub const fn max(&self, bucket: QuotaBucket) -> u32 {
        match bucket {
            QuotaBucket::OnStageSolo => self.max_on_stage_solo,
            QuotaBucket::OnStageGroup => self.max_on_stage_group,
            QuotaBucket::OffStageTotal => self.max_off_stage_total,
        }
    }

    /// One more entry fits only while the current count is strictly below the maximum.
    pub const fn admits_another(&self, counts: &QuotaCounts, bucket: QuotaBucket) -> bool {
        counts.get(bucket) < self.max(bucket)
    }
}

/// Snapshot returned to the UI so students can see what they have left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub counts: QuotaCounts,
    pub limits: QuotaLimits,
    pub remaining: QuotaCounts,
}

impl QuotaUsage {
    pub fn new(counts: QuotaCounts, limits: QuotaLimits) -> Self {
        let remaining = |bucket: QuotaBucket| limits.max(bucket).saturating_sub(counts.get(bucket));
        Self {
            counts,
            limits,
            remaining: QuotaCounts {
                on_stage_solo: remaining(QuotaBucket::OnStageSolo),
                on_stage_group: remaining(QuotaBucket::OnStageGroup),
                off_stage_total: remaining(QuotaBucket::OffStageTotal),
            },
        }
    }
}
