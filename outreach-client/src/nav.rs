//! Stage navigation utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the campaign pipeline, in intended forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Ingest,
    Preview,
    Generate,
    Send,
    Status,
    Replies,
}

impl Stage {
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Ingest => "1. Upload contacts",
            Stage::Preview => "2. Preview contacts",
            Stage::Generate => "3. Generate & edit emails",
            Stage::Send => "4. Send emails",
            Stage::Status => "5. Campaign status",
            Stage::Replies => "6. AI replies",
        }
    }

    pub fn all() -> &'static [Stage] {
        &[
            Stage::Ingest,
            Stage::Preview,
            Stage::Generate,
            Stage::Send,
            Stage::Status,
            Stage::Replies,
        ]
    }

    /// Stages that may not touch the network without a confirmed campaign.
    pub fn requires_campaign(&self) -> bool {
        matches!(
            self,
            Stage::Generate | Stage::Send | Stage::Status | Stage::Replies
        )
    }

    /// Where a "go back" affordance points when this stage's precondition fails.
    pub fn fallback(&self) -> Option<Stage> {
        match self {
            Stage::Ingest => None,
            Stage::Preview => Some(Stage::Ingest),
            Stage::Generate | Stage::Send | Stage::Status | Stage::Replies => Some(Stage::Preview),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_stages_fall_back_to_preview() {
        for stage in Stage::all() {
            if stage.requires_campaign() {
                assert_eq!(stage.fallback(), Some(Stage::Preview));
            }
        }
        assert_eq!(Stage::Ingest.fallback(), None);
    }
}
