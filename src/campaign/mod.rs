/// Campaign sequencing: the fixed-order sweep over all resource families
pub mod orchestrator;

pub use orchestrator::{CampaignOrchestrator, CampaignSummary};
