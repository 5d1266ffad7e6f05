use serde::{Deserialize, Serialize};

use super::role::Candidate;

/// Deprecated single-role configuration record, kept for backward read
/// compatibility with deployments that predate the multi-role schema. New
/// code paths never write it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyConfig {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    #[serde(default)]
    pub is_configured: bool,
}
