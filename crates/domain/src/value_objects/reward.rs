use serde::{Deserialize, Serialize};

/// Reward granted when a pursuit is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub coin: u32,
    #[serde(default)]
    pub card_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_tier: Option<String>,
}
