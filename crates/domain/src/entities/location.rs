use serde::{Deserialize, Serialize};

use crate::ids::LocationId;
use crate::value_objects::Coordinates;

/// A quest location as reported by the current/next location endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestLocation {
    pub location_id: LocationId,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    /// True when this is the quest's final location.
    #[serde(default)]
    pub end_location: bool,
}
