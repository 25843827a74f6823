use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{EntityId, SessionHandle};
use crate::value_objects::Coordinates;

/// Persisted "where to go next" for a quest whose current location is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePointer {
    pub session_handle: SessionHandle,
    pub entity_id: EntityId,
    pub title: String,
    pub next_location_name: String,
    pub next_latitude: f64,
    pub next_longitude: f64,
}

impl ResumePointer {
    pub fn next_goal(&self) -> Result<Coordinates, DomainError> {
        Coordinates::new(self.next_latitude, self.next_longitude)
    }
}
