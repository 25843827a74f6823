//! Backend ports - the REST surface owning canonical play state.
//!
//! Split by concern so services only depend on what they call:
//! - `PlayRecordPort` - status transitions, listing and deletion
//! - `QuestCursorPort` - the quest step cursor and answer checks
//! - `HintPort` - hint purchases

use async_trait::async_trait;
use geoquest_domain::{
    PlayRecord, PlayRecordId, PlaySessionStatus, PursuitKind, QuestLocation, SessionHandle,
};

use crate::application::dto::{
    ActionDetail, AnswerSubmission, AnswerVerdict, HintPurchaseRequest, HintPurchaseResponse,
    TransitionRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Not found")]
    NotFound,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    Decode(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayRecordPort: Send + Sync {
    /// POST `/{kind}/play/{status}`; returns the authoritative record.
    async fn transition(
        &self,
        kind: PursuitKind,
        to: PlaySessionStatus,
        request: &TransitionRequest,
    ) -> Result<PlayRecord, BackendError>;

    /// GET `/{kind}/play/reading/{status}` for the authenticated player.
    async fn list(
        &self,
        kind: PursuitKind,
        status: PlaySessionStatus,
    ) -> Result<Vec<PlayRecord>, BackendError>;

    /// DELETE `/{kind}/play/available/{id}`.
    async fn delete_available(
        &self,
        kind: PursuitKind,
        record_id: &PlayRecordId,
    ) -> Result<(), BackendError>;
}

/// Quest step cursor.
///
/// `current_action` advances the server's implicit cursor once the previous
/// step is finished, so callers must never issue it twice for one completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestCursorPort: Send + Sync {
    async fn current_action(&self, handle: &SessionHandle) -> Result<ActionDetail, BackendError>;

    async fn current_location(&self, handle: &SessionHandle)
        -> Result<QuestLocation, BackendError>;

    async fn next_location(&self, handle: &SessionHandle) -> Result<QuestLocation, BackendError>;

    async fn check_answer(
        &self,
        handle: &SessionHandle,
        submission: &AnswerSubmission,
    ) -> Result<AnswerVerdict, BackendError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HintPort: Send + Sync {
    async fn purchase_hint(
        &self,
        request: &HintPurchaseRequest,
    ) -> Result<HintPurchaseResponse, BackendError>;
}
