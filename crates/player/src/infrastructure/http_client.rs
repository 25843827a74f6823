//! REST client for the play backend.

use async_trait::async_trait;
use geoquest_domain::{
    PlayRecord, PlayRecordId, PlaySessionStatus, PursuitKind, QuestLocation, SessionHandle,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::application::dto::{
    ActionDetail, Answer, AnswerSubmission, AnswerVerdict, HintPurchaseRequest,
    HintPurchaseResponse, TransitionRequest,
};
use crate::ports::outbound::{BackendError, HintPort, PlayRecordPort, QuestCursorPort};

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Client for the play endpoints; implements every backend port.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| BackendError::Network(e.to_string()))?;
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn session_path(handle: &SessionHandle, leaf: &str) -> String {
        format!("quests/sessions/{}/{}", handle, leaf)
    }
}

#[async_trait]
impl PlayRecordPort for RestBackend {
    async fn transition(
        &self,
        kind: PursuitKind,
        to: PlaySessionStatus,
        request: &TransitionRequest,
    ) -> Result<PlayRecord, BackendError> {
        let path = format!("{}/play/{}", kind.resource(), to.path_segment());
        tracing::debug!(path = %path, entity_id = %request.entity_id, "POST transition");
        self.fetch(self.client.post(self.url(&path)).json(request))
            .await
    }

    async fn list(
        &self,
        kind: PursuitKind,
        status: PlaySessionStatus,
    ) -> Result<Vec<PlayRecord>, BackendError> {
        let path = format!("{}/play/reading/{}", kind.resource(), status);
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn delete_available(
        &self,
        kind: PursuitKind,
        record_id: &PlayRecordId,
    ) -> Result<(), BackendError> {
        let path = format!("{}/play/available/{}", kind.resource(), record_id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}

#[async_trait]
impl QuestCursorPort for RestBackend {
    async fn current_action(&self, handle: &SessionHandle) -> Result<ActionDetail, BackendError> {
        let path = Self::session_path(handle, "current-action");
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn current_location(&self, handle: &SessionHandle) -> Result<QuestLocation, BackendError> {
        let path = Self::session_path(handle, "current-location");
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn next_location(&self, handle: &SessionHandle) -> Result<QuestLocation, BackendError> {
        let path = Self::session_path(handle, "next-location");
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn check_answer(
        &self,
        handle: &SessionHandle,
        submission: &AnswerSubmission,
    ) -> Result<AnswerVerdict, BackendError> {
        let url = self.url(&Self::session_path(handle, "answer-check"));
        let request = match &submission.answer {
            Answer::Photo {
                file_name,
                content_type,
                bytes,
            } => {
                let image = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|e| BackendError::Network(e.to_string()))?;
                let form = Form::new()
                    .text("actionType", submission.action_type().to_string())
                    .text("actionPointId", submission.action_point_id.to_string())
                    .part("image", image);
                self.client.post(url).multipart(form)
            }
            Answer::Text(_) | Answer::Location(_) => {
                self.client.post(url).json(&submission.json_fields())
            }
        };
        self.fetch(request).await
    }
}

#[async_trait]
impl HintPort for RestBackend {
    async fn purchase_hint(
        &self,
        request: &HintPurchaseRequest,
    ) -> Result<HintPurchaseResponse, BackendError> {
        let url = self.url("quests/hints/purchase");
        self.fetch(self.client.post(url).json(request)).await
    }
}
