use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::conversations::{validate_conversation_id, Conversation, StoredMessage};
use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::turn::{TurnRequest, TurnResponse};

#[derive(Debug, Serialize)]
pub struct QaResponse {
    pub conversation_id: String,
    pub turn_id: String,
    pub latency_ms: u64,
    #[serde(flatten)]
    pub response: TurnResponse,
}

fn validate(request: &TurnRequest) -> Result<(), ApiError> {
    for (field, value) in [
        ("query", &request.query),
        ("area", &request.area),
        ("site", &request.site),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
        }
    }
    if let Some(id) = &request.conversation_id {
        validate_conversation_id(id)?;
    }
    Ok(())
}

/// Resumes the requested conversation. Storage trouble starts a fresh one instead of failing
/// the turn.
async fn open_conversation(state: &AppState, request: &TurnRequest) -> Conversation {
    let requested = request.conversation_id.as_deref();
    match state
        .conversations
        .get_or_create(requested, &request.area, &request.site)
        .await
    {
        Ok(conversation) => conversation,
        Err(err) => {
            tracing::warn!("Conversation store unavailable, starting fresh: {}", err);
            let id = requested
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            Conversation::new(id, &request.area, &request.site)
        }
    }
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    Json(mut request): Json<TurnRequest>,
) -> Result<Json<QaResponse>, ApiError> {
    validate(&request)?;

    if state
        .locations
        .get(&request.area, &request.site)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(format!(
            "Location not found: {}/{}",
            request.area, request.site
        )));
    }

    let mut conversation = open_conversation(&state, &request).await;
    if !conversation.messages.is_empty() {
        request.history = conversation.history();
    }

    let turn_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    let span = tracing::info_span!(
        "turn",
        turn_id = %turn_id,
        conversation_id = %conversation.conversation_id
    );

    let asked = StoredMessage::user(request.query.clone());
    let response = state
        .orchestrator
        .answer(&request)
        .instrument(span.clone())
        .await?;

    let answered = StoredMessage::assistant(
        response.answer_text.clone(),
        response.citations.clone(),
        response.images.clone(),
    );
    if let Err(err) = state
        .conversations
        .append(&mut conversation, [asked, answered])
        .instrument(span)
        .await
    {
        tracing::warn!(
            "Failed to save conversation {}: {}",
            conversation.conversation_id,
            err
        );
    }

    Ok(Json(QaResponse {
        conversation_id: conversation.conversation_id,
        turn_id,
        latency_ms: started.elapsed().as_millis() as u64,
        response,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        assert!(validate(&TurnRequest::new("When?", "hefer", "agamon")).is_ok());

        let err = validate(&TurnRequest::new("  ", "hefer", "agamon")).expect_err("query");
        assert_eq!(err.to_string(), "bad request: query must not be empty");
        assert!(validate(&TurnRequest::new("When?", "", "agamon")).is_err());
        assert!(validate(&TurnRequest::new("When?", "hefer", "\n")).is_err());
    }

    #[test]
    fn conversation_id_must_be_key_safe() {
        let mut request = TurnRequest::new("When?", "hefer", "agamon");
        request.conversation_id = Some("web_3f2a".to_string());
        assert!(validate(&request).is_ok());

        request.conversation_id = Some("../../config".to_string());
        assert!(matches!(validate(&request), Err(ApiError::BadRequest(_))));
    }
}
