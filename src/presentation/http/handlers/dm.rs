//! DM conversation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::application::dto::{CreateDmRequest, DmConversationResponse};
use crate::domain::UserStatus;
use crate::presentation::http::extractors::ValidatedJson;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// POST /api/v1/dms
///
/// Get or create the DM room shared by two users. The conversation is
/// described from `userId1`'s side. Answers 201 when the room was created.
pub async fn create_dm(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateDmRequest>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = state
        .dms
        .get_or_create(request.user_id1, request.user_id2)
        .await?;

    if conversation.created {
        tracing::info!(
            room_id = conversation.room.id,
            user_id1 = request.user_id1,
            user_id2 = request.user_id2,
            "DM room created"
        );
        state.gateway.dm_room_created(conversation.room.clone());
    }

    let created = conversation.created;
    let statuses = state
        .gateway
        .statuses(vec![conversation.other_user.id])
        .await?;
    let status = statuses
        .get(&conversation.other_user.id)
        .copied()
        .unwrap_or(UserStatus::Offline);
    let response = DmConversationResponse::new(conversation, status);

    let code = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((code, Json(response)))
}

/// GET /api/v1/users/{user_id}/dms
pub async fn list_dms(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<DmConversationResponse>>, AppError> {
    let conversations = state.dms.list_conversations(user_id).await?;

    let other_ids = conversations.iter().map(|c| c.other_user.id).collect();
    let statuses = state.gateway.statuses(other_ids).await?;

    let response = conversations
        .into_iter()
        .map(|c| {
            let status = statuses
                .get(&c.other_user.id)
                .copied()
                .unwrap_or(UserStatus::Offline);
            DmConversationResponse::new(c, status)
        })
        .collect();

    Ok(Json(response))
}
