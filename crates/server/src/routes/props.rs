use axum::extract::State;
use axum::Json;

use service::props::{shared_props, SharedProps};

use crate::errors::ApiError;
use crate::identity::MaybeUser;
use crate::state::AppState;

pub async fn get_shared_props(State(state): State<AppState>, MaybeUser(requester): MaybeUser) -> Result<Json<SharedProps>, ApiError> {
    Ok(Json(shared_props(&state.branding, requester.as_ref()).await?))
}
