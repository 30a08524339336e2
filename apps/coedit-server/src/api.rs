//! HTTP surface next to the WebSocket: redirect to the client page and the
//! snapshot save/load/list endpoints operating on the shared document.
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

pub async fn index() -> Redirect {
    Redirect::to("/static/editor.html")
}

pub async fn save(State(state): State<AppState>, Query(query): Query<FileQuery>) -> String {
    match state.store.save(&query.file_name, &state.hub.snapshot()) {
        Ok(()) => "OK".to_string(),
        Err(err) => {
            warn!("save of '{}' failed: {err}", query.file_name);
            format!("ERROR: {err}")
        }
    }
}

pub async fn load(State(state): State<AppState>, Query(query): Query<FileQuery>) -> String {
    match state.store.load(&query.file_name) {
        Ok(text) => {
            state.hub.load_text(text);
            "OK".to_string()
        }
        Err(err) => {
            warn!("load of '{}' failed: {err}", query.file_name);
            format!("ERROR: {err}")
        }
    }
}

pub async fn list_files(State(state): State<AppState>) -> Json<Vec<String>> {
    match state.store.list() {
        Ok(names) => Json(names),
        Err(err) => {
            warn!("listing snapshots failed: {err}");
            Json(Vec::new())
        }
    }
}
