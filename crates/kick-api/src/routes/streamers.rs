use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use kick_core::{ChannelStatus, Snapshot};

use crate::state::AppState;

/// One dashboard row.
#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: String,
    pub username: String,
    pub name: String,
    pub live: bool,
    pub title: Option<String>,
    pub viewers: Option<u64>,
    pub url: String,
    pub avatar: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl From<&ChannelStatus> for MemberView {
    fn from(c: &ChannelStatus) -> Self {
        Self {
            id: c.identifier.clone(),
            username: c.identifier.clone(),
            name: c.display_name.clone(),
            live: c.is_live,
            title: c.title.clone(),
            viewers: c.viewer_count,
            url: c.profile_url.clone(),
            avatar: c.avatar_url.clone(),
            thumbnail: c.thumbnail_url.clone(),
            error: c.fetch_failed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamersResponse {
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub total_members: usize,
    pub live_count: usize,
    pub members: Vec<MemberView>,
}

impl From<&Snapshot> for StreamersResponse {
    fn from(s: &Snapshot) -> Self {
        Self {
            updated_at: s.generated_at(),
            version: s.version(),
            total_members: s.total_count(),
            live_count: s.live_count(),
            members: s.channels().iter().map(MemberView::from).collect(),
        }
    }
}

/// The latest published snapshot. Never waits on an update cycle.
pub async fn list_streamers(State(state): State<AppState>) -> Json<StreamersResponse> {
    let snapshot = state.tracker().snapshot();
    Json(StreamersResponse::from(snapshot.as_ref()))
}
