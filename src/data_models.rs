use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One video returned by a lookup, in upstream response order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<String>,
}

impl VideoResult {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> VideoResult {
        VideoResult {
            video_id: video_id.into(),
            title: title.into(),
            description: String::new(),
            channel_title: String::new(),
            thumbnail_url: None,
            published_at: None,
        }
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl NotificationId {
    pub(crate) fn new(raw: u64) -> NotificationId {
        NotificationId(raw)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    #[default]
    Default,
    Destructive,
}

/// Display payload; the queue never inspects it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub variant: NotificationVariant,
}

impl NotificationPayload {
    pub fn new() -> NotificationPayload {
        NotificationPayload::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> NotificationPayload {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> NotificationPayload {
        self.description = Some(description.into());
        self
    }

    pub fn destructive(mut self) -> NotificationPayload {
        self.variant = NotificationVariant::Destructive;
        self
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub variant: NotificationVariant,
    /// Cleared by dismissal; the entry stays queued until its lifetime ends.
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: NotificationId, payload: NotificationPayload) -> Notification {
        Notification {
            id,
            title: payload.title,
            description: payload.description,
            variant: payload.variant,
            visible: true,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn apply(&mut self, payload: NotificationPayload) {
        self.title = payload.title;
        self.description = payload.description;
        self.variant = payload.variant;
    }
}
