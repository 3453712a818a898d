use serde::{Deserialize, Serialize};

/// Metadata the service reports for a source URL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    #[serde(rename = "thumbnail", default)]
    pub thumbnail_url: String,
    #[serde(rename = "duration", default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub view_count: u64,
}

impl MediaInfo {
    /// `m:ss`, or `h:mm:ss` once the duration reaches an hour.
    pub fn duration_label(&self) -> String {
        let total = self.duration_seconds;
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}
