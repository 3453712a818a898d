use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConvertError;

/// Kind of artifact the remote service should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Audio,
    Video,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Audio => "audio",
            OutputFormat::Video => "video",
        }
    }

    /// File extension used when the service does not suggest a filename.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Audio => "mp3",
            OutputFormat::Video => "mp4",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" | "mp3" => Ok(OutputFormat::Audio),
            "video" | "mp4" => Ok(OutputFormat::Video),
            other => Err(ConvertError::Validation(format!(
                "unknown output format `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "720p")]
    P720,
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
}

impl VideoQuality {
    pub const ALL: [VideoQuality; 4] = [
        VideoQuality::P720,
        VideoQuality::P1080,
        VideoQuality::P1440,
        VideoQuality::P2160,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoQuality::P720 => "720p",
            VideoQuality::P1080 => "1080p",
            VideoQuality::P1440 => "1440p",
            VideoQuality::P2160 => "2160p",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut wanted = s.trim().to_ascii_lowercase();
        if !wanted.ends_with('p') {
            wanted.push('p');
        }
        VideoQuality::ALL
            .into_iter()
            .find(|quality| quality.as_str() == wanted)
            .ok_or_else(|| ConvertError::Validation(format!("unknown video quality `{s}`")))
    }
}

/// A user's conversion request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub source_url: String,
    pub output_format: OutputFormat,
    /// Only meaningful when `output_format` is [`OutputFormat::Video`].
    pub video_quality: VideoQuality,
}

impl ConversionRequest {
    pub fn new(
        source_url: impl Into<String>,
        output_format: OutputFormat,
        video_quality: VideoQuality,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            output_format,
            video_quality,
        }
    }

    pub fn audio(source_url: impl Into<String>) -> Self {
        Self::new(source_url, OutputFormat::Audio, VideoQuality::default())
    }

    pub fn video(source_url: impl Into<String>, quality: VideoQuality) -> Self {
        Self::new(source_url, OutputFormat::Video, quality)
    }

    /// The URL as it is sent to the service: surrounding whitespace removed.
    pub fn trimmed_url(&self) -> &str {
        self.source_url.trim()
    }

    /// Reject empty or non-URL input before anything touches the network.
    pub fn validate(&self) -> Result<Url, ConvertError> {
        let raw = self.trimmed_url();
        if raw.is_empty() {
            return Err(ConvertError::Validation(
                "enter a link to the video".to_string(),
            ));
        }
        let parsed = Url::parse(raw)
            .map_err(|err| ConvertError::Validation(format!("not a valid url: {err}")))?;
        match parsed.scheme() {
            "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
            _ => Err(ConvertError::Validation(format!(
                "unsupported url `{raw}`, expected an http(s) link"
            ))),
        }
    }

    /// Quality label for display: a bitrate for audio, the resolution for video.
    pub fn quality_label(&self) -> &'static str {
        match self.output_format {
            OutputFormat::Audio => "320 kbps",
            OutputFormat::Video => self.video_quality.as_str(),
        }
    }
}
