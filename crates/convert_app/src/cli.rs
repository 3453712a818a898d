use std::path::PathBuf;

use clap::Parser;
use convert_core::{ConversionRequest, OutputFormat, VideoQuality};
use engine_logging::LogDestination;

/// Convert a video link into an audio or video file via the conversion service.
#[derive(Debug, Parser)]
#[command(name = "convert_app", version, about)]
pub struct Cli {
    /// Link to the source video.
    pub url: String,

    /// `audio` or `video`.
    #[arg(short, long, default_value = "audio")]
    pub format: OutputFormat,

    /// Video resolution: 720p, 1080p, 1440p or 2160p. Ignored for audio.
    #[arg(short, long, default_value = "1080p")]
    pub quality: VideoQuality,

    /// Base URL of the conversion service; overrides the settings file.
    #[arg(long)]
    pub server: Option<String>,

    /// Directory the finished file is saved into; overrides the settings file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// RON settings file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where logs go: terminal, file or both.
    #[arg(long, default_value = "terminal")]
    pub log: LogDestination,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn request(&self) -> ConversionRequest {
        ConversionRequest::new(self.url.clone(), self.format, self.quality)
    }
}
