//! Media processing for the clipcast pipeline.
//!
//! This crate provides:
//! - FFmpeg command building and execution
//! - FFprobe video information
//! - Clip download via yt-dlp
//! - Face-anchored vertical reframing

pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod reframe;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::{clip_filename, sanitize_filename, Fetcher, YtDlpFetcher};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{intermediate_path, remove_file_best_effort, remove_files_best_effort, vertical_output_path};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use reframe::{FaceDetector, FrameReframer, SubjectLocator, VerticalConverter, VideoCompositor};
