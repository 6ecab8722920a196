//! Vertical composition of a whole clip.

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use clipcast_models::EncodingConfig;

use super::frames::{FfmpegFrameReader, FfmpegFrameWriter, FrameSink, FrameSource};
use super::geometry::{CanvasLayout, CropPlan, CropRect};
use super::planner::FrameReframer;
use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{intermediate_path, remove_file_best_effort, vertical_output_path};
use crate::probe::{probe_video, VideoInfo};

/// Converts a horizontal source into the stacked vertical format.
#[async_trait]
pub trait VerticalConverter: Send + Sync {
    /// Render `source` and return the path of the finished vertical file.
    async fn convert_to_vertical(&self, source: &Path) -> MediaResult<PathBuf>;
}

/// Summary of one rendered clip.
#[derive(Debug, Clone, Copy)]
pub struct RenderStats {
    pub plan: CropPlan,
    pub frames: u64,
}

/// FFmpeg-backed [`VerticalConverter`].
#[derive(Debug, Clone)]
pub struct VideoCompositor {
    reframer: Arc<FrameReframer>,
    layout: CanvasLayout,
    intermediate_encoding: EncodingConfig,
    final_encoding: EncodingConfig,
}

impl VideoCompositor {
    pub fn new(reframer: FrameReframer) -> Self {
        Self {
            reframer: Arc::new(reframer),
            layout: CanvasLayout::vertical(),
            intermediate_encoding: EncodingConfig::for_intermediate(),
            final_encoding: EncodingConfig::default(),
        }
    }

    async fn probe_source(&self, source: &Path) -> MediaResult<VideoInfo> {
        probe_video(source).await.map_err(|e| match e {
            MediaError::FileNotFound(path) => {
                MediaError::source_unavailable(format!("{} does not exist", path.display()))
            }
            MediaError::JsonParse(e) => MediaError::source_unavailable(format!("unreadable probe output: {}", e)),
            other => other,
        })
    }

    /// Combine the silent render with the source's audio track.
    async fn mux_audio(&self, silent: &Path, source: &Path, output: &Path, duration_secs: f64) -> MediaResult<()> {
        // `?` makes the audio map optional so sources without audio still mux
        let cmd = FfmpegCommand::new(silent, output)
            .add_input(source)
            .map("0:v:0")
            .map("1:a:0?")
            .output_args(self.final_encoding.to_ffmpeg_args())
            .faststart();

        let total_ms = (duration_secs * 1000.0) as i64;
        FfmpegRunner::new()
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    percent = progress.percentage(total_ms),
                    speed = progress.speed,
                    "Muxing audio"
                );
            })
            .await
    }
}

#[async_trait]
impl VerticalConverter for VideoCompositor {
    async fn convert_to_vertical(&self, source: &Path) -> MediaResult<PathBuf> {
        let started = Instant::now();
        let info = self.probe_source(source).await?;
        check_ffmpeg()?;

        let output = vertical_output_path(source);
        let silent = intermediate_path(source);

        info!(
            source = %source.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            has_audio = info.has_audio,
            "Converting clip to vertical"
        );

        let duration_secs = info.duration;
        let container_frames = info.frame_count;
        let stats = {
            let source = source.to_path_buf();
            let silent = silent.clone();
            let reframer = Arc::clone(&self.reframer);
            let layout = self.layout;
            let encoding = self.intermediate_encoding.clone();
            tokio::task::spawn_blocking(move || {
                render_silent(&source, &info, &reframer, layout, &silent, &encoding)
            })
            .await
            .map_err(|e| MediaError::internal(format!("render task failed: {}", e)))??
        };

        info!(
            frames = stats.frames,
            container_frames = ?container_frames,
            subject_source = stats.plan.source.as_str(),
            "Rendered silent vertical stream"
        );

        self.mux_audio(&silent, source, &output, duration_secs).await?;

        if !remove_file_best_effort(&silent).await {
            warn!(path = %silent.display(), "Intermediate file left behind");
        }

        info!(
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Vertical conversion complete"
        );
        Ok(output)
    }
}

/// Decode `source`, plan crops from its first frame and encode the stacked
/// canvas for every frame to `silent`.
fn render_silent(
    source: &Path,
    info: &VideoInfo,
    reframer: &FrameReframer,
    layout: CanvasLayout,
    silent: &Path,
    encoding: &EncodingConfig,
) -> MediaResult<RenderStats> {
    let mut reader = FfmpegFrameReader::open(source, info.width, info.height)?;

    let first = match reader.next_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            let _ = reader.close();
            return Err(MediaError::source_unavailable("source has no decodable frames"));
        }
        Err(e) => return Err(MediaError::source_unavailable(format!("cannot decode first frame: {}", e))),
    };

    let plan = reframer.compute_crop_plan(&first);

    let mut writer = FfmpegFrameWriter::create(silent, layout, &info.frame_rate, encoding)?;
    let frames = compose_frames(first, &mut reader, &mut writer, &plan, &layout)?;
    if reader.frames_read() != frames {
        warn!(decoded = reader.frames_read(), encoded = frames, "Frame count mismatch");
    }

    reader.close()?;
    writer.finish()?;

    Ok(RenderStats { plan, frames })
}

/// Write one canvas per source frame, starting with `first`.
///
/// Returns the number of frames written, which always equals the number of
/// frames consumed.
pub fn compose_frames(
    first: RgbImage,
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    plan: &CropPlan,
    layout: &CanvasLayout,
) -> MediaResult<u64> {
    let mut written = 0u64;
    let mut next = Some(first);

    while let Some(frame) = next {
        let canvas = compose_canvas(&frame, plan, layout)?;
        sink.write_frame(&canvas)?;
        written += 1;
        next = source.next_frame()?;
    }

    Ok(written)
}

/// Stack the subject band over the center band on a fresh canvas.
pub fn compose_canvas(frame: &RgbImage, plan: &CropPlan, layout: &CanvasLayout) -> MediaResult<RgbImage> {
    let (width, height) = frame.dimensions();
    for rect in [&plan.subject_band, &plan.center_band] {
        if !rect.fits_within(width, height) {
            return Err(MediaError::internal(format!(
                "crop {:?} outside {}x{} frame",
                rect, width, height
            )));
        }
    }

    let mut canvas = RgbImage::new(layout.width, layout.height);

    let top = crop_and_resize(frame, &plan.subject_band, layout.width, layout.subject_height);
    imageops::replace(&mut canvas, &top, 0, 0);

    let bottom = crop_and_resize(frame, &plan.center_band, layout.width, layout.center_height());
    imageops::replace(&mut canvas, &bottom, 0, i64::from(layout.subject_height));

    Ok(canvas)
}

fn crop_and_resize(frame: &RgbImage, rect: &CropRect, width: u32, height: u32) -> RgbImage {
    let region = imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image();
    imageops::resize(&region, width, height, FilterType::Triangle)
}
