//! Raw RGB frame streaming through FFmpeg pipes.
//!
//! Decoding and encoding run as child processes; frames cross the pipe as
//! packed `rgb24`. These types are blocking and meant to be driven from
//! `spawn_blocking`.

use image::RgbImage;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, warn};

use clipcast_models::EncodingConfig;

use super::geometry::CanvasLayout;
use crate::command::{is_progress_line, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// Sequential source of decoded frames.
pub trait FrameSource {
    /// Next frame in presentation order, or `None` at end of stream.
    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>>;
}

/// Sequential sink of rendered frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;
}

/// Decodes a video file into `rgb24` frames.
pub struct FfmpegFrameReader {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl FfmpegFrameReader {
    /// Start decoding `source`, whose display size is `width x height`.
    pub fn open(source: &Path, width: u32, height: u32) -> MediaResult<Self> {
        // Same stream `probe_video` describes; rotation is applied by the decoder
        let cmd = FfmpegCommand::new(source, "pipe:1").output_args([
            "-map",
            "0:v:0",
            "-an",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-vsync",
            "passthrough",
        ]);

        let mut child = spawn(&cmd, Stdio::null(), Stdio::piped())
            .map_err(|e| MediaError::source_unavailable(format!("cannot start decoder: {}", e)))?;
        let stdout = child.stdout.take();
        let stderr = collect_stderr(&mut child);

        debug!(source = %source.display(), width, height, "Opened frame decoder");
        Ok(Self {
            child,
            stdout,
            stderr,
            width,
            height,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Stop decoding and reap the child. Decoder failures surface here.
    pub fn close(mut self) -> MediaResult<()> {
        // Dropping stdout lets a still-running decoder exit on EPIPE
        self.stdout.take();
        let status = self.child.wait()?;
        let stderr = self.stderr.take().and_then(|h| h.join().ok()).unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "frame decoder failed",
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

impl FrameSource for FfmpegFrameReader {
    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let frame_len = self.width as usize * self.height as usize * 3;
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < frame_len {
            if filled > 0 {
                warn!(
                    bytes = filled,
                    expected = frame_len,
                    "Discarding truncated trailing frame"
                );
            }
            self.stdout = None;
            return Ok(None);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| MediaError::internal("frame buffer size mismatch"))
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Encodes `rgb24` canvas frames into a silent video file.
pub struct FfmpegFrameWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    layout: CanvasLayout,
    frames_written: u64,
}

impl FfmpegFrameWriter {
    /// Start an encoder writing `layout`-sized frames at `frame_rate`
    /// (an FFmpeg rate such as `"30/1"`) to `output`.
    pub fn create(
        output: &Path,
        layout: CanvasLayout,
        frame_rate: &str,
        encoding: &EncodingConfig,
    ) -> MediaResult<Self> {
        let cmd = FfmpegCommand::new("pipe:0", output)
            .input_arg("-f")
            .input_arg("rawvideo")
            .input_arg("-pix_fmt")
            .input_arg("rgb24")
            .input_arg("-s")
            .input_arg(format!("{}x{}", layout.width, layout.height))
            .input_arg("-r")
            .input_arg(frame_rate)
            .output_arg("-an")
            .output_args(encoding.video_args());

        let mut child = spawn(&cmd, Stdio::piped(), Stdio::null())?;
        let stdin = child.stdin.take();
        let stderr = collect_stderr(&mut child);

        debug!(output = %output.display(), frame_rate, "Opened frame encoder");
        Ok(Self {
            child,
            stdin,
            stderr,
            layout,
            frames_written: 0,
        })
    }

    /// Close the pipe and wait for the encoder to finalize the file.
    pub fn finish(mut self) -> MediaResult<u64> {
        self.stdin.take();
        let status = self.child.wait()?;
        let stderr = self.stderr.take().and_then(|h| h.join().ok()).unwrap_or_default();

        if status.success() {
            Ok(self.frames_written)
        } else {
            Err(MediaError::ffmpeg_failed(
                "frame encoder failed",
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

impl FrameSink for FfmpegFrameWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.dimensions() != (self.layout.width, self.layout.height) {
            return Err(MediaError::internal(format!(
                "canvas is {:?}, encoder expects {}x{}",
                frame.dimensions(),
                self.layout.width,
                self.layout.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("encoder input already closed"))?;

        if let Err(e) = stdin.write_all(frame.as_raw()) {
            // A broken pipe means the encoder died; its stderr has the reason
            self.stdin = None;
            let _ = self.child.wait();
            let stderr = self.stderr.take().and_then(|h| h.join().ok()).unwrap_or_default();
            return Err(MediaError::ffmpeg_failed(
                format!("writing frame {} failed: {}", self.frames_written, e),
                (!stderr.is_empty()).then_some(stderr),
                None,
            ));
        }

        self.frames_written += 1;
        Ok(())
    }
}

impl Drop for FfmpegFrameWriter {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn spawn(cmd: &FfmpegCommand, stdin: Stdio, stdout: Stdio) -> MediaResult<Child> {
    crate::command::check_ffmpeg()?;
    let args = cmd.build_args();
    debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

    Ok(Command::new("ffmpeg")
        .args(&args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::piped())
        .spawn()?)
}

/// Drain stderr on a thread so the child never blocks on a full pipe.
/// Progress lines are dropped; the last error lines are kept.
fn collect_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut raw = Vec::new();
        let _ = stderr.read_to_end(&mut raw);
        let text = String::from_utf8_lossy(&raw);
        let lines: Vec<&str> = text
            .lines()
            .filter(|l| !l.trim().is_empty() && !is_progress_line(l))
            .collect();
        lines[lines.len().saturating_sub(20)..].join("\n")
    }))
}
