use super::{EncodeError, Encoder, ProgressEvent};
use crate::modules::transcode::model::TargetProfile;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Invokes the system `ffmpeg` binary, one long-lived subprocess per encode.
///
/// The subprocess is told to write machine-readable progress blocks to stdout
/// (`-progress pipe:1`); each `out_time_us` line becomes one [`ProgressEvent`]
/// against the duration probed from the source up front.
#[derive(Clone)]
pub struct FfmpegEncoder {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    async fn probe_duration(&self, source: &Path) -> Result<f64, EncodeError> {
        let output = Command::new(&self.ffprobe_bin)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("json")
            .arg(source)
            .output()
            .await
            .map_err(|e| EncodeError::Spawn {
                bin: self.ffprobe_bin.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::Probe(stderr.trim().to_string()));
        }

        let v: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| EncodeError::Probe(e.to_string()))?;

        v["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| EncodeError::Probe("no duration in probe output".to_string()))
    }

    fn build_args(source: &Path, output: &Path, profile: &TargetProfile) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-nostats".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", profile.width, profile.height),
            "-c:a".to_string(),
            "aac".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        source: &Path,
        output: &Path,
        profile: &TargetProfile,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<u64, EncodeError> {
        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(EncodeError::SourceUnreadable(source.display().to_string())),
        }

        let duration = self.probe_duration(source).await?;

        let args = Self::build_args(source, output, profile);
        debug!("Running {} {}", self.ffmpeg_bin, args.join(" "));

        let mut child = Command::new(&self.ffmpeg_bin)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncodeError::Spawn {
                bin: self.ffmpeg_bin.clone(),
                source: e,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EncodeError::Io(std::io::Error::other("encoder stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EncodeError::Io(std::io::Error::other("encoder stderr not captured")))?;

        // Drain stderr concurrently so a chatty encoder never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut fps = None;
        while let Ok(Some(line)) = lines.next_line().await {
            match line.split_once('=') {
                Some(("fps", v)) => fps = v.trim().parse::<f32>().ok(),
                Some(("out_time_us", v)) => {
                    if let Some(percent) = percent_at(v.trim(), duration) {
                        let _ = progress.send(ProgressEvent { percent, fps }).await;
                    }
                }
                _ => {}
            }
        }

        let status = child.wait().await?;
        let detail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let _ = tokio::fs::remove_file(output).await;
            return Err(EncodeError::Failed {
                status: status.code().unwrap_or(-1),
                detail: detail.trim().to_string(),
            });
        }

        let written = tokio::fs::metadata(output).await?.len();
        Ok(written)
    }
}

/// `out_time_us` is microseconds of output written so far; the percentage is
/// taken against the probed source duration. ffmpeg emits a negative sentinel
/// before the first frame, which carries no information.
fn percent_at(out_time_us: &str, duration_secs: f64) -> Option<f32> {
    if duration_secs <= 0.0 {
        return None;
    }
    let us = out_time_us.parse::<i64>().ok()?;
    if us < 0 {
        return None;
    }
    Some(((us as f64 / 1_000_000.0) / duration_secs * 100.0) as f32)
}
