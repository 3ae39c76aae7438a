//! External transcoder (ffmpeg / ffprobe)
//!
//! Every invocation goes through [`run_tool`], which owns the timeout,
//! stdout/stderr capture and the kill of a process that overruns its deadline.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, error, warn};

use crate::config::{OutputConfig, OutputFormat, TranscoderConfig};
use crate::errors::{PipelineError, PipelineResult};

/// Loudness normalization filter applied when `normalize_levels` is set
pub const NORMALIZE_FILTER: &str = "dynaudnorm=p=0.9:m=100:s=12:g=9";

static MAX_VOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"max_volume:\s*(-?\d+(?:\.\d+)?)\s*dB").unwrap());
static MEAN_VOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mean_volume:\s*(-?\d+(?:\.\d+)?)\s*dB").unwrap());

/// Volume statistics from an analysis pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub peak_db: Option<f64>,
    pub mean_db: Option<f64>,
}

impl VolumeStats {
    pub fn is_complete(&self) -> bool {
        self.peak_db.is_some() && self.mean_db.is_some()
    }
}

/// Parse `max_volume: X dB` / `mean_volume: Y dB` from a volumedetect report
pub fn parse_volume_report(report: &str) -> VolumeStats {
    let capture = |re: &Regex| {
        re.captures(report)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };
    VolumeStats {
        peak_db: capture(&MAX_VOLUME),
        mean_db: capture(&MEAN_VOLUME),
    }
}

/// Parse the bare duration printed by ffprobe
pub fn parse_probe_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Captured output of a finished tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Append everything `pipe` yields to `buf`
///
/// Each chunk lands in `buf` as soon as it is read, so a caller that stops
/// waiting still sees what arrived before.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let read = pipe.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..read]);
    }
}

/// Run `program` with `args`, killing it once `timeout` elapses
///
/// A spawn failure is [`PipelineError::TranscoderUnavailable`], a non-zero
/// exit is [`PipelineError::TranscoderFailed`] with both streams attached and
/// an overrun is [`PipelineError::TranscoderTimeout`] carrying whatever the
/// tool wrote before it was killed.
pub async fn run_tool(
    program: &Path,
    args: &[OsString],
    timeout: Duration,
    operation: &str,
) -> PipelineResult<ToolOutput> {
    debug!(
        program = %program.display(),
        args = ?args,
        operation = operation,
        "Running external tool"
    );

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            PipelineError::TranscoderUnavailable(format!(
                "Failed to start {}: {e}",
                program.display()
            ))
        })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let finished = tokio::time::timeout(timeout, async {
        let (stdout_read, stderr_read, status) = tokio::join!(
            drain(stdout_pipe, &mut stdout_buf),
            drain(stderr_pipe, &mut stderr_buf),
            child.wait()
        );
        stdout_read?;
        stderr_read?;
        status
    })
    .await;

    let status = match finished {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            return Err(PipelineError::TranscoderFailed {
                operation: operation.to_string(),
                exit_code: None,
                stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
                stderr: e.to_string(),
            });
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(operation = operation, error = %e, "Failed to kill timed out tool");
            }
            let stdout = String::from_utf8_lossy(&stdout_buf).into_owned();
            let stderr = String::from_utf8_lossy(&stderr_buf).into_owned();
            error!(
                operation = operation,
                timeout_ms = timeout.as_millis() as u64,
                stderr = %stderr.trim(),
                "External tool timed out"
            );
            return Err(PipelineError::TranscoderTimeout {
                operation: operation.to_string(),
                timeout_ms: timeout.as_millis() as u64,
                stdout,
                stderr,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&stdout_buf).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_buf).into_owned();

    if !status.success() {
        error!(
            operation = operation,
            exit_code = ?status.code(),
            stderr = %stderr.trim(),
            "External tool failed"
        );
        return Err(PipelineError::TranscoderFailed {
            operation: operation.to_string(),
            exit_code: status.code(),
            stdout,
            stderr,
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Audio operations the merge stage needs
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// First line of the version banner; fails when the tool is absent
    async fn version(&self) -> PipelineResult<String>;

    /// Write `duration_secs` of silence to `output`
    async fn generate_silence(&self, duration_secs: f64, output: &Path) -> PipelineResult<()>;

    /// Concatenate the files named in a concat list with stream copy
    async fn concat(&self, list_file: &Path, output: &Path) -> PipelineResult<()>;

    /// Re-encode `input` through the loudness normalization filter
    async fn normalize(&self, input: &Path, output: &Path) -> PipelineResult<()>;

    async fn probe_duration(&self, input: &Path) -> PipelineResult<f64>;

    async fn analyze_volume(&self, input: &Path) -> PipelineResult<VolumeStats>;
}

/// [`Transcoder`] backed by the ffmpeg and ffprobe binaries
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
    overwrite: bool,
    output: OutputConfig,
}

impl FfmpegTranscoder {
    pub fn new(transcoder: &TranscoderConfig, output: &OutputConfig) -> Self {
        Self {
            ffmpeg: transcoder.path.clone(),
            ffprobe: transcoder.probe_program(),
            timeout: transcoder.timeout(),
            overwrite: transcoder.overwrite,
            output: output.clone(),
        }
    }

    fn overwrite_flag(&self) -> OsString {
        let flag = if self.overwrite { "-y" } else { "-n" };
        flag.into()
    }

    /// Codec, bitrate, rate and channel arguments of the configured output
    fn encoding_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-ar".into(),
            self.output.sample_rate.to_string().into(),
            "-ac".into(),
            self.output.channels.count().to_string().into(),
            "-c:a".into(),
            self.output.format.codec().into(),
        ];
        if self.output.format != OutputFormat::Wav {
            args.push("-b:a".into());
            args.push(self.output.bitrate.clone().into());
        }
        args
    }

    async fn ffmpeg(&self, args: Vec<OsString>, operation: &str) -> PipelineResult<ToolOutput> {
        run_tool(&self.ffmpeg, &args, self.timeout, operation).await
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn version(&self) -> PipelineResult<String> {
        let output = self.ffmpeg(vec!["-version".into()], "version").await?;
        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    async fn generate_silence(&self, duration_secs: f64, output: &Path) -> PipelineResult<()> {
        let source = format!(
            "anullsrc=r={}:cl={}",
            self.output.sample_rate,
            self.output.channels.as_str()
        );
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            self.overwrite_flag(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            source.into(),
            "-t".into(),
            format!("{duration_secs:.3}").into(),
        ];
        args.extend(self.encoding_args());
        args.push(output.as_os_str().to_os_string());

        self.ffmpeg(args, "silence").await.map(|_| ())
    }

    async fn concat(&self, list_file: &Path, output: &Path) -> PipelineResult<()> {
        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            self.overwrite_flag(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_file.as_os_str().to_os_string(),
            "-c".into(),
            "copy".into(),
            output.as_os_str().to_os_string(),
        ];
        self.ffmpeg(args, "concat").await.map(|_| ())
    }

    async fn normalize(&self, input: &Path, output: &Path) -> PipelineResult<()> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            self.overwrite_flag(),
            "-i".into(),
            input.as_os_str().to_os_string(),
            "-af".into(),
            NORMALIZE_FILTER.into(),
        ];
        args.extend(self.encoding_args());
        args.push(output.as_os_str().to_os_string());

        self.ffmpeg(args, "normalize").await.map(|_| ())
    }

    async fn probe_duration(&self, input: &Path) -> PipelineResult<f64> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            input.as_os_str().to_os_string(),
        ];
        let output = run_tool(&self.ffprobe, &args, self.timeout, "probe").await?;
        parse_probe_duration(&output.stdout).ok_or_else(|| PipelineError::TranscoderOutput {
            operation: "probe".to_string(),
            message: format!("unexpected duration output '{}'", output.stdout.trim()),
        })
    }

    async fn analyze_volume(&self, input: &Path) -> PipelineResult<VolumeStats> {
        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostats".into(),
            "-i".into(),
            input.as_os_str().to_os_string(),
            "-af".into(),
            "volumedetect".into(),
            "-f".into(),
            "null".into(),
            "-".into(),
        ];
        let output = self.ffmpeg(args, "analyze").await?;
        // volumedetect reports on stderr
        Ok(parse_volume_report(&output.stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelLayout;
    use crate::errors::ErrorKind;

    #[test]
    fn test_parse_volume_report() {
        let report = "\
[Parsed_volumedetect_0 @ 0x55d] n_samples: 132300
[Parsed_volumedetect_0 @ 0x55d] mean_volume: -23.4 dB
[Parsed_volumedetect_0 @ 0x55d] max_volume: -1.0 dB
[Parsed_volumedetect_0 @ 0x55d] histogram_1db: 12";
        let stats = parse_volume_report(report);
        assert_eq!(stats.peak_db, Some(-1.0));
        assert_eq!(stats.mean_db, Some(-23.4));
        assert!(stats.is_complete());
    }

    #[test]
    fn test_parse_volume_report_unrecognized() {
        let stats = parse_volume_report("max_volume: -inf dB");
        assert_eq!(stats, VolumeStats::default());
        assert!(!stats.is_complete());
    }

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("12.345000\n"), Some(12.345));
        assert_eq!(parse_probe_duration("\n  3.5\n"), Some(3.5));
        assert_eq!(parse_probe_duration("N/A"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[test]
    fn test_encoding_args_follow_output_config() {
        let output = OutputConfig {
            channels: ChannelLayout::Stereo,
            sample_rate: 44100,
            bitrate: "64k".to_string(),
            ..Default::default()
        };
        let transcoder = FfmpegTranscoder::new(&TranscoderConfig::default(), &output);
        let args: Vec<String> = transcoder
            .encoding_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["-ar", "44100", "-ac", "2", "-c:a", "libmp3lame", "-b:a", "64k"]
        );

        let wav = OutputConfig {
            format: OutputFormat::Wav,
            ..Default::default()
        };
        let transcoder = FfmpegTranscoder::new(&TranscoderConfig::default(), &wav);
        assert!(!transcoder.encoding_args().contains(&OsString::from("-b:a")));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let err = run_tool(
            Path::new("/nonexistent/bin/ffmpeg"),
            &["-version".into()],
            Duration::from_secs(5),
            "version",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::TranscoderUnavailable(_)));
        assert_eq!(err.kind(), ErrorKind::Transcoder);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_captures_streams() {
        let err = run_tool(
            Path::new("sh"),
            &["-c".into(), "echo out; echo broken >&2; exit 3".into()],
            Duration::from_secs(5),
            "concat",
        )
        .await
        .unwrap_err();
        match err {
            PipelineError::TranscoderFailed {
                operation,
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(operation, "concat");
                assert_eq!(exit_code, Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = std::time::Instant::now();
        let err = run_tool(
            Path::new("sleep"),
            &["5".into()],
            Duration::from_millis(100),
            "normalize",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::TranscoderTimeout { timeout_ms: 100, .. }
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_keeps_output_written_before_the_deadline() {
        let started = std::time::Instant::now();
        let err = run_tool(
            Path::new("sh"),
            &[
                "-c".into(),
                "echo started; echo 'Press [q] to stop' >&2; exec sleep 5".into(),
            ],
            Duration::from_millis(500),
            "concat",
        )
        .await
        .unwrap_err();
        match err {
            PipelineError::TranscoderTimeout {
                operation,
                timeout_ms,
                stdout,
                stderr,
            } => {
                assert_eq!(operation, "concat");
                assert_eq!(timeout_ms, 500);
                assert_eq!(stdout.trim(), "started");
                assert_eq!(stderr.trim(), "Press [q] to stop");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
