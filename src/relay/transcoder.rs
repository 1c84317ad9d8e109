//! Transcoding process management
//!
//! One external transcoding process per relay instance. It reads the raw
//! published bytes on stdin and emits two RTP substreams, one per media
//! kind, to the instance's exclusive local ports. A feeder task copies
//! chunks from the stream subscriber queue into stdin; stderr is logged
//! line by line and never treated as a failure signal.
//!
//! Shutdown is structured: the cancellation token, not queue mechanics,
//! is what terminates the process. End of input closes stdin, gives the
//! process a grace period to exit on its own, then kills it (tolerating
//! the case where it already exited).

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::relay::ports::PortPair;

/// Command line for one transcoder invocation
#[derive(Debug, Clone)]
pub struct TranscoderSpec {
    /// Executable to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
}

impl TranscoderSpec {
    /// Production invocation: raw bytes on stdin, VP8 RTP to the video
    /// port and Opus RTP to the audio port.
    pub fn ffmpeg(config: &RelayConfig, ports: PortPair) -> Self {
        let ip = config.rtp_bind_ip;
        let args = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            "pipe:0".into(),
            // Video leg
            "-an".into(),
            "-vcodec".into(),
            "libvpx".into(),
            "-crf".into(),
            "10".into(),
            "-cpu-used".into(),
            "5".into(),
            "-b:v".into(),
            config.video_bitrate.clone(),
            "-maxrate".into(),
            config.video_max_bitrate.clone(),
            "-bufsize".into(),
            config.video_buffer_size.clone(),
            "-qmin".into(),
            "10".into(),
            "-qmax".into(),
            "42".into(),
            "-threads".into(),
            "4".into(),
            "-deadline".into(),
            "1".into(),
            "-error-resilient".into(),
            "1".into(),
            "-auto-alt-ref".into(),
            "1".into(),
            "-f".into(),
            "rtp".into(),
            format!("rtp://{}:{}", ip, ports.video),
            // Audio leg
            "-vn".into(),
            "-acodec".into(),
            "libopus".into(),
            "-cpu-used".into(),
            "5".into(),
            "-deadline".into(),
            "1".into(),
            "-qmin".into(),
            "10".into(),
            "-qmax".into(),
            "42".into(),
            "-error-resilient".into(),
            "1".into(),
            "-auto-alt-ref".into(),
            "1".into(),
            "-f".into(),
            "rtp".into(),
            format!("rtp://{}:{}", ip, ports.audio),
        ];

        Self {
            program: config.transcoder_program.clone(),
            args,
        }
    }
}

/// A running transcoding process bound to one stream
pub struct Transcoder {
    stream: String,
    child: Child,
    cancel: CancellationToken,
    grace: Duration,
}

impl Transcoder {
    /// Spawn the process and its feeder/stderr tasks
    ///
    /// The feeder copies chunks from `input` into the process's stdin
    /// until the queue closes or the token is cancelled, then closes the
    /// pipe. Stderr lines are logged at debug.
    pub fn spawn(
        spec: TranscoderSpec,
        stream: &str,
        input: mpsc::Receiver<Bytes>,
        cancel: CancellationToken,
        grace: Duration,
    ) -> Result<Transcoder> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::TranscoderSpawn)?;

        let stdin = child.stdin.take().ok_or(Error::TranscoderPipe("stdin"))?;
        let stderr = child.stderr.take().ok_or(Error::TranscoderPipe("stderr"))?;

        tracing::info!(
            stream = %stream,
            program = %spec.program,
            pid = child.id().unwrap_or(0),
            "Transcoder started"
        );

        // Feeder: subscriber queue -> process stdin
        let feed_cancel = cancel.clone();
        let feed_stream = stream.to_string();
        tokio::spawn(async move {
            let mut input = input;
            let mut stdin = stdin;
            loop {
                tokio::select! {
                    _ = feed_cancel.cancelled() => break,
                    chunk = input.recv() => match chunk {
                        Some(chunk) => {
                            if let Err(e) = stdin.write_all(&chunk).await {
                                // Process gone; its exit is handled by wait()
                                tracing::debug!(stream = %feed_stream, error = %e, "Transcoder stdin write failed");
                                break;
                            }
                        }
                        None => {
                            tracing::info!(stream = %feed_stream, "Source queue closed, ending transcoder input");
                            break;
                        }
                    },
                }
            }
            // Closing the pipe lets the process drain and exit on its own
            drop(stdin);
            feed_cancel.cancel();
        });

        // Stderr: log-only, never a failure signal
        let err_stream = stream.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(stream = %err_stream, "transcoder: {}", line);
            }
        });

        Ok(Transcoder {
            stream: stream.to_string(),
            child,
            cancel,
            grace,
        })
    }

    /// Token that terminates this process when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the process to end
    ///
    /// A voluntary exit resolves immediately. On cancellation the process
    /// gets the grace period to exit after its stdin closed, then is
    /// killed; a process that already exited is reaped either way.
    pub async fn wait(mut self) -> std::io::Result<ExitStatus> {
        let cancel = self.cancel.clone();

        tokio::select! {
            status = self.child.wait() => return status,
            _ = cancel.cancelled() => {}
        }

        // Cancelled: stdin is closed by the feeder, give the process the
        // grace period to drain and exit, then kill it.
        match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(stream = %self.stream, "Transcoder did not exit in grace period, killing");
                // start_kill tolerates a process that just exited
                let _ = self.child.start_kill();
                self.child.wait().await
            }
        }
    }
}
