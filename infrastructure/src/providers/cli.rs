//! Subprocess provider adapter
//!
//! [`CliProvider`] drives one AI CLI child process over piped stdio. The
//! wire protocol is line-delimited JSON in both directions:
//!
//! - outgoing (stdin): `{"type": "system", "content": ...}` once at spawn,
//!   then `{"type": "user", "content": ...}` per send;
//! - incoming (stdout): `{"type": "delta", "content": ...}` streaming
//!   chunks, `{"type": "message", ...}` complete messages, `{"type":
//!   "turn_end"}` closing each reply (optionally carrying a `structured`
//!   payload), and `{"type": "error", "message": ...}`.
//!
//! A background reader task owns the stdout half and forwards classified
//! events over an unbounded channel. `send`/`receive` form an explicit
//! request/response pair over a two-state idle/awaiting machine: a `send`
//! while a reply is outstanding is rejected as [`ProviderError::Busy`], and
//! any `receive` failure resets the machine so a retried send is accepted.
//!
//! Incoming text extraction is deliberately tolerant: different CLIs nest
//! reply text differently, and a mis-shapen event should degrade to "no
//! text", never kill the session.

use crate::providers::command::ProviderCommand;
use async_trait::async_trait;
use prdgen_application::ports::provider::{AiProvider, ProviderError, ProviderReply};
use prdgen_domain::ProviderKind;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// How long a child gets to exit after stdin closes before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Classification of one incoming stdout event.
#[derive(Debug)]
pub(crate) enum ProviderEvent {
    /// A streaming text chunk.
    Delta(String),
    /// A complete message (used by CLIs that do not stream).
    Message(String),
    /// End of the current reply, optionally with a pre-extracted payload.
    TurnEnd { structured: Option<serde_json::Value> },
    /// The CLI reported an error for this turn.
    Error(String),
}

/// Classify one parsed stdout line. Pure function, called once per line in
/// the reader loop; events that carry no usable information map to `None`.
pub(crate) fn classify_event(json: &serde_json::Value) -> Option<ProviderEvent> {
    let event_type = json.get("type").and_then(|t| t.as_str())?;

    match event_type {
        "delta" => extract_event_text(json).map(ProviderEvent::Delta),
        "message" => extract_event_text(json).map(ProviderEvent::Message),
        "turn_end" => Some(ProviderEvent::TurnEnd {
            structured: json.get("structured").cloned(),
        }),
        "error" => {
            let message = json
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown provider error")
                .to_string();
            Some(ProviderEvent::Error(message))
        }
        other => {
            trace!("ignoring provider event '{}'", other);
            None
        }
    }
}

/// Pull reply text out of an event, tolerating the shapes the supported
/// CLIs use:
///
/// - `{"content": "text"}`: plain string
/// - `{"content": [{"type": "text", "text": "..."}]}`: content blocks
/// - `{"message": {"content": "text"}}`: nested message object
/// - `{"text": "..."}`: bare text field
pub(crate) fn extract_event_text(event: &serde_json::Value) -> Option<String> {
    if let Some(s) = event.get("content").and_then(|c| c.as_str())
        && !s.is_empty()
    {
        return Some(s.to_string());
    }

    if let Some(arr) = event.get("content").and_then(|c| c.as_array()) {
        let mut text = String::new();
        for block in arr {
            if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(t);
            }
        }
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Some(s) = event
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        && !s.is_empty()
    {
        return Some(s.to_string());
    }

    if let Some(s) = event.get("text").and_then(|t| t.as_str())
        && !s.is_empty()
    {
        return Some(s.to_string());
    }

    None
}

/// Drives one provider CLI child process. See the module docs for the
/// protocol and state machine.
pub struct CliProvider {
    command: ProviderCommand,
    receive_timeout: Duration,
    cancel: CancellationToken,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    events: Option<mpsc::UnboundedReceiver<ProviderEvent>>,
    reader_handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    awaiting: bool,
    version: OnceLock<Option<String>>,
}

impl CliProvider {
    /// Adapter for a built-in provider profile.
    pub fn new(kind: ProviderKind, receive_timeout: Duration) -> Self {
        Self::with_command(ProviderCommand::for_kind(kind), receive_timeout)
    }

    /// Adapter for a custom command profile (useful for testing).
    pub fn with_command(command: ProviderCommand, receive_timeout: Duration) -> Self {
        Self {
            command,
            receive_timeout,
            cancel: CancellationToken::new(),
            child: None,
            stdin: None,
            events: None,
            reader_handle: None,
            running: Arc::new(AtomicBool::new(false)),
            awaiting: false,
            version: OnceLock::new(),
        }
    }

    /// Share the session's cancellation token so an in-flight receive can
    /// be aborted from outside.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Background reader loop: single owner of the child's stdout.
    ///
    /// Lines that are not JSON (startup banners, stray logging) are skipped.
    /// When the stream ends the sender drops, receivers observe `None`, and
    /// `running` flips so [`is_running`](AiProvider::is_running) reflects it.
    async fn reader_loop(
        stdout: ChildStdout,
        tx: mpsc::UnboundedSender<ProviderEvent>,
        running: Arc<AtomicBool>,
    ) {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let json: serde_json::Value = match serde_json::from_str(line) {
                        Ok(v) => v,
                        Err(_) => {
                            trace!("skipping non-JSON provider output: {}", line);
                            continue;
                        }
                    };
                    if let Some(event) = classify_event(&json)
                        && tx.send(event).is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("provider stdout closed");
                    break;
                }
                Err(e) => {
                    warn!("provider stdout read error: {}", e);
                    break;
                }
            }
        }
        running.store(false, Ordering::SeqCst);
    }

    async fn write_frame(&mut self, frame: serde_json::Value) -> Result<(), ProviderError> {
        let stdin = self.stdin.as_mut().ok_or(ProviderError::NotSpawned)?;
        let mut line = frame.to_string();
        line.push('\n');
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            return Err(self.exit_error(e));
        }
        if let Err(e) = stdin.flush().await {
            return Err(self.exit_error(e));
        }
        Ok(())
    }

    /// Turn a pipe error into the sharper "process died" error when the
    /// child has in fact exited.
    fn exit_error(&mut self, e: std::io::Error) -> ProviderError {
        if let Some(child) = self.child.as_mut()
            && let Ok(Some(status)) = child.try_wait()
        {
            return ProviderError::ProcessExited {
                code: status.code(),
            };
        }
        ProviderError::Io(e)
    }

    /// Accumulate events until `turn_end`. Runs inside the receive timeout;
    /// the receiver stays in `self` so a timed-out future leaves the
    /// adapter in a retryable state.
    async fn collect_reply(&mut self) -> Result<ProviderReply, ProviderError> {
        let CliProvider {
            events,
            child,
            cancel,
            ..
        } = self;
        let rx = events.as_mut().ok_or(ProviderError::NotSpawned)?;

        let mut content = String::new();
        let mut delta_bytes = 0usize;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                event = rx.recv() => event,
            };

            match event {
                None => {
                    let code = child
                        .as_mut()
                        .and_then(|c| c.try_wait().ok())
                        .flatten()
                        .map(|status| status.code());
                    return Err(match code {
                        Some(code) => ProviderError::ProcessExited { code },
                        None => ProviderError::TransportClosed,
                    });
                }
                Some(ProviderEvent::Delta(chunk)) => {
                    delta_bytes += chunk.len();
                    content.push_str(&chunk);
                }
                Some(ProviderEvent::Message(text)) => {
                    // Complete-message fallback for CLIs that did not stream
                    // deltas for this turn.
                    if delta_bytes == 0 {
                        content.push_str(&text);
                    }
                }
                Some(ProviderEvent::TurnEnd { structured }) => {
                    debug!("provider turn complete ({} bytes)", content.len());
                    return Ok(ProviderReply {
                        content,
                        is_complete: true,
                        structured,
                    });
                }
                Some(ProviderEvent::Error(message)) => {
                    return Err(ProviderError::Remote(message));
                }
            }
        }
    }
}

#[async_trait]
impl AiProvider for CliProvider {
    fn kind(&self) -> ProviderKind {
        self.command.kind()
    }

    fn is_available(&self) -> bool {
        self.command.is_available()
    }

    fn version(&self) -> Option<String> {
        self.version
            .get_or_init(|| self.command.probe_version())
            .clone()
    }

    async fn spawn(&mut self, system_prompt: &str) -> Result<(), ProviderError> {
        if self.child.is_some() {
            return Err(ProviderError::Protocol("provider already spawned".into()));
        }
        if !self.command.is_available() {
            return Err(ProviderError::NotAvailable(
                self.command.binary().to_string(),
            ));
        }

        debug!(
            "spawning {} {}",
            self.command.binary(),
            self.command.launch_args().join(" ")
        );

        let mut cmd = Command::new(self.command.binary());
        cmd.args(self.command.launch_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(ProviderError::SpawnFailed)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            ProviderError::SpawnFailed(std::io::Error::other("failed to capture stdout"))
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            ProviderError::SpawnFailed(std::io::Error::other("failed to capture stdin"))
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let reader_handle = tokio::spawn(Self::reader_loop(stdout, tx, Arc::clone(&running)));

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.events = Some(rx);
        self.reader_handle = Some(reader_handle);
        self.running = running;
        self.awaiting = false;

        self.write_frame(serde_json::json!({
            "type": "system",
            "content": system_prompt,
        }))
        .await
    }

    async fn send(&mut self, message: &str) -> Result<(), ProviderError> {
        if self.awaiting {
            return Err(ProviderError::Busy);
        }
        self.write_frame(serde_json::json!({
            "type": "user",
            "content": message,
        }))
        .await?;
        self.awaiting = true;
        Ok(())
    }

    async fn receive(&mut self) -> Result<ProviderReply, ProviderError> {
        if !self.awaiting {
            return Err(ProviderError::Protocol(
                "receive without a pending send".into(),
            ));
        }

        let timeout = self.receive_timeout;
        let result = tokio::time::timeout(timeout, self.collect_reply()).await;

        // Any outcome resets the state machine so a retried send is not
        // rejected as busy.
        self.awaiting = false;

        match result {
            Ok(reply) => reply,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    }

    fn is_running(&self) -> bool {
        self.child.is_some() && self.running.load(Ordering::SeqCst)
    }

    async fn cleanup(&mut self) -> Result<(), ProviderError> {
        self.awaiting = false;

        // Closing stdin is the graceful signal: a well-behaved CLI exits on
        // EOF. Only after the grace period do we kill.
        self.stdin.take();

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!("provider exited with {}", status),
                Ok(Err(e)) => warn!("error waiting for provider exit: {}", e),
                Err(_) => {
                    warn!("provider did not exit within grace period, killing");
                    let _ = child.kill().await;
                }
            }
        }

        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
        self.events.take();
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for CliProvider {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            debug!("CliProvider dropping, killing provider child process");
            let _ = child.start_kill();
        }
    }
}
