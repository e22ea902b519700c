//! Delegate backed by a child process speaking JSON lines on stdin/stdout.
//!
//! Writes go through a writer thread and replies through a reader thread, so
//! a call waits on channels only and the whole round trip shares one deadline.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::protocol::{decode_incoming, encode_request, Incoming, Request};
use super::{ColorScheme, DelegateChannel, DelegateEvent, DelegateLauncher};
use crate::config::DelegateConfig;
use crate::error::{PreviewError, PreviewResult};

/// Spawns [`ProcessDelegate`]s from a fixed command line.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: Vec<String>,
    timeout: Duration,
}

impl ProcessLauncher {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_config(config: &DelegateConfig) -> Self {
        Self::new(config.command.clone(), config.timeout())
    }
}

impl DelegateLauncher for ProcessLauncher {
    fn launch(&self) -> PreviewResult<Box<dyn DelegateChannel>> {
        let delegate = ProcessDelegate::spawn(&self.command, self.timeout)?;
        Ok(Box::new(delegate))
    }
}

/// Reply to one call, as routed by the reader thread.
struct Reply {
    id: u64,
    error: Option<String>,
}

/// One encoded request handed to the writer thread.
struct Outgoing {
    id: u64,
    line: String,
}

/// Outcome of writing one request, reported by the writer thread.
struct Written {
    id: u64,
    result: io::Result<()>,
}

/// A running delegate process and its control channel.
pub struct ProcessDelegate {
    child: Child,
    writer: Option<Sender<Outgoing>>,
    written: Receiver<Written>,
    replies: Receiver<Reply>,
    events: Receiver<DelegateEvent>,
    next_id: u64,
    timeout: Duration,
    terminated: bool,
}

impl ProcessDelegate {
    /// Start `command` and attach to its stdin/stdout.
    pub fn spawn(command: &[String], timeout: Duration) -> PreviewResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PreviewError::DelegateSpawn("empty command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PreviewError::DelegateSpawn(format!("{}: {}", program, e)))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            PreviewError::DelegateSpawn(format!("{}: stdin not captured", program))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            PreviewError::DelegateSpawn(format!("{}: stdout not captured", program))
        })?;

        let (reply_tx, replies) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();
        let (writer, outgoing) = mpsc::channel();
        let (written_tx, written) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("delegate-reader".to_string())
            .spawn(move || read_frames(stdout, reply_tx, event_tx))
            .and_then(|_| {
                thread::Builder::new()
                    .name("delegate-writer".to_string())
                    .spawn(move || write_frames(stdin, outgoing, written_tx))
            });
        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PreviewError::DelegateSpawn(e.to_string()));
        }

        info!(program = %program, pid = child.id(), "delegate started");

        Ok(Self {
            child,
            writer: Some(writer),
            written,
            replies,
            events,
            next_id: 0,
            timeout,
            terminated: false,
        })
    }

    /// OS process id of the delegate.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send one request and block until its reply or the timeout.
    ///
    /// The timeout covers the write as well as the reply: a delegate that
    /// stops reading its input fails the call after the same bound.
    fn call(&mut self, request: Request) -> PreviewResult<()> {
        let method = request.method();
        let deadline = Instant::now() + self.timeout;
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| PreviewError::DelegateClosed("delegate is not running".to_string()))?;

        self.next_id += 1;
        let id = self.next_id;
        let line = encode_request(id, &request)?;
        writer
            .send(Outgoing { id, line })
            .map_err(|_| PreviewError::DelegateClosed("delegate input closed".to_string()))?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.written.recv_timeout(remaining) {
                Ok(written) if written.id == id => {
                    written.result?;
                    break;
                }
                Ok(stale) => debug!(id = stale.id, "discarding stale write report"),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.unresponsive(method));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PreviewError::DelegateClosed(
                        "delegate input closed".to_string(),
                    ));
                }
            }
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok(reply) if reply.id == id => {
                    return match reply.error {
                        None => Ok(()),
                        Some(message) => Err(PreviewError::DelegateFailed {
                            method: method.to_string(),
                            message,
                        }),
                    };
                }
                Ok(stale) => debug!(id = stale.id, "discarding stale delegate reply"),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.unresponsive(method));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PreviewError::DelegateClosed(
                        "delegate closed its output".to_string(),
                    ));
                }
            }
        }
    }

    fn unresponsive(&self, method: &str) -> PreviewError {
        PreviewError::DelegateUnresponsive {
            method: method.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

impl DelegateChannel for ProcessDelegate {
    fn update_ui(&mut self, markup: &str, target_id: &str) -> PreviewResult<()> {
        self.call(Request::UpdateUi {
            markup: markup.to_string(),
            target_id: target_id.to_string(),
        })
    }

    fn update_css(&mut self, css: &str) -> PreviewResult<()> {
        self.call(Request::UpdateCss {
            css: css.to_string(),
        })
    }

    fn close_window(&mut self) -> PreviewResult<()> {
        self.call(Request::CloseWindow)
    }

    fn set_color_scheme(&mut self, scheme: ColorScheme) -> PreviewResult<()> {
        self.call(Request::SetColorScheme { scheme })
    }

    fn poll_event(&mut self) -> Option<DelegateEvent> {
        self.events.try_recv().ok()
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        // the writer thread exits once its queue closes or its pipe breaks
        self.writer = None;
        // kill fails when the process already exited; wait still reaps it
        let _ = self.child.kill();
        let _ = self.child.wait();
        info!(pid = self.child.id(), "delegate terminated");
    }
}

impl Drop for ProcessDelegate {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn write_frames(mut stdin: ChildStdin, outgoing: Receiver<Outgoing>, written: Sender<Written>) {
    for Outgoing { id, line } in outgoing {
        let result = stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.flush());
        let failed = result.is_err();
        if written.send(Written { id, result }).is_err() || failed {
            break;
        }
    }
    debug!("delegate input closed");
}

fn read_frames(stdout: ChildStdout, replies: Sender<Reply>, events: Sender<DelegateEvent>) {
    for line in BufReader::new(stdout).lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_incoming(&line) {
            Ok(Incoming::Response { id, error }) => {
                if replies.send(Reply { id, error }).is_err() {
                    break;
                }
            }
            Ok(Incoming::WindowOpen { open }) => {
                if events.send(DelegateEvent::WindowState { open }).is_err() {
                    break;
                }
            }
            Err(err) => debug!(error = %err, line = %line, "ignoring delegate output"),
        }
    }
    debug!("delegate output closed");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn call_returns_when_reply_arrives() {
        let mut delegate = ProcessDelegate::spawn(
            &sh(r#"read line; echo '{"type":"response","id":1}'; sleep 5"#),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(delegate.update_css(".a {}").is_ok());
        delegate.terminate();
    }

    #[test]
    fn remote_error_is_reported() {
        let mut delegate = ProcessDelegate::spawn(
            &sh(r#"read line; echo '{"type":"response","id":1,"error":"bad markup"}'; sleep 5"#),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = delegate.update_ui("<interface/>", "t").unwrap_err();
        assert_eq!(
            err,
            PreviewError::DelegateFailed {
                method: "update_ui".to_string(),
                message: "bad markup".to_string()
            }
        );
    }

    #[test]
    fn silent_delegate_times_out() {
        let mut delegate =
            ProcessDelegate::spawn(&sh("sleep 5"), Duration::from_millis(100)).unwrap();
        let err = delegate.close_window().unwrap_err();
        assert!(matches!(
            err,
            PreviewError::DelegateUnresponsive { ref method, timeout_ms: 100 } if method == "close_window"
        ));
        delegate.terminate();
        delegate.terminate();
    }

    #[test]
    fn delegate_that_stops_reading_times_out_on_large_payloads() {
        let mut delegate =
            ProcessDelegate::spawn(&sh("exec sleep 5"), Duration::from_millis(100)).unwrap();
        let markup = "x".repeat(1024 * 1024);

        let started = Instant::now();
        let err = delegate.update_ui(&markup, "t").unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
        assert!(matches!(
            err,
            PreviewError::DelegateUnresponsive { ref method, timeout_ms: 100 } if method == "update_ui"
        ));

        delegate.terminate();
        // the blocked write is abandoned, later calls fail fast
        assert!(delegate.close_window().is_err());
    }

    #[test]
    fn replies_after_a_timed_out_call_are_matched_by_id() {
        let mut delegate = ProcessDelegate::spawn(
            &sh(r#"read a; read b; echo '{"type":"response","id":1}'; echo '{"type":"response","id":2}'; sleep 5"#),
            Duration::from_millis(300),
        )
        .unwrap();
        assert!(matches!(
            delegate.close_window(),
            Err(PreviewError::DelegateUnresponsive { .. })
        ));
        assert!(delegate.update_css(".a {}").is_ok());
    }

    #[test]
    fn window_notifications_are_queued() {
        let mut delegate = ProcessDelegate::spawn(
            &sh(r#"echo '{"type":"window_open","open":true}'; sleep 5"#),
            Duration::from_secs(1),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut event = None;
        while event.is_none() && Instant::now() < deadline {
            event = delegate.poll_event();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(event, Some(DelegateEvent::WindowState { open: true }));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let err = ProcessDelegate::spawn(
            &["definitely-not-a-real-previewer-binary".to_string()],
            Duration::from_secs(1),
        )
        .err()
        .unwrap();
        assert!(matches!(err, PreviewError::DelegateSpawn(_)));
    }

    #[test]
    fn empty_command_fails_to_spawn() {
        assert!(ProcessDelegate::spawn(&[], Duration::from_secs(1)).is_err());
    }
}
