//! Spoken announcements on a background worker thread.

use crate::controller::Announce;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use tokio::sync::mpsc;

/// Queued utterances beyond this are dropped.
const QUEUE_DEPTH: usize = 16;

/// Hands text to a speech program without blocking the caller.
///
/// Utterances are spoken one at a time in the order they were queued. The
/// worker is detached; it exits once the announcer is dropped and the queue
/// has drained.
pub struct Announcer {
    tx: Option<mpsc::Sender<String>>,
}

impl Announcer {
    /// Start the speech worker. Each utterance runs `program args... <text>`.
    pub fn spawn(program: String, args: Vec<String>) -> io::Result<Self> {
        let (tx, mut rx) = mpsc::channel::<String>(QUEUE_DEPTH);

        std::thread::Builder::new()
            .name("rollcall-speech".into())
            .spawn(move || {
                tracing::debug!(program = %program, "speech worker started");
                while let Some(text) = rx.blocking_recv() {
                    match speak(&program, &args, &text) {
                        Ok(status) if !status.success() => {
                            tracing::warn!(program = %program, %status, "speech program failed");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(
                                program = %program,
                                error = %e,
                                "speech program not runnable"
                            );
                        }
                    }
                }
                tracing::debug!("speech worker exiting");
            })?;

        Ok(Self { tx: Some(tx) })
    }

    /// An announcer that only logs.
    pub fn disabled() -> Self {
        Self { tx: None }
    }
}

impl Announce for Announcer {
    fn announce(&self, text: &str) {
        tracing::info!(text, "announce");
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(text.to_string()) {
            tracing::debug!(error = %e, "announcement dropped");
        }
    }
}

fn speak(program: &str, args: &[String], text: &str) -> io::Result<ExitStatus> {
    Command::new(program)
        .args(args)
        .arg(text)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{Duration, Instant};

    /// Wait for the worker to have written `lines` lines to `path`.
    fn read_lines(path: &Path, lines: usize) -> String {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let text = std::fs::read_to_string(path).unwrap_or_default();
            if text.lines().count() >= lines || Instant::now() > deadline {
                return text;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_utterances_spoken_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let script = format!("printf '%s\\n' \"$0\" >> '{}'", out.display());

        let announcer = Announcer::spawn("sh".into(), vec!["-c".into(), script]).unwrap();
        announcer.announce("Good morning, Steve.");
        announcer.announce("Registration successful.");

        assert_eq!(
            read_lines(&out, 2),
            "Good morning, Steve.\nRegistration successful.\n"
        );
    }

    #[test]
    fn test_missing_program_is_an_error() {
        assert!(speak("rollcall-no-such-speech-program", &[], "hello").is_err());
    }

    #[test]
    fn test_missing_program_does_not_disturb_caller() {
        let announcer = Announcer::spawn("rollcall-no-such-speech-program".into(), vec![]).unwrap();
        announcer.announce("hello");
        announcer.announce("again");
    }

    #[test]
    fn test_disabled_announcer_accepts_text() {
        let announcer = Announcer::disabled();
        announcer.announce("hello");
    }
}
