//! Terminal front end: prints the activity log and turns stdin lines into engine commands.

use crate::controller::Ui;
use crate::engine::{Command, EngineHandle};
use image::RgbImage;
use rollcall_core::Recognition;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Log lines kept in memory.
pub const HISTORY_LINES: usize = 200;

pub const HELP: &str = "\
commands:
  register <id> <name...>  enter registration mode
  c | capture              save the current frame for the user being registered
  start                    start recognition
  stop                     stop the camera
  snapshot <path>          save the displayed frame
  list                     list registered users
  log                      show the recent log
  reload                   reload the face data
  help                     show this text
  quit                     exit";

/// Bounded, shared log ring: the engine thread writes, the console reads.
#[derive(Clone)]
pub struct LogHistory {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Kept lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }
}

impl Default for LogHistory {
    fn default() -> Self {
        Self::new(HISTORY_LINES)
    }
}

/// Console implementation of [`Ui`].
pub struct ConsoleUi {
    history: LogHistory,
    frame: Option<RgbImage>,
    labels: Vec<String>,
}

impl ConsoleUi {
    pub fn new(history: LogHistory) -> Self {
        Self {
            history,
            frame: None,
            labels: Vec::new(),
        }
    }
}

fn timestamped(text: &str) -> String {
    format!("[{}] {text}", chrono::Local::now().format("%H:%M:%S"))
}

/// Log text for the faces in view, e.g. `"In view: Steve, Unknown"`.
fn in_view(labels: &[String]) -> String {
    if labels.is_empty() {
        "No faces in view.".to_string()
    } else {
        format!("In view: {}", labels.join(", "))
    }
}

impl Ui for ConsoleUi {
    fn log(&mut self, text: &str) {
        tracing::info!(text, "log");
        let line = timestamped(text);
        println!("{line}");
        self.history.push(line);
    }

    fn info(&mut self, text: &str) {
        println!("* {text}");
    }

    fn warn(&mut self, text: &str) {
        println!("warning: {text}");
    }

    fn error(&mut self, text: &str) {
        println!("error: {text}");
    }

    fn render(&mut self, frame: &RgbImage, recognitions: &[Recognition]) {
        let labels: Vec<String> = recognitions.iter().map(|r| r.label().to_string()).collect();
        if labels != self.labels {
            self.log(&in_view(&labels));
            self.labels = labels;
        }
        self.frame = Some(frame.clone());
    }

    fn clear(&mut self) {
        self.frame = None;
        self.labels.clear();
    }

    fn last_frame(&self) -> Option<&RgbImage> {
        self.frame.as_ref()
    }
}

/// A parsed console line.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Engine(Command),
    History,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line of input. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Input>, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "register" => {
            let Some((user_id, name)) = rest.split_once(char::is_whitespace) else {
                return Err(ParseError::Usage("register <id> <name...>"));
            };
            Input::Engine(Command::Register {
                user_id: user_id.to_string(),
                name: name.trim().to_string(),
            })
        }
        "start" => Input::Engine(Command::Start),
        "stop" => Input::Engine(Command::Stop),
        "c" | "capture" => Input::Engine(Command::Capture),
        "snapshot" if rest.is_empty() => return Err(ParseError::Usage("snapshot <path>")),
        "snapshot" => Input::Engine(Command::Snapshot(PathBuf::from(rest))),
        "list" => Input::Engine(Command::List),
        "reload" => Input::Engine(Command::Reload),
        "log" | "history" => Input::History,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}

/// Read commands from stdin until `quit` or EOF, then ask the engine to shut down.
pub async fn run_console(handle: EngineHandle, history: LogHistory) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Input::History)) => {
                for line in history.lines() {
                    println!("{line}");
                }
            }
            Ok(Some(Input::Help)) => println!("{HELP}"),
            Ok(Some(Input::Quit)) => break,
            Ok(Some(Input::Engine(command))) => handle.send(command).await?,
            Err(e) => println!("{e}"),
        }
    }

    if handle.send(Command::Shutdown).await.is_err() {
        tracing::debug!("engine already stopped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{BoundingBox, Identity};

    fn engine(line: &str) -> Command {
        match parse_command(line) {
            Ok(Some(Input::Engine(c))) => c,
            other => panic!("{line:?} parsed as {other:?}"),
        }
    }

    fn face(stem: Option<&str>) -> Recognition {
        Recognition {
            bbox: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                confidence: 0.9,
                landmarks: None,
            },
            identity: stem.map(Identity::from_stem),
            distance: None,
        }
    }

    fn messages(history: &LogHistory) -> Vec<String> {
        history
            .lines()
            .iter()
            .map(|l| l.split_once("] ").unwrap().1.to_string())
            .collect()
    }

    #[test]
    fn test_parse_register_keeps_full_name() {
        assert_eq!(
            engine("register 1001 Steve O'Neil"),
            Command::Register {
                user_id: "1001".into(),
                name: "Steve O'Neil".into(),
            }
        );
        assert_eq!(
            parse_command("register 1001").unwrap_err(),
            ParseError::Usage("register <id> <name...>")
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(engine("start"), Command::Start);
        assert_eq!(engine("  STOP "), Command::Stop);
        assert_eq!(engine("c"), Command::Capture);
        assert_eq!(engine("capture"), Command::Capture);
        assert_eq!(engine("list"), Command::List);
        assert_eq!(engine("reload"), Command::Reload);
        assert_eq!(
            engine("snapshot /tmp/a b.png"),
            Command::Snapshot(PathBuf::from("/tmp/a b.png"))
        );
        assert_eq!(parse_command("log").unwrap(), Some(Input::History));
        assert_eq!(parse_command("help").unwrap(), Some(Input::Help));
        assert_eq!(parse_command("quit").unwrap(), Some(Input::Quit));
    }

    #[test]
    fn test_parse_blank_and_unknown() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("dance").unwrap_err(), ParseError::Unknown("dance".into()));
        assert!(parse_command("snapshot").is_err());
    }

    #[test]
    fn test_history_keeps_newest_lines() {
        let history = LogHistory::default();
        let mut ui = ConsoleUi::new(history.clone());
        for i in 0..HISTORY_LINES + 5 {
            ui.log(&format!("line {i}"));
        }

        let lines = history.lines();
        assert_eq!(lines.len(), HISTORY_LINES);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] line 5"));
        assert!(lines.last().unwrap().ends_with(&format!("] line {}", HISTORY_LINES + 4)));
    }

    #[test]
    fn test_faces_in_view_are_logged_on_change() {
        let history = LogHistory::default();
        let mut ui = ConsoleUi::new(history.clone());
        let frame = RgbImage::new(4, 4);

        ui.render(&frame, &[]);
        ui.render(&frame, &[face(Some("1001_Steve")), face(None)]);
        ui.render(&frame, &[face(Some("1001_Steve")), face(None)]);
        ui.render(&frame, &[face(Some("1001_Steve"))]);
        ui.render(&frame, &[]);

        assert_eq!(
            messages(&history),
            vec!["In view: Steve, Unknown", "In view: Steve", "No faces in view."]
        );
    }

    #[test]
    fn test_clear_drops_frame_and_faces() {
        let history = LogHistory::default();
        let mut ui = ConsoleUi::new(history.clone());
        ui.render(&RgbImage::new(4, 4), &[face(Some("1001_Steve"))]);
        assert!(ui.last_frame().is_some());

        ui.clear();
        assert!(ui.last_frame().is_none());

        // The same face reappearing after a stop is reported again.
        ui.render(&RgbImage::new(4, 4), &[face(Some("1001_Steve"))]);
        assert_eq!(messages(&history), vec!["In view: Steve", "In view: Steve"]);
    }
}
