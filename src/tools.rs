//! Blocking runner for the external programs the pipeline wraps
//!
//! stdout and stderr are drained on two reader threads and forwarded line by
//! line over a channel, so neither pipe can fill up while we wait. Lines are
//! split on `\n` and `\r` because both yt-dlp and tqdm redraw progress with
//! carriage returns.

use crossbeam_channel::{unbounded, Sender};
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::trace;

/// Lines of diagnostic output kept for error reports
const MAX_DIAGNOSTIC_LINES: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

struct ToolLine {
    stream: StreamKind,
    text: String,
}

/// Result of a finished external process
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Tail of stderr (or stdout when stderr was silent), one line per run of progress updates
    pub diagnostics: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Short description of how the process exited
    pub fn describe_status(&self) -> String {
        match self.status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "was terminated by a signal".to_string(),
        }
    }
}

/// An external program invoked by path or by name on PATH
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run to completion, reporting percentages found in its output
    ///
    /// Blocks the calling thread until the process exits. There is no timeout.
    pub fn run<I, S>(&self, args: I, mut on_progress: impl FnMut(f32)) -> std::io::Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

        let (tx, rx) = unbounded::<ToolLine>();
        let readers = [
            spawn_reader(StreamKind::Stdout, stdout, tx.clone()),
            spawn_reader(StreamKind::Stderr, stderr, tx),
        ];

        let mut stderr_tail = LineTail::new(MAX_DIAGNOSTIC_LINES);
        let mut stdout_tail = LineTail::new(MAX_DIAGNOSTIC_LINES);

        // Ends once both readers hit EOF and drop their senders
        for line in rx {
            trace!("{}: {}", self.program.display(), line.text);
            let percent = parse_percent(&line.text);
            if let Some(percent) = percent {
                on_progress(percent);
            }
            let tail = match line.stream {
                StreamKind::Stdout => &mut stdout_tail,
                StreamKind::Stderr => &mut stderr_tail,
            };
            tail.push(line.text, percent.is_some());
        }

        let status = child.wait()?;
        for reader in readers {
            if reader.join().is_err() {
                return Err(std::io::Error::other("output reader thread panicked"));
            }
        }

        let diagnostics = if stderr_tail.is_empty() {
            stdout_tail.join()
        } else {
            stderr_tail.join()
        };

        Ok(ToolOutput {
            status,
            diagnostics,
        })
    }

    /// Explain a spawn failure, with a tip for the missing-program case
    pub fn describe_spawn_error(&self, err: &std::io::Error, flag: &str) -> String {
        if err.kind() == std::io::ErrorKind::NotFound {
            format!(
                "'{}' was not found. Install it or point {} at the executable",
                self.program.display(),
                flag
            )
        } else {
            format!("Failed to start '{}': {}", self.program.display(), err)
        }
    }
}

fn spawn_reader<R>(stream: StreamKind, mut source: R, tx: Sender<ToolLine>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        let mut pending: Vec<u8> = Vec::new();

        let mut emit = |bytes: &mut Vec<u8>| {
            if !bytes.is_empty() {
                let text = String::from_utf8_lossy(bytes).trim_end().to_string();
                bytes.clear();
                if !text.is_empty() {
                    // Receiver only goes away after the child has exited
                    let _ = tx.send(ToolLine { stream, text });
                }
            }
        };

        loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            for &byte in &chunk[..n] {
                if byte == b'\n' || byte == b'\r' {
                    emit(&mut pending);
                } else {
                    pending.push(byte);
                }
            }
        }
        emit(&mut pending);
    })
}

/// Bounded buffer of the most recent lines
///
/// A redraw of the same progress display replaces the previous line, so a
/// progress bar cannot push real messages out. Redraws are recognised by
/// the text before the first digit.
struct LineTail {
    lines: VecDeque<String>,
    capacity: usize,
    last_progress: Option<String>,
}

impl LineTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            last_progress: None,
        }
    }

    fn push(&mut self, line: String, has_percent: bool) {
        let key = has_percent.then(|| progress_key(&line));
        if key.is_some() && key == self.last_progress {
            self.lines.pop_back();
        } else if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.last_progress = key;
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn join(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

fn progress_key(line: &str) -> String {
    line.chars().take_while(|c| !c.is_ascii_digit()).collect()
}

/// Extract the last percentage (0-100) printed on a line
///
/// Matches yt-dlp (`[download]  42.3% of 3.10MiB`) and tqdm (` 42%|####`).
pub fn parse_percent(line: &str) -> Option<f32> {
    let bytes = line.as_bytes();
    let mut found = None;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }
        let start = bytes[..i]
            .iter()
            .rposition(|c| !(c.is_ascii_digit() || *c == b'.'))
            .map(|p| p + 1)
            .unwrap_or(0);
        if start == i {
            continue;
        }
        if let Ok(value) = line[start..i].parse::<f32>() {
            if (0.0..=100.0).contains(&value) {
                found = Some(value);
            }
        }
    }

    found
}
