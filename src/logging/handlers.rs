use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use super::logger::{LogHandler, LogLevel, LogRecord};

pub const MAIL_SUBJECT: &str = "[XO Server]";
pub const MAIL_FROM: &str = "no-reply@vates.fr";

/// Writes one formatted line per record.
pub struct StreamHandler {
    writer: Box<dyn Write + Send>,
    level: LogLevel,
}

impl StreamHandler {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            level: LogLevel::Debug,
        }
    }

    /// Append to `path`, creating it and its parent directories.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl LogHandler for StreamHandler {
    fn handle(&mut self, record: &LogRecord) -> io::Result<()> {
        if record.level < self.level {
            return Ok(());
        }
        writeln!(self.writer, "{}", record.format_line())?;
        self.writer.flush()
    }
}

/// Buffers records until one reaches the trigger level, then hands the whole
/// buffer to the wrapped handler at once and passes everything after it
/// straight through.
pub struct FingersCrossedHandler<H> {
    inner: H,
    trigger: LogLevel,
    buffer: VecDeque<LogRecord>,
    buffer_limit: usize,
    triggered: bool,
}

impl<H: LogHandler> FingersCrossedHandler<H> {
    pub const DEFAULT_BUFFER_LIMIT: usize = 1000;

    pub fn new(inner: H, trigger: LogLevel) -> Self {
        Self {
            inner,
            trigger,
            buffer: VecDeque::new(),
            buffer_limit: Self::DEFAULT_BUFFER_LIMIT,
            triggered: false,
        }
    }

    /// Keep at most `limit` records before the trigger; older ones are dropped.
    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = limit.max(1);
        self
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<H: LogHandler> LogHandler for FingersCrossedHandler<H> {
    fn handle(&mut self, record: &LogRecord) -> io::Result<()> {
        if self.triggered {
            return self.inner.handle(record);
        }

        if self.buffer.len() >= self.buffer_limit {
            self.buffer.pop_front();
        }
        self.buffer.push_back(record.clone());

        if record.level >= self.trigger {
            self.triggered = true;
            let buffered: Vec<LogRecord> = self.buffer.drain(..).collect();
            self.inner.handle_batch(&buffered)?;
        }
        Ok(())
    }
}

/// Message handed to a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

pub trait MailTransport: Send {
    fn send(&mut self, mail: &Mail) -> io::Result<()>;
}

/// Pipes messages to the local `sendmail -t`.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    program: String,
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self {
            program: "sendmail".to_string(),
        }
    }
}

impl SendmailTransport {
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl MailTransport for SendmailTransport {
    fn send(&mut self, mail: &Mail) -> io::Result<()> {
        let mut child = Command::new(&self.program)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            write!(
                stdin,
                "To: {}\nFrom: {}\nSubject: {}\nContent-Type: text/plain; charset=utf-8\n\n{}\n",
                mail.to, mail.from, mail.subject, mail.body
            )?;
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(io::Error::other(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}

/// Sends log records by mail, one message per batch.
pub struct MailHandler {
    to: String,
    subject: String,
    from: String,
    level: LogLevel,
    transport: Box<dyn MailTransport>,
}

impl MailHandler {
    pub fn new(to: &str, transport: Box<dyn MailTransport>) -> Self {
        Self {
            to: to.to_string(),
            subject: MAIL_SUBJECT.to_string(),
            from: MAIL_FROM.to_string(),
            level: LogLevel::Debug,
            transport,
        }
    }

    pub fn sendmail(to: &str) -> Self {
        Self::new(to, Box::new(SendmailTransport::default()))
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl LogHandler for MailHandler {
    fn handle(&mut self, record: &LogRecord) -> io::Result<()> {
        self.handle_batch(std::slice::from_ref(record))
    }

    fn handle_batch(&mut self, records: &[LogRecord]) -> io::Result<()> {
        let lines: Vec<String> = records
            .iter()
            .filter(|r| r.level >= self.level)
            .map(LogRecord::format_line)
            .collect();
        if lines.is_empty() {
            return Ok(());
        }

        self.transport.send(&Mail {
            to: self.to.clone(),
            from: self.from.clone(),
            subject: self.subject.clone(),
            body: lines.join("\n"),
        })
    }
}
