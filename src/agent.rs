//! The collaborator side: deciding whether a message should be rewritten, running the rewrite and
//! reporting what happened to a diagnostic log.
//!
//! Nothing in here can fail. Every error, and every panic raised by the codec, resolves to
//! [`AgentOutcome::Unmodified`] so the caller can always deliver the original message.

use std::any::Any;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use crate::property_map::PropertyCollector;
use crate::property_value::PropertyValue;
use crate::rewrite::RewriteEngine;
use crate::tnef_settings::{DEFAULT_REPLACEMENT, TnefSettings};

pub const DEFAULT_SUBJECT_PREFIX: &str = "UPDATEMESSAGECLASS";
pub const DEFAULT_REQUIRED_CLASS: &str = "IPM.Note";

/// Destination of the agent's diagnostic lines. Implementations must accept concurrent callers,
/// each line is appended as a whole.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn log(&self, line: &str) {
        (**self).log(line)
    }
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn log(&self, line: &str) {
        (**self).log(line)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave a half written line behind.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Appends lines to a file, flushing after every line.
#[derive(Debug)]
pub struct FileLogSink {
    file: Mutex<File>,
}

impl FileLogSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(FileLogSink {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileLogSink {
    fn log(&self, line: &str) {
        let mut file = lock(&self.file);
        if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
            warn!("Failed to append to diagnostic log: {}", e);
        }
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        MemoryLogSink::default()
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, line: &str) {
        lock(&self.lines).push(line.to_owned());
    }
}

/// Which stream the property dump is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticsPass {
    /// The message as received.
    Before,
    /// The message as delivered.
    #[default]
    After,
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    subject_prefix: String,
    required_class: String,
    replacement_class: String,
    diagnostics: DiagnosticsPass,
    tnef: TnefSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_owned(),
            required_class: DEFAULT_REQUIRED_CLASS.to_owned(),
            replacement_class: DEFAULT_REPLACEMENT.to_owned(),
            diagnostics: DiagnosticsPass::default(),
            tnef: TnefSettings::default(),
        }
    }
}

impl AgentSettings {
    pub fn new() -> Self {
        AgentSettings::default()
    }

    pub fn subject_prefix(mut self, subject_prefix: impl Into<String>) -> Self {
        self.subject_prefix = subject_prefix.into();
        self
    }

    /// Only messages of exactly this class are rewritten.
    pub fn required_class(mut self, required_class: impl Into<String>) -> Self {
        self.required_class = required_class.into();
        self
    }

    pub fn replacement_class(mut self, replacement_class: impl Into<String>) -> Self {
        self.replacement_class = replacement_class.into();
        self
    }

    pub fn diagnostics(mut self, diagnostics: DiagnosticsPass) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Codec settings. The replacement value is always derived from the replacement class.
    pub fn tnef_settings(mut self, tnef: TnefSettings) -> Self {
        self.tnef = tnef;
        self
    }

    pub fn get_subject_prefix(&self) -> &str {
        &self.subject_prefix
    }

    pub fn get_required_class(&self) -> &str {
        &self.required_class
    }

    pub fn get_replacement_class(&self) -> &str {
        &self.replacement_class
    }

    pub fn get_diagnostics(&self) -> DiagnosticsPass {
        self.diagnostics
    }

    pub fn get_tnef_settings(&self) -> &TnefSettings {
        &self.tnef
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Deliver the original TNEF content.
    Unmodified,
    /// Deliver these bytes in place of the original TNEF content.
    Rewritten(Vec<u8>),
}

pub struct MessageClassAgent<S: LogSink> {
    settings: AgentSettings,
    sink: S,
}

impl<S: LogSink> MessageClassAgent<S> {
    pub fn new(settings: AgentSettings, sink: S) -> Self {
        MessageClassAgent { settings, sink }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn should_rewrite(&self, subject: &str, message_class: &str) -> bool {
        subject.starts_with(&self.settings.subject_prefix)
            && message_class == self.settings.required_class
    }

    /// Rewrites the message class of `tnef` if the message qualifies.
    pub fn process(&self, subject: &str, message_class: &str, tnef: &[u8]) -> AgentOutcome {
        if !self.should_rewrite(subject, message_class) {
            debug!("Message of class {} does not qualify", message_class);
            return AgentOutcome::Unmodified;
        }

        if self.settings.diagnostics == DiagnosticsPass::Before {
            self.dump_properties(tnef);
        }

        let outcome = self.update_message_class(tnef);

        if self.settings.diagnostics == DiagnosticsPass::After {
            match &outcome {
                AgentOutcome::Rewritten(bytes) => self.dump_properties(bytes),
                AgentOutcome::Unmodified => self.dump_properties(tnef),
            }
        }

        outcome
    }

    fn update_message_class(&self, tnef: &[u8]) -> AgentOutcome {
        self.sink.log("Attempting to update message class");

        let target = self.settings.tnef.get_target_property().to_owned();
        let settings = self
            .settings
            .tnef
            .clone()
            .replacement(PropertyValue::unicode(&self.settings.replacement_class));
        let engine = RewriteEngine::new(settings);

        let mut output = Vec::with_capacity(tnef.len() + 16);
        let result = panic::catch_unwind(AssertUnwindSafe(|| engine.rewrite(tnef, &mut output)));

        match result {
            Ok(Ok(report)) if report.overridden > 0 => {
                for _ in 0..report.overridden {
                    self.sink.log(&format!(
                        "Setting {} to {}",
                        target, self.settings.replacement_class
                    ));
                }
                AgentOutcome::Rewritten(output)
            }
            Ok(Ok(_)) => {
                debug!("No {} property found, leaving message as is", target);
                AgentOutcome::Unmodified
            }
            Ok(Err(e)) => {
                self.sink.log(&format!("Error updating TNEF: {}", e));
                AgentOutcome::Unmodified
            }
            Err(panic) => {
                self.sink
                    .log(&format!("Error updating TNEF: {}", panic_message(&*panic)));
                AgentOutcome::Unmodified
            }
        }
    }

    fn dump_properties(&self, tnef: &[u8]) {
        let collector = PropertyCollector::new(self.settings.tnef.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(|| collector.collect(tnef)));

        let map = match result {
            Ok(Ok(map)) => map,
            Ok(Err(e)) => {
                self.sink.log(&format!("Error while reading TNEF: {}", e));
                return;
            }
            Err(panic) => {
                self.sink.log(&format!(
                    "Error while reading TNEF: {}",
                    panic_message(&*panic)
                ));
                return;
            }
        };

        for error in map.errors() {
            self.sink
                .log(&format!("Error while reading properties: {}", error));
        }

        if map.is_empty() {
            self.sink.log("No MAPI properties found on message");
            return;
        }

        self.sink.log("Message properties:");
        for line in map.lines() {
            self.sink.log(&line);
        }
        self.sink.log("Prop dump complete");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_predicate_needs_prefix_and_class() {
        let agent = MessageClassAgent::new(AgentSettings::new(), MemoryLogSink::new());
        assert!(agent.should_rewrite("UPDATEMESSAGECLASS please", "IPM.Note"));
        assert!(!agent.should_rewrite("please UPDATEMESSAGECLASS", "IPM.Note"));
        assert!(!agent.should_rewrite("UPDATEMESSAGECLASS", "IPM.Note.Other"));
        assert!(!agent.should_rewrite("UPDATEMESSAGECLASS", "ipm.note"));
    }

    #[test]
    fn test_garbage_is_left_unmodified() {
        let sink = Arc::new(MemoryLogSink::new());
        let agent = MessageClassAgent::new(AgentSettings::new(), Arc::clone(&sink));

        let outcome = agent.process("UPDATEMESSAGECLASS", "IPM.Note", b"not tnef at all");
        assert_eq!(outcome, AgentOutcome::Unmodified);

        let lines = sink.lines();
        assert_eq!(lines[0], "Attempting to update message class");
        assert!(lines[1].starts_with("Error updating TNEF: invalid TNEF signature"));
        assert!(lines[2].starts_with("Error while reading TNEF: "));
    }

    #[test]
    fn test_unqualified_message_logs_nothing() {
        let sink = MemoryLogSink::new();
        let agent = MessageClassAgent::new(AgentSettings::new(), &sink);
        assert_eq!(
            agent.process("Hello", "IPM.Note", b""),
            AgentOutcome::Unmodified
        );
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");

        FileLogSink::open(&path).unwrap().log("first");
        FileLogSink::open(&path).unwrap().log("second");

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first\nsecond\n"
        );
    }
}
