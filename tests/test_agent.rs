
use fixtures::*;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tnef::{
    AgentOutcome, AgentSettings, DiagnosticsPass, FileLogSink, MemoryLogSink, MessageClassAgent,
};

const SUBJECT: &str = "UPDATEMESSAGECLASS: quarterly report";

#[test]
fn test_qualifying_message_is_rewritten_and_dumped() {
    ensure_env_logger_initialized();
    let sink = MemoryLogSink::new();
    let agent = MessageClassAgent::new(AgentSettings::new(), &sink);

    let outcome = agent.process(SUBJECT, "IPM.Note", &hello_message("IPM.Note"));
    assert_eq!(
        outcome,
        AgentOutcome::Rewritten(hello_message("IPM.Note.Custom"))
    );

    assert_eq!(
        sink.lines(),
        vec![
            "Attempting to update message class".to_owned(),
            "Setting MessageClass (Unicode) to IPM.Note.Custom".to_owned(),
            "Message properties:".to_owned(),
            "MAPI:Subject (Unicode) = Hello".to_owned(),
            "MAPI:MessageClass (Unicode) = IPM.Note.Custom".to_owned(),
            "Prop dump complete".to_owned(),
        ]
    );
}

#[test]
fn test_dump_before_shows_the_original_class() {
    let sink = MemoryLogSink::new();
    let settings = AgentSettings::new().diagnostics(DiagnosticsPass::Before);
    let agent = MessageClassAgent::new(settings, &sink);

    agent.process(SUBJECT, "IPM.Note", &hello_message("IPM.Note"));

    let lines = sink.lines();
    assert_eq!(lines[0], "Message properties:");
    assert!(lines.contains(&"MAPI:MessageClass (Unicode) = IPM.Note".to_owned()));
    assert_eq!(lines.last().unwrap(), "Setting MessageClass (Unicode) to IPM.Note.Custom");
}

#[test]
fn test_skipped_diagnostics() {
    let sink = MemoryLogSink::new();
    let settings = AgentSettings::new().diagnostics(DiagnosticsPass::Skip);
    let agent = MessageClassAgent::new(settings, &sink);

    agent.process(SUBJECT, "IPM.Note", &hello_message("IPM.Note"));
    assert_eq!(sink.lines().len(), 2);
}

#[test]
fn test_custom_replacement_class() {
    let sink = MemoryLogSink::new();
    let settings = AgentSettings::new()
        .subject_prefix("RECLASSIFY")
        .replacement_class("IPM.Note.Other");
    let agent = MessageClassAgent::new(settings, &sink);

    assert!(!agent.should_rewrite(SUBJECT, "IPM.Note"));
    let outcome = agent.process("RECLASSIFY", "IPM.Note", &hello_message("IPM.Note"));
    assert_eq!(
        outcome,
        AgentOutcome::Rewritten(hello_message("IPM.Note.Other"))
    );
}

#[test]
fn test_message_without_properties() {
    let sink = MemoryLogSink::new();
    let agent = MessageClassAgent::new(AgentSettings::new(), &sink);

    let input = TnefBuilder::new().version().build();
    assert_eq!(
        agent.process(SUBJECT, "IPM.Note", &input),
        AgentOutcome::Unmodified
    );
    assert_eq!(
        sink.lines(),
        vec![
            "Attempting to update message class".to_owned(),
            "No MAPI properties found on message".to_owned(),
        ]
    );
}

#[test]
fn test_broken_stream_is_left_unmodified() {
    let sink = MemoryLogSink::new();
    let agent = MessageClassAgent::new(AgentSettings::new(), &sink);

    let mut input = hello_message("IPM.Note");
    input.truncate(input.len() - 3);

    assert_eq!(
        agent.process(SUBJECT, "IPM.Note", &input),
        AgentOutcome::Unmodified
    );

    let lines = sink.lines();
    assert!(
        lines[1].starts_with("Error updating TNEF: stream truncated"),
        "{}",
        lines[1]
    );
    // The dump of the original still reports what it could read.
    assert!(lines[2].starts_with("Error while reading properties: stream truncated"));
    assert_eq!(
        lines[3..].to_vec(),
        vec![
            "Message properties:".to_owned(),
            "MAPI:Subject (Unicode) = Hello".to_owned(),
            "Prop dump complete".to_owned(),
        ]
    );
}

#[test]
fn test_shared_sink_across_threads() {
    let sink = Arc::new(MemoryLogSink::new());
    let input = hello_message("IPM.Note");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let agent = MessageClassAgent::new(AgentSettings::new(), Arc::clone(&sink));
            let input = &input;
            scope.spawn(move || {
                assert!(matches!(
                    agent.process(SUBJECT, "IPM.Note", input),
                    AgentOutcome::Rewritten(_)
                ));
            });
        }
    });

    let lines = sink.lines();
    assert_eq!(lines.len(), 4 * 6);
    assert_eq!(
        lines
            .iter()
            .filter(|l| *l == "Attempting to update message class")
            .count(),
        4
    );
}

#[test]
fn test_file_sink_receives_the_dump() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("UpdateMessageClassAgent.log");

    let sink = FileLogSink::open(&path).unwrap();
    let agent = MessageClassAgent::new(AgentSettings::new(), sink);
    agent.process(SUBJECT, "IPM.Note", &hello_message("IPM.Note"));

    let log = std::fs::read_to_string(&path).unwrap();
    assert!(log.starts_with("Attempting to update message class\n"));
    assert!(log.ends_with("Prop dump complete\n"));
}
