use parley_channel::EventChannel;
use parley_core::{Config, Phase};
use parley_session::{AnalysisOrchestrator, ScriptedBackend};
use std::rc::Rc;

fn connected_orchestrator() -> (AnalysisOrchestrator, EventChannel) {
    let channel = EventChannel::new();
    channel.set_connected(true);
    let mut orchestrator = AnalysisOrchestrator::new(
        "editor",
        channel.clone(),
        Rc::new(ScriptedBackend::new()),
        Config::new(),
    );
    orchestrator.select_persona(Some("ada"));
    (orchestrator, channel)
}

#[test]
fn test_wire_frames_drive_session() {
    let (mut orchestrator, channel) = connected_orchestrator();
    orchestrator.analyze_from_draft("Hello world").unwrap();

    let frames = [
        r#"{"event":"started","conversationId":"c1","toolName":"draft_analysis"}"#,
        r#"{"event":"chunk","conversationId":"c1","chunk":"He","fullContent":"He","chunkIndex":0,"toolName":"draft_analysis"}"#,
        r#"{"event":"chunk","conversationId":"c1","chunk":"llo","fullContent":"Hello","chunkIndex":1,"toolName":"draft_analysis"}"#,
        r#"{"event":"complete","conversationId":"c1","fullResponse":"{\"verdict\":\"clear\"}","messageId":"m1","usage":{"input_tokens":12,"output_tokens":30},"toolName":"draft_analysis"}"#,
    ];
    for frame in frames {
        assert_eq!(channel.publish_json(frame).unwrap(), 1);
    }

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Complete);
    assert_eq!(snapshot.streaming_content, "Hello");
    let result = snapshot.final_result.unwrap();
    assert_eq!(result.structured.unwrap()["verdict"], "clear");
    assert_eq!(result.usage.unwrap().total(), 42);
}

#[test]
fn test_validation_errors_surface_in_message() {
    let (mut orchestrator, channel) = connected_orchestrator();
    orchestrator.analyze_from_draft("Hello world").unwrap();

    channel
        .publish_json(
            r#"{"event":"error","conversationId":"c1","error":"invalid output","validationErrors":["missing score","bad tone"],"toolName":"draft_analysis"}"#,
        )
        .unwrap();

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Error);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("invalid output: missing score; bad tone")
    );
}

#[test]
fn test_foreign_frames_ignored() {
    let (mut orchestrator, channel) = connected_orchestrator();
    orchestrator.analyze_from_draft("Hello world").unwrap();

    let delivered = channel
        .publish_json(r#"{"event":"complete","conversationId":"other","fullResponse":"x","messageId":"m9"}"#)
        .unwrap();
    assert_eq!(delivered, 0);
    assert_eq!(orchestrator.phase(), Phase::Starting);
}

#[test]
fn test_malformed_frame_rejected() {
    let channel = EventChannel::new();
    assert!(channel.publish_json(r#"{"event":"chunk"}"#).is_err());
    assert!(channel.publish_json("not json").is_err());
}
