mod common;

use common::{harness, stream_analysis, stream_follow_up, DRAFT_TOOL};
use parley_core::{ChannelEvent, EntryType, Phase, Role, SessionError};

#[test]
fn test_stale_events_after_new_analysis_dropped() {
    let mut h = harness();
    let old = h.orchestrator.analyze_from_draft("first").unwrap();
    let new = h.orchestrator.analyze_from_draft("second").unwrap();

    let delivered = h
        .channel
        .publish(&ChannelEvent::complete(old, "late", "m-old", Some(DRAFT_TOOL)));
    assert_eq!(delivered, 0);

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.conversation_id, Some(new));
    assert_eq!(snapshot.phase, Phase::Starting);
    assert!(snapshot.final_result.is_none());
}

#[test]
fn test_stale_error_after_new_analysis_dropped() {
    let mut h = harness();
    let old = h.orchestrator.analyze_from_draft("first").unwrap();
    let new = h.orchestrator.analyze_from_draft("second").unwrap();
    h.channel
        .publish(&ChannelEvent::chunk(new.clone(), "Sec", 0, Some(DRAFT_TOOL)));
    let before = h.orchestrator.snapshot();

    let delivered = h
        .channel
        .publish(&ChannelEvent::error(old.clone(), "old run failed", Some(DRAFT_TOOL)));
    assert_eq!(delivered, 0);
    h.channel.publish(&ChannelEvent::error(old, "old follow-up failed", None));

    let after = h.orchestrator.snapshot();
    assert_eq!(after, before);
    assert_eq!(after.phase, Phase::Streaming);
    assert!(after.error.is_none());
    assert_eq!(after.conversation_id, Some(new));
}

#[test]
fn test_events_after_clear_dropped() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    h.orchestrator.clear_conversation();

    assert_eq!(h.channel.publish(&ChannelEvent::started(id.clone(), DRAFT_TOOL)), 0);
    assert_eq!(h.channel.publish(&ChannelEvent::chunk(id, "Hel", 0, Some(DRAFT_TOOL))), 0);
    assert_eq!(h.orchestrator.phase(), Phase::Idle);
}

#[test]
fn test_out_of_order_chunks_never_shrink_buffer() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    for content in ["He", "Hello", "Hel"] {
        h.channel.publish(&ChannelEvent::chunk(id.clone(), content, 0, Some(DRAFT_TOOL)));
    }
    assert_eq!(h.orchestrator.snapshot().streaming_content, "Hello");
}

#[test]
fn test_follow_up_streams_separately() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    stream_analysis(&h.channel, &id, "Hello", "m1");

    h.orchestrator.send_follow_up_message("  why?  ").unwrap();
    assert_eq!(h.orchestrator.phase(), Phase::FollowUpStreaming);

    h.channel.publish(&ChannelEvent::chunk(id.clone(), "Because", 0, None));
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.follow_up_buffer, "Because");
    assert_eq!(snapshot.final_result.as_ref().unwrap().raw, "Hello");

    h.channel.publish(&ChannelEvent::complete(id, "Because reasons", "m2", None));
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Complete);
    assert!(snapshot.follow_up_buffer.is_empty());
    assert_eq!(snapshot.follow_ups.len(), 2);
    assert_eq!(snapshot.follow_ups[0].role, Role::User);
    assert_eq!(snapshot.follow_ups[0].content, "why?");
    assert_eq!(snapshot.follow_ups[1].message_id.as_deref(), Some("m2"));
    assert_eq!(snapshot.final_result.unwrap().message_id, "m1");
}

#[test]
fn test_follow_up_thread_archived_with_analysis() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    stream_analysis(&h.channel, &id, "Hello", "m1");
    h.orchestrator.send_follow_up_message("why?").unwrap();
    stream_follow_up(&h.channel, &id, "Because", "m2");

    h.orchestrator.analyze_from_draft("next").unwrap();
    let history = h.orchestrator.history();
    let types: Vec<EntryType> = history.iter().map(|e| e.entry_type).collect();
    assert_eq!(
        types,
        vec![EntryType::Analysis, EntryType::Followup, EntryType::Followup]
    );
    assert_eq!(history[2].role, Role::Assistant);
}

#[test]
fn test_follow_up_preconditions() {
    let mut h = harness();
    assert_eq!(
        h.orchestrator.send_follow_up_message("why?").unwrap_err(),
        SessionError::NoActiveConversation
    );

    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    stream_analysis(&h.channel, &id, "Hello", "m1");
    assert_eq!(
        h.orchestrator.send_follow_up_message("  ").unwrap_err(),
        SessionError::EmptyInput("message")
    );

    h.orchestrator.send_follow_up_message("why?").unwrap();
    assert_eq!(
        h.orchestrator.send_follow_up_message("and?").unwrap_err(),
        SessionError::FollowUpInFlight
    );
}

#[test]
fn test_follow_up_error_keeps_main_result() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    stream_analysis(&h.channel, &id, "Hello", "m1");
    h.orchestrator.send_follow_up_message("why?").unwrap();

    h.channel.publish(&ChannelEvent::error(id, "tool crashed", None));
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Complete);
    assert_eq!(snapshot.error.as_deref(), Some("tool crashed"));
    assert!(snapshot.final_result.is_some());
    assert!(snapshot.follow_ups.is_empty());
}

#[test]
fn test_follow_up_send_failure_rolls_back() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    stream_analysis(&h.channel, &id, "Hello", "m1");
    h.backend.fail_next_follow_up("socket closed");

    let err = h.orchestrator.send_follow_up_message("why?").unwrap_err();
    assert_eq!(err, SessionError::FollowUp("socket closed".to_string()));
    assert_eq!(h.orchestrator.phase(), Phase::Complete);
    assert!(h.orchestrator.send_follow_up_message("why?").is_ok());
}

#[test]
fn test_tool_tagged_event_during_follow_up_goes_to_main() {
    let mut h = harness();
    let id = h.orchestrator.analyze_from_draft("Hello world").unwrap();
    stream_analysis(&h.channel, &id, "Hello", "m1");
    h.orchestrator.send_follow_up_message("why?").unwrap();

    // Main analysis is already complete, so a tagged chunk is ignored
    h.channel.publish(&ChannelEvent::chunk(id, "Hello again", 0, Some(DRAFT_TOOL)));
    let snapshot = h.orchestrator.snapshot();
    assert!(snapshot.follow_up_buffer.is_empty());
    assert_eq!(snapshot.streaming_content, "Hello");
    assert_eq!(snapshot.phase, Phase::FollowUpStreaming);
}

#[test]
fn test_two_surfaces_share_channel() {
    let mut a = harness();
    let backend = std::rc::Rc::new(parley_session::ScriptedBackend::new());
    let mut b = parley_session::AnalysisOrchestrator::new(
        "panel-2",
        a.channel.clone(),
        backend,
        parley_core::Config::new(),
    );
    b.select_persona(Some("grace"));

    // Surface a moves on to c2, leaving c1 to surface b
    a.orchestrator.analyze_from_draft("one").unwrap();
    a.orchestrator.analyze_from_draft("two").unwrap();
    let b_id = b.analyze_from_draft("three").unwrap();
    assert_eq!(b_id.as_str(), "c1");

    stream_analysis(&a.channel, &b_id, "for b", "mb");
    assert_eq!(b.phase(), Phase::Complete);
    assert_eq!(a.orchestrator.phase(), Phase::Starting);
}
