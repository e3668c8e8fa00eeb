// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream session tests
//
// Cover:
//  1. Fragments then terminal -> exact concatenation, accepted
//  2. Close without terminal -> failed, nothing exposed as complete
//  3. Mid-stream connection error -> failed with cause
//  4. Disallowed section -> rejected, document never published
//  5. Validator runs exactly once per completed session, never otherwise
//  6. Events after the terminal are discarded
//  7. Partial documents grow monotonically
//  8. Cancellation while opening and while streaming closes the connection
//  9. A refused publication turns into Cancelled
// 10. Idle timeout and buffer overflow, across fragments or in one event

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::*;
use crate::config::StreamConfig;
use crate::error::SubmissionError;
use crate::policy::RuleKind;
use crate::testing::*;
use crate::transport::TransportError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_session(
    config: &StreamConfig,
    validator: &Arc<CountingValidator>,
    observer: &Arc<RecordingObserver>,
) -> StreamSession {
    StreamSession::new(Uuid::new_v4(), config, validator.clone(), observer.clone())
}

struct Run {
    outcome: Outcome,
    observer: Arc<RecordingObserver>,
    validator: Arc<CountingValidator>,
}

async fn run_scripted(events: Vec<StreamEvent>) -> Run {
    run_scripted_with(&stream_config(), events).await
}

async fn run_scripted_with(config: &StreamConfig, events: Vec<StreamEvent>) -> Run {
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let transport = Arc::new(ScriptedTransport::new(events));
    let (_handle, signal) = CancelSignal::pair();

    let outcome = new_session(config, &validator, &observer)
        .run(transport, summary_request(), signal)
        .await;

    Run {
        outcome,
        observer,
        validator,
    }
}

fn accepted_text(outcome: &Outcome) -> &str {
    match outcome {
        Outcome::Accepted(doc) => doc.as_str(),
        other => panic!("expected Accepted, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fragments_then_terminal_yield_exact_document() {
    let mut events = fragments(&["Hello ", "J. Doe, ", "here is your summary."]);
    events.push(StreamEvent::Terminal);

    let run = run_scripted(events).await;

    assert_eq!(
        accepted_text(&run.outcome),
        "Hello J. Doe, here is your summary."
    );
    assert_eq!(run.outcome.state(), SessionState::Completed);
    assert_eq!(run.validator.calls(), 1);
}

#[tokio::test]
async fn marker_fragment_is_never_part_of_the_document() {
    // A transport that did not classify the marker still finishes cleanly.
    let run = run_scripted(fragments(&["Dear J. Doe,", "\n", "Rest well.", "[DONE]"])).await;
    let text = accepted_text(&run.outcome);
    assert_eq!(text, "Dear J. Doe,\nRest well.");
    assert!(!text.contains("[DONE]"));
}

#[tokio::test]
async fn updates_follow_the_session_lifecycle() {
    let mut events = fragments(&["Hello ", "J. Doe"]);
    events.push(StreamEvent::Terminal);

    let run = run_scripted(events).await;

    let updates = run.observer.updates();
    assert_eq!(updates[0], SessionUpdate::Streaming);
    assert_eq!(updates[1], SessionUpdate::Partial("Hello ".into()));
    assert_eq!(updates[2], SessionUpdate::Partial("Hello J. Doe".into()));
    assert_eq!(updates[3], SessionUpdate::Finalizing);
    assert_eq!(updates[4], SessionUpdate::Finished(run.outcome.clone()));
    assert_eq!(updates.len(), 5);
}

#[tokio::test]
async fn partial_documents_grow_monotonically() {
    let texts = ["Dear ", "J. Doe,", "\n", "- rest", "\n", "- fluids"];
    let mut events = fragments(&texts);
    events.push(StreamEvent::Terminal);

    let run = run_scripted(events).await;

    let partials = run.observer.partials();
    assert_eq!(partials.len(), texts.len());
    for pair in partials.windows(2) {
        assert!(pair[1].starts_with(&pair[0]));
        assert!(pair[1].len() > pair[0].len());
    }
    assert_eq!(partials.last().unwrap(), accepted_text(&run.outcome));
}

#[tokio::test]
async fn empty_fragments_are_appended_but_not_republished() {
    let mut events = fragments(&["a", "", "b"]);
    events.push(StreamEvent::Terminal);

    let run = run_scripted(events).await;

    assert_eq!(accepted_text(&run.outcome), "ab");
    assert_eq!(run.observer.partials(), vec!["a".to_string(), "ab".to_string()]);
}

#[tokio::test]
async fn events_after_terminal_are_discarded() {
    let events = vec![
        StreamEvent::Fragment("complete".into()),
        StreamEvent::Terminal,
        StreamEvent::Fragment(" trailing".into()),
        StreamEvent::ConnectionError(TransportError::Interrupted("reset".into())),
    ];

    let run = run_scripted(events).await;

    assert_eq!(accepted_text(&run.outcome), "complete");
}

#[tokio::test]
async fn structural_terminal_with_no_fragments_accepts_empty_document() {
    let run = run_scripted(vec![StreamEvent::Terminal]).await;
    assert_eq!(accepted_text(&run.outcome), "");
}

// ---------------------------------------------------------------------------
// Abnormal termination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_without_terminal_fails() {
    let mut events = fragments(&["Hello ", "J. Doe"]);
    events.push(StreamEvent::ConnectionClosed);

    let run = run_scripted(events).await;

    assert_eq!(
        run.outcome,
        Outcome::Failed(SubmissionError::Transport(
            TransportError::ClosedBeforeTerminal { fragments: 2 }
        ))
    );
    assert_eq!(run.validator.calls(), 0);
    assert!(!run
        .observer
        .updates()
        .iter()
        .any(|u| matches!(u, SessionUpdate::Finished(Outcome::Accepted(_)))));
}

#[tokio::test]
async fn stream_ending_without_close_event_also_fails() {
    let run = run_scripted(fragments(&["partial"])).await;
    assert!(matches!(
        run.outcome,
        Outcome::Failed(SubmissionError::Transport(
            TransportError::ClosedBeforeTerminal { fragments: 1 }
        ))
    ));
}

#[tokio::test]
async fn connection_error_mid_stream_fails_with_cause() {
    let events = vec![
        StreamEvent::Fragment("Hello".into()),
        StreamEvent::ConnectionError(TransportError::Interrupted("connection reset".into())),
    ];

    let run = run_scripted(events).await;

    assert_eq!(
        run.outcome,
        Outcome::Failed(SubmissionError::Transport(TransportError::Interrupted(
            "connection reset".into()
        )))
    );
    assert_eq!(
        run.observer.updates().last(),
        Some(&SessionUpdate::Finished(run.outcome.clone()))
    );
}

#[tokio::test]
async fn open_failure_fails_from_idle() {
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let (_handle, signal) = CancelSignal::pair();

    let outcome = new_session(&stream_config(), &validator, &observer)
        .run(
            Arc::new(FailingTransport(TransportError::Status { status: 401 })),
            summary_request(),
            signal,
        )
        .await;

    let expected = Outcome::Failed(SubmissionError::Transport(TransportError::Status {
        status: 401,
    }));
    assert_eq!(outcome, expected);
    assert_eq!(observer.updates(), vec![SessionUpdate::Finished(expected)]);
}

#[tokio::test]
async fn buffer_overflow_fails_the_session() {
    let config = StreamConfig {
        max_document_bytes: 8,
        ..stream_config()
    };
    let mut events = fragments(&["12345", "6789"]);
    events.push(StreamEvent::Terminal);

    let run = run_scripted_with(&config, events).await;

    assert_eq!(
        run.outcome,
        Outcome::Failed(SubmissionError::Stream(StreamError::BufferOverflow {
            limit: 8
        }))
    );
    assert_eq!(run.validator.calls(), 0);
}

#[tokio::test]
async fn single_oversized_fragment_fails_without_partials() {
    let config = StreamConfig {
        max_document_bytes: 8,
        ..stream_config()
    };
    let mut events = fragments(&["123456789"]);
    events.push(StreamEvent::Terminal);

    let run = run_scripted_with(&config, events).await;

    assert_eq!(
        run.outcome,
        Outcome::Failed(SubmissionError::Stream(StreamError::BufferOverflow {
            limit: 8
        }))
    );
    assert!(run.observer.partials().is_empty());
    assert_eq!(run.validator.calls(), 0);
}

#[tokio::test]
async fn oversized_event_from_decoder_fails_the_session() {
    let events = vec![
        StreamEvent::Fragment("Dear J. Doe,".into()),
        StreamEvent::ConnectionError(TransportError::EventTooLarge { limit: 64 }),
    ];

    let run = run_scripted(events).await;

    assert_eq!(
        run.outcome,
        Outcome::Failed(SubmissionError::Transport(TransportError::EventTooLarge {
            limit: 64
        }))
    );
    assert_eq!(run.validator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_stream_times_out() {
    let config = StreamConfig {
        idle_timeout_ms: Some(5_000),
        ..stream_config()
    };
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let (transport, senders) = ChannelTransport::with_streams(1);
    let (_handle, signal) = CancelSignal::pair();

    senders[0]
        .send(StreamEvent::Fragment("Hello".into()))
        .await
        .unwrap();

    // Sender stays alive: the stream is open but silent.
    let outcome = new_session(&config, &validator, &observer)
        .run(Arc::new(transport), summary_request(), signal)
        .await;

    assert!(matches!(
        outcome,
        Outcome::Failed(SubmissionError::Transport(TransportError::Timeout(_)))
    ));
    drop(senders);
}

#[tokio::test(start_paused = true)]
async fn zero_idle_timeout_waits_indefinitely() {
    let config = StreamConfig {
        idle_timeout_ms: Some(0),
        ..stream_config()
    };
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let (transport, senders) = ChannelTransport::with_streams(1);
    let (_handle, signal) = CancelSignal::pair();

    let session = new_session(&config, &validator, &observer);
    let task = tokio::spawn(session.run(Arc::new(transport), summary_request(), signal));

    tokio::time::sleep(Duration::from_secs(600)).await;
    senders[0]
        .send(StreamEvent::Fragment("late but fine".into()))
        .await
        .unwrap();
    senders[0].send(StreamEvent::Terminal).await.unwrap();

    let outcome = task.await.unwrap();
    assert_eq!(accepted_text(&outcome), "late but fine");
}

// ---------------------------------------------------------------------------
// Content policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disallowed_section_is_rejected_and_never_published() {
    let mut events = fragments(&[
        "Dear J. Doe, rest and fluids.\n",
        "### Next steps for the doctor\n",
        "- consider throat swab",
    ]);
    events.push(StreamEvent::Terminal);

    let run = run_scripted(events).await;

    match &run.outcome {
        Outcome::Rejected(violation) => {
            assert_eq!(violation.kind, RuleKind::SectionMarker);
            assert_eq!(violation.rule, "next steps for the doctor");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(run.outcome.state(), SessionState::Completed);
    assert!(run.outcome.document().is_none());
    assert_eq!(run.validator.calls(), 1);
    assert!(!run
        .observer
        .updates()
        .iter()
        .any(|u| matches!(u, SessionUpdate::Finished(Outcome::Accepted(_)))));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_while_opening() {
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let (handle, signal) = CancelSignal::pair();

    let session = new_session(&stream_config(), &validator, &observer);
    let task = tokio::spawn(session.run(Arc::new(PendingTransport), summary_request(), signal));

    handle.cancel();
    let outcome = task.await.unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(validator.calls(), 0);
}

#[tokio::test]
async fn cancel_mid_stream_closes_connection() {
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let (transport, senders) = ChannelTransport::with_streams(1);
    let (handle, signal) = CancelSignal::pair();

    let session = new_session(&stream_config(), &validator, &observer);
    let task = tokio::spawn(session.run(Arc::new(transport), summary_request(), signal));

    senders[0]
        .send(StreamEvent::Fragment("Hello".into()))
        .await
        .unwrap();
    while observer.partials().is_empty() {
        tokio::task::yield_now().await;
    }
    handle.cancel();

    assert_eq!(task.await.unwrap(), Outcome::Cancelled);
    tokio::time::timeout(Duration::from_secs(1), senders[0].closed())
        .await
        .expect("event stream should be dropped on cancel");

    // Nothing past the cancel is processed.
    assert!(senders[0].send(StreamEvent::Terminal).await.is_err());
    assert_eq!(validator.calls(), 0);
    assert!(!observer
        .updates()
        .iter()
        .any(|u| matches!(u, SessionUpdate::Finished(Outcome::Accepted(_)))));
}

#[tokio::test]
async fn dropped_cancel_handle_cancels() {
    let observer = RecordingObserver::new();
    let validator = CountingValidator::new();
    let (handle, signal) = CancelSignal::pair();
    drop(handle);

    let outcome = new_session(&stream_config(), &validator, &observer)
        .run(Arc::new(PendingTransport), summary_request(), signal)
        .await;

    assert_eq!(outcome, Outcome::Cancelled);
}

#[tokio::test]
async fn refused_publication_reports_cancelled() {
    let observer = RecordingObserver::new();
    observer.refuse();
    let validator = CountingValidator::new();
    let mut events = fragments(&["Hello"]);
    events.push(StreamEvent::Terminal);
    let (_handle, signal) = CancelSignal::pair();

    let outcome = new_session(&stream_config(), &validator, &observer)
        .run(
            Arc::new(ScriptedTransport::new(events)),
            summary_request(),
            signal,
        )
        .await;

    assert_eq!(outcome, Outcome::Cancelled);
    assert!(observer.updates().is_empty());
    assert_eq!(validator.calls(), 0);
}

#[test]
fn cancel_signal_reports_state() {
    let (handle, signal) = CancelSignal::pair();
    assert!(!signal.is_cancelled());
    handle.cancel();
    assert!(signal.is_cancelled());

    let (handle, signal) = CancelSignal::pair();
    drop(handle);
    assert!(signal.is_cancelled());
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[test]
fn terminal_states_have_no_successors() {
    use SessionState::*;
    let all = [Idle, Streaming, Finalizing, Completed, Failed, Cancelled];
    for from in [Completed, Failed, Cancelled] {
        assert!(from.is_terminal());
        for to in all {
            assert!(!from.can_advance_to(to), "{from} -> {to}");
        }
    }
}

#[test]
fn legal_transitions() {
    use SessionState::*;
    assert!(Idle.can_advance_to(Streaming));
    assert!(Idle.can_advance_to(Failed));
    assert!(Idle.can_advance_to(Cancelled));
    assert!(Streaming.can_advance_to(Streaming));
    assert!(Streaming.can_advance_to(Finalizing));
    assert!(Finalizing.can_advance_to(Completed));
    assert!(!Idle.can_advance_to(Completed));
    assert!(!Streaming.can_advance_to(Completed));
    assert!(!Idle.can_advance_to(Finalizing));
}
