// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::packet::*;
use crate::protocol::state::*;

const PASSWORD: &str = "hunter2";

fn authenticated() -> ConnectionState {
    let mut state = ConnectionState::default();
    let step = state.on_packet(&Packet::new(1, SERVERDATA_AUTH, PASSWORD), PASSWORD);
    assert!(matches!(step, Step::Reply(_)));
    state
}

fn execute(state: &mut ConnectionState, id: i32, body: &str) -> CommandRequest {
    match state.on_packet(&Packet::new(id, SERVERDATA_EXECCOMMAND, body), PASSWORD) {
        Step::Execute(request) => request,
        other => panic!("Expected Execute, got {other:?}"),
    }
}

#[test]
fn test_auth_success_sends_ack_then_response() {
    let mut state = ConnectionState::default();
    let step = state.on_packet(&Packet::new(42, SERVERDATA_AUTH, PASSWORD), PASSWORD);

    assert_eq!(
        step,
        Step::Reply(vec![
            Packet::empty(42, SERVERDATA_RESPONSE_VALUE),
            Packet::empty(42, SERVERDATA_AUTH_RESPONSE),
        ])
    );
    assert_eq!(state.phase(), SessionPhase::Authenticated);
}

#[test]
fn test_auth_failure_sends_minus_one_and_closes() {
    let mut state = ConnectionState::default();
    let step = state.on_packet(&Packet::new(42, SERVERDATA_AUTH, "wrong"), PASSWORD);

    assert_eq!(
        step,
        Step::ReplyAndClose(vec![
            Packet::empty(42, SERVERDATA_RESPONSE_VALUE),
            Packet::empty(AUTH_FAILURE_ID, SERVERDATA_AUTH_RESPONSE),
        ])
    );
    assert_eq!(state.phase(), SessionPhase::Closed);
}

#[test]
fn test_password_match_is_exact() {
    let mut state = ConnectionState::default();
    let step = state.on_packet(&Packet::new(1, SERVERDATA_AUTH, "Hunter2"), PASSWORD);
    assert!(matches!(step, Step::ReplyAndClose(_)));
}

#[test]
fn test_command_before_auth_is_rejected() {
    let mut state = ConnectionState::default();
    let step = state.on_packet(&Packet::new(9, SERVERDATA_EXECCOMMAND, "list"), PASSWORD);

    assert_eq!(
        step,
        Step::ReplyAndClose(vec![Packet::empty(AUTH_FAILURE_ID, SERVERDATA_AUTH_RESPONSE)])
    );
    assert_eq!(state.phase(), SessionPhase::Closed);
}

#[test]
fn test_more_data_before_auth_is_rejected() {
    let mut state = ConnectionState::default();
    let step = state.on_packet(&Packet::empty(9, SERVERDATA_RESPONSE_VALUE), PASSWORD);
    assert!(matches!(step, Step::ReplyAndClose(ref p) if p.len() == 1));
}

#[test]
fn test_empty_command_replies_immediately() {
    let mut state = authenticated();
    let step = state.on_packet(&Packet::empty(5, SERVERDATA_EXECCOMMAND), PASSWORD);
    assert_eq!(
        step,
        Step::Reply(vec![Packet::empty(5, SERVERDATA_RESPONSE_VALUE)])
    );
    assert!(state.is_authenticated());
}

#[test]
fn test_whitespace_command_reaches_executor() {
    let mut state = authenticated();
    let request = execute(&mut state, 5, "   ");
    assert_eq!(request.request_id, 5);
    assert_eq!(request.command.name, "");
    assert!(request.command.args.is_empty());
}

#[test]
fn test_command_is_split_into_name_and_args() {
    let mut state = authenticated();
    let request = execute(&mut state, 6, "time set day");
    assert_eq!(request.request_id, 6);
    assert_eq!(request.command.name, "time");
    assert_eq!(request.command.args, vec!["set", "day"]);
}

#[test]
fn test_large_result_is_paginated() {
    let mut state = authenticated();
    let request = execute(&mut state, 7, "dump");

    let status: String = (0..10_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let first = state.complete(request.request_id, &status);
    assert_eq!(first.id, 7);
    assert_eq!(first.body.len(), 4083);
    assert_eq!(state.pending_len(), 2);

    let mut bodies = vec![first.body];
    for _ in 0..2 {
        match state.on_packet(&Packet::empty(8, SERVERDATA_RESPONSE_VALUE), PASSWORD) {
            Step::Reply(packets) => {
                assert_eq!(packets.len(), 1);
                assert_eq!(packets[0].id, 7);
                bodies.push(packets[0].body.clone());
            }
            other => panic!("Unexpected step {other:?}"),
        }
    }

    assert_eq!(bodies.len(), 3);
    assert_eq!(bodies.concat(), status);

    // Drained: next request gets an empty packet echoing its own id
    let step = state.on_packet(&Packet::empty(8, SERVERDATA_RESPONSE_VALUE), PASSWORD);
    assert_eq!(
        step,
        Step::Reply(vec![Packet::empty(8, SERVERDATA_RESPONSE_VALUE)])
    );
    assert_eq!(state.pending_len(), 0);
}

#[test]
fn test_more_data_with_nothing_pending() {
    let mut state = authenticated();
    let step = state.on_packet(&Packet::empty(11, SERVERDATA_RESPONSE_VALUE), PASSWORD);
    assert_eq!(
        step,
        Step::Reply(vec![Packet::empty(11, SERVERDATA_RESPONSE_VALUE)])
    );
    assert_eq!(state.pending_len(), 0);
}

#[test]
fn test_new_command_discards_pending_chunks() {
    let mut state = authenticated();
    let request = execute(&mut state, 1, "dump");
    state.complete(request.request_id, &"z".repeat(9000));
    assert_eq!(state.pending_len(), 2);

    execute(&mut state, 2, "list");
    assert_eq!(state.pending_len(), 0);
}

#[test]
fn test_reauth_discards_pending_and_keeps_session() {
    let mut state = authenticated();
    let request = execute(&mut state, 1, "dump");
    state.complete(request.request_id, &"z".repeat(9000));

    let step = state.on_packet(&Packet::new(3, SERVERDATA_AUTH, PASSWORD), PASSWORD);
    assert!(matches!(step, Step::Reply(ref p) if p.len() == 2));
    assert_eq!(state.pending_len(), 0);
    assert!(state.is_authenticated());
}

#[test]
fn test_bad_reauth_closes_authenticated_session() {
    let mut state = authenticated();
    let step = state.on_packet(&Packet::new(3, SERVERDATA_AUTH, "nope"), PASSWORD);
    assert!(matches!(step, Step::ReplyAndClose(_)));
    assert_eq!(state.phase(), SessionPhase::Closed);
}

#[test]
fn test_per_session_state_isolation() {
    let mut first = authenticated();
    let mut second = ConnectionState::default();

    let request = execute(&mut first, 1, "dump");
    first.complete(request.request_id, &"q".repeat(5000));

    assert_eq!(first.pending_len(), 1);
    assert_eq!(second.pending_len(), 0);
    assert!(!second.is_authenticated());

    let step = second.on_packet(&Packet::empty(2, SERVERDATA_RESPONSE_VALUE), PASSWORD);
    assert!(matches!(step, Step::ReplyAndClose(_)));
    assert_eq!(first.pending_len(), 1);
}
