#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Boundary conditions for packet parsing, framing and command routing

use bytes::BytesMut;
use source_rcon::core::codec::{Frame, PacketCodec};
use source_rcon::core::packet::{Packet, SERVERDATA_AUTH};
use source_rcon::error::ProtocolError;
use source_rcon::protocol::executor::{Caller, CallerKind, CommandExecutor};
use source_rcon::CommandRegistry;
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// PACKET EDGE CASES
// ============================================================================

#[test]
fn test_empty_body_layout() {
    let bytes = Packet::empty(1, 0).to_bytes();
    assert_eq!(bytes, vec![10, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_negative_id_survives() {
    let packet = Packet::new(-1, 2, "");
    assert_eq!(Packet::from_bytes(&packet.to_bytes()), packet);
}

#[test]
fn test_declared_size_beyond_buffer_is_clamped() {
    let mut bytes = Packet::new(4, 2, "status").to_bytes();
    bytes[0] = 200;
    let packet = Packet::from_bytes(&bytes);
    assert_eq!(packet.id, 4);
    assert_eq!(packet.body, "status");
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let mut bytes = vec![];
    bytes.extend_from_slice(&12i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.extend_from_slice(&[0xff, 0xfe, 0, 0]);
    let packet = Packet::from_bytes(&bytes);
    assert_eq!(packet.body, "\u{fffd}\u{fffd}");
}

#[test]
fn test_multibyte_body_length_in_bytes() {
    let packet = Packet::new(1, 2, "héllo");
    assert_eq!(packet.declared_size(), "héllo".len() + 10);
    assert_eq!(Packet::from_bytes(&packet.to_bytes()).body, "héllo");
}

// ============================================================================
// CODEC EDGE CASES
// ============================================================================

#[test]
fn test_codec_negative_size_is_malformed() {
    let mut codec = PacketCodec::default();
    let mut buf = BytesMut::from(&(-5i32).to_le_bytes()[..]);
    let frame = codec.decode(&mut buf).unwrap();
    assert_eq!(frame, Some(Frame::Malformed { declared_size: -5 }));
    assert!(buf.is_empty());
}

#[test]
fn test_codec_accepts_frame_at_limit() {
    let body = "a".repeat(4096 - 14);
    let packet = Packet::new(1, SERVERDATA_AUTH, body);
    let mut codec = PacketCodec::default();
    let mut buf = BytesMut::new();
    codec.encode(packet.clone(), &mut buf).unwrap();
    assert_eq!(buf.len(), 4096);
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Packet(packet)));
}

#[test]
fn test_codec_rejects_frame_over_limit() {
    let packet = Packet::new(1, 2, "a".repeat(4096 - 13));
    let mut codec = PacketCodec::default();
    let mut buf = BytesMut::from(&packet.to_bytes()[..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::OversizedPacket(4097))
    ));
}

#[test]
fn test_codec_refuses_to_encode_nul() {
    let mut codec = PacketCodec::default();
    let mut buf = BytesMut::new();
    let err = codec.encode(Packet::new(1, 0, "a\0b"), &mut buf).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidBody));
    assert!(buf.is_empty());
}

// ============================================================================
// COMMAND ROUTING
// ============================================================================

#[test]
fn test_registry_unknown_command() {
    let registry = CommandRegistry::new();
    let out = registry.execute("nope", &[], &Caller::console());
    assert_eq!(out, "Unknown command /nope");
}

#[test]
fn test_registry_privilege_check() {
    let registry = CommandRegistry::new();
    registry.register_privileged("kick", "controlserver", |args, _| format!("kicked {}", args.join(" ")));

    let player = Caller {
        kind: CallerKind::Player,
        role: "player".to_string(),
        privileges: vec!["chat".to_string()],
    };
    assert_eq!(
        registry.execute("kick", &["bob".to_string()], &player),
        "Insufficient privileges to run /kick"
    );
    assert_eq!(
        registry.execute("KICK", &["bob".to_string()], &Caller::console()),
        "kicked bob"
    );
}

#[test]
fn test_closure_executor() {
    let executor = |cmd: &str, args: &[String], caller: &Caller| {
        format!("{}:{}:{}", caller.kind, cmd, args.len())
    };
    assert_eq!(
        executor.execute("time", &["set".to_string(), "day".to_string()], &Caller::console()),
        "console:time:2"
    );
}
