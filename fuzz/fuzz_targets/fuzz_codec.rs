#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use source_rcon::PacketCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = PacketCodec::default();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
