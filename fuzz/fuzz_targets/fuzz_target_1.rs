#![no_main]

use libfuzzer_sys::fuzz_target;
use source_rcon::Packet;

fuzz_target!(|data: &[u8]| {
    // Parsing must never panic, whatever the size prefix claims
    let _ = Packet::from_bytes(data);
});
