#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<trivia_room_client::protocol::GameResults>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<trivia_room_client::protocol::GameResults>(s);
        let _ = serde_json::from_str::<trivia_room_client::protocol::FinishedPlayers>(s);
        let _ = serde_json::from_str::<trivia_room_client::protocol::Progress>(s);
    }
});
