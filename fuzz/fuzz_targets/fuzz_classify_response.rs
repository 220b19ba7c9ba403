#![no_main]

//! Fuzz target for the LLM reply parser.
//!
//! Provider output is untrusted text. Parsing must never panic, including on
//! fence markers split across multi-byte characters.

use libfuzzer_sys::fuzz_target;

use supportdesk::classify::parse_response;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_response(text);
        let fenced = format!("```json\n{}\n```", text);
        let _ = parse_response(&fenced);
    }
});
