//! Identifiers for stored chats and messages: `<prefix>_<millis>_<suffix>`.

use chrono::Utc;

const SUFFIX_LEN: usize = 7;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_suffix() -> String {
    let mut bytes = [0u8; SUFFIX_LEN];
    if getrandom::fill(&mut bytes).is_err() {
        // Entropy unavailable: derive something unique enough from the clock.
        let nanos = Utc::now().timestamp_subsec_nanos().to_le_bytes();
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = nanos[i % nanos.len()].wrapping_add(i as u8 * 31);
        }
    }
    bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

fn generate(prefix: &str) -> String {
    format!(
        "{prefix}_{}_{}",
        Utc::now().timestamp_millis(),
        random_suffix()
    )
}

pub fn chat_id() -> String {
    generate("chat")
}

pub fn message_id() -> String {
    generate("msg")
}
