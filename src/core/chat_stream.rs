//! Server-Sent-Events decoding for streamed completions.
//!
//! Network reads rarely line up with event boundaries, so bytes are buffered
//! until a full `\n`-terminated line is available. Every complete `data:`
//! line is validated on its own; a line that fails validation is skipped
//! and never aborts the stream.

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use tracing::{debug, warn};

use crate::api::validate::validate_chunk;
use crate::api::Usage;
use crate::core::error::ChatError;

/// Payload of the terminal event.
pub const DONE_SENTINEL: &str = "[DONE]";

const UNKNOWN_FINISH_REASON: &str = "unknown";

/// Outcome of one completion, streamed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResult {
    pub content: String,
    pub usage: Usage,
    pub finish_reason: String,
}

/// Byte buffer that hands out complete lines and keeps the trailing partial one.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and drain every line terminated inside the buffer.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(line) = decode_line(&raw[..newline_pos]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Take whatever is left once the transport has no more data.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.trim_end_matches('\r').to_string()),
        Err(err) => {
            warn!(error = %err, len = bytes.len(), "Skipping stream line with invalid UTF-8");
            None
        }
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// What a single line contributed to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Blank,
    Sentinel,
    /// Not a `data:` line (comments, `event:` fields, stray text).
    Ignored,
    Chunk,
    Skipped,
}

/// Running state of one streamed completion.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    finish_reason: Option<String>,
    chunks: usize,
    skipped: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one complete line. Non-empty delta text is appended and passed to
    /// `on_content` as that fragment alone.
    pub fn process_line(&mut self, line: &str, on_content: &mut dyn FnMut(&str)) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Blank;
        }

        let Some(payload) = extract_data_payload(line) else {
            return LineOutcome::Ignored;
        };

        if payload == DONE_SENTINEL {
            return LineOutcome::Sentinel;
        }
        if payload.is_empty() {
            return LineOutcome::Blank;
        }

        match validate_chunk(payload) {
            Ok(chunk) => {
                self.chunks += 1;
                if let Some(choice) = chunk.choices.first() {
                    if let Some(fragment) = choice.delta.content.as_deref() {
                        if !fragment.is_empty() {
                            self.content.push_str(fragment);
                            on_content(fragment);
                        }
                    }
                    if let Some(reason) = choice.finish_reason.as_deref() {
                        if !reason.is_empty() {
                            self.finish_reason = Some(reason.to_string());
                        }
                    }
                }
                LineOutcome::Chunk
            }
            Err(err) => {
                self.skipped += 1;
                if payload.contains("\"error\"") {
                    warn!(
                        error = %err,
                        summary = %crate::core::error::summarize_api_error(payload),
                        "Skipping error event in completion stream"
                    );
                } else {
                    debug!(error = %err, "Skipping malformed stream chunk");
                }
                LineOutcome::Skipped
            }
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Usage is zeroed: the service does not report it mid-stream.
    pub fn finish(self) -> ChatResult {
        ChatResult {
            content: self.content,
            usage: Usage::default(),
            finish_reason: self
                .finish_reason
                .unwrap_or_else(|| UNKNOWN_FINISH_REASON.to_string()),
        }
    }
}

/// Drain a byte stream of SSE events into a [`ChatResult`].
///
/// Fragments reach `on_content` in decode order, and the final content is
/// exactly their concatenation. A read error from the transport ends the
/// stream with that error.
pub async fn decode_stream<S, B, E, F>(mut stream: S, mut on_content: F) -> Result<ChatResult, ChatError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ChatError>,
    F: FnMut(&str),
{
    let mut lines = LineBuffer::new();
    let mut accumulator = StreamAccumulator::new();

    while let Some(next) = stream.next().await {
        let bytes = next.map_err(Into::into)?;
        for line in lines.push(bytes.as_ref()) {
            accumulator.process_line(&line, &mut on_content);
        }
    }

    if let Some(rest) = lines.finish() {
        accumulator.process_line(&rest, &mut on_content);
    }

    debug!(
        chunks = accumulator.chunks,
        skipped = accumulator.skipped,
        content_len = accumulator.content.len(),
        "Completion stream finished"
    );
    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunk_line(content: &str) -> String {
        format!(
            "data: {{\"id\":\"c\",\"created\":1,\"model\":\"m\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n",
            serde_json::to_string(content).unwrap()
        )
    }

    fn finish_line(reason: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{}},\"finish_reason\":\"{reason}\"}}]}}\n"
        )
    }

    async fn decode(reads: Vec<Vec<u8>>) -> (Vec<String>, ChatResult) {
        let mut fragments = Vec::new();
        let result = decode_stream(
            stream::iter(reads.into_iter().map(Ok::<_, ChatError>)),
            |fragment: &str| fragments.push(fragment.to_string()),
        )
        .await
        .expect("stream should decode");
        (fragments, result)
    }

    #[tokio::test]
    async fn fragments_arrive_in_order_and_empty_deltas_are_silent() {
        let body = [
            chunk_line("He"),
            chunk_line("llo"),
            chunk_line(""),
            chunk_line(" world"),
            "data: [DONE]\n".to_string(),
        ]
        .concat();

        let (fragments, result) = decode(vec![body.into_bytes()]).await;
        assert_eq!(fragments, vec!["He", "llo", " world"]);
        assert_eq!(result.content, "Hello world");
        assert_eq!(result.content, fragments.concat());
        assert_eq!(result.usage, Usage::default());
        assert_eq!(result.finish_reason, "unknown");
    }

    #[tokio::test]
    async fn lines_split_across_reads_are_reassembled() {
        let body = [chunk_line("alpha"), chunk_line("beta"), finish_line("stop")].concat();
        let reads = body
            .as_bytes()
            .chunks(7)
            .map(<[u8]>::to_vec)
            .collect::<Vec<_>>();

        let (fragments, result) = decode(reads).await;
        assert_eq!(fragments, vec!["alpha", "beta"]);
        assert_eq!(result.finish_reason, "stop");
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_reads_survive() {
        let body = chunk_line("héllo ✓");
        let bytes = body.into_bytes();
        let split = bytes
            .iter()
            .position(|b| *b == 0xE2)
            .expect("check mark start byte")
            + 1;
        let reads = vec![bytes[..split].to_vec(), bytes[split..].to_vec()];

        let (fragments, result) = decode(reads).await;
        assert_eq!(fragments, vec!["héllo ✓"]);
        assert_eq!(result.content, "héllo ✓");
    }

    #[tokio::test]
    async fn malformed_chunk_between_valid_chunks_is_skipped() {
        let body = [
            chunk_line("one"),
            "data: {\"choices\":[{\"delta\":{\"content\":\"tw\n".to_string(),
            "data: not json at all\n".to_string(),
            chunk_line(" two"),
        ]
        .concat();

        let (fragments, result) = decode(vec![body.into_bytes()]).await;
        assert_eq!(fragments, vec!["one", " two"]);
        assert_eq!(result.content, "one two");
    }

    #[tokio::test]
    async fn latest_finish_reason_wins() {
        let body = [chunk_line("x"), finish_line("length"), finish_line("stop")].concat();
        let (_, result) = decode(vec![body.into_bytes()]).await;
        assert_eq!(result.finish_reason, "stop");
    }

    #[tokio::test]
    async fn final_line_without_newline_is_processed() {
        let mut body = chunk_line("tail");
        body.pop();
        let (fragments, _) = decode(vec![body.into_bytes()]).await;
        assert_eq!(fragments, vec!["tail"]);
    }

    #[tokio::test]
    async fn truncated_final_line_is_dropped_without_error() {
        let body = [chunk_line("kept"), "data: {\"choices\":[{\"del".to_string()].concat();
        let (fragments, result) = decode(vec![body.into_bytes()]).await;
        assert_eq!(fragments, vec!["kept"]);
        assert_eq!(result.content, "kept");
    }

    #[tokio::test]
    async fn crlf_terminators_and_compact_prefix_are_accepted() {
        let body = "data:{\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\r\n\r\n: keep-alive\r\ndata: [DONE]\r\n";
        let (fragments, _) = decode(vec![body.as_bytes().to_vec()]).await;
        assert_eq!(fragments, vec!["A"]);
    }

    #[tokio::test]
    async fn transport_errors_end_the_stream() {
        let reads = vec![
            Ok(chunk_line("partial").into_bytes()),
            Err(ChatError::Http {
                status: 500,
                body: "reset".to_string(),
            }),
        ];
        let mut fragments = Vec::new();
        let err = decode_stream(stream::iter(reads), |fragment: &str| {
            fragments.push(fragment.to_string())
        })
        .await
        .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(fragments, vec!["partial"]);
    }

    #[test]
    fn line_buffer_keeps_partial_segment() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {").is_empty());
        assert_eq!(buffer.pending_len(), 7);
        assert_eq!(buffer.push(b"}\ndata: x"), vec!["data: {}"]);
        assert_eq!(buffer.finish().as_deref(), Some("data: x"));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn finish_reason_only_chunk_without_delta_is_accepted() {
        let mut accumulator = StreamAccumulator::new();
        let mut sink = |_: &str| {};
        assert_eq!(
            accumulator.process_line(
                r#"data: {"id":"c","choices":[{"index":0,"finish_reason":"stop"}]}"#,
                &mut sink
            ),
            LineOutcome::Chunk
        );
        assert_eq!(accumulator.skipped(), 0);
        assert_eq!(accumulator.finish().finish_reason, "stop");
    }

    #[test]
    fn accumulator_reports_line_outcomes() {
        let mut accumulator = StreamAccumulator::new();
        let mut sink = |_: &str| {};
        assert_eq!(accumulator.process_line("", &mut sink), LineOutcome::Blank);
        assert_eq!(
            accumulator.process_line("data: [DONE]", &mut sink),
            LineOutcome::Sentinel
        );
        assert_eq!(
            accumulator.process_line("event: message", &mut sink),
            LineOutcome::Ignored
        );
        assert_eq!(
            accumulator.process_line("data: {\"error\":{\"message\":\"boom\"}}", &mut sink),
            LineOutcome::Skipped
        );
        assert_eq!(accumulator.skipped(), 1);
        assert_eq!(accumulator.content(), "");
    }
}
