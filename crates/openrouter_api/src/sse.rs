use crate::events::ChatCompletionChunk;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Outcome of decoding one complete `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    Delta(String),
    Done,
    Failed {
        code: Option<String>,
        message: String,
    },
}

/// Incremental, line-buffered decoder for chat-completion SSE bodies.
///
/// Bytes may be split anywhere, including inside a multi-byte character; only
/// complete lines are decoded. Once `[DONE]` or an in-band error is seen the
/// decoder is finished and ignores everything fed afterwards.
#[derive(Debug, Default)]
pub struct SseDeltaDecoder {
    pending: Vec<u8>,
    finished: bool,
}

impl SseDeltaDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }

        self.pending.extend_from_slice(bytes);
        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if self.push_line(&line, &mut frames) {
                break;
            }
        }

        frames
    }

    /// Decode whatever partial line remains once the body has closed.
    pub fn finish(&mut self) -> Vec<DecodedFrame> {
        let mut frames = Vec::new();
        if !self.finished && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.push_line(&line, &mut frames);
        }
        self.finished = true;
        frames
    }

    /// Decode a complete SSE body in one shot.
    pub fn decode_all(input: &str) -> Vec<DecodedFrame> {
        let mut decoder = Self::default();
        let mut frames = decoder.feed(input.as_bytes());
        frames.extend(decoder.finish());
        frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns true when the line terminated the stream.
    fn push_line(&mut self, raw: &[u8], frames: &mut Vec<DecodedFrame>) -> bool {
        let line = String::from_utf8_lossy(raw);
        let Some(frame) = decode_line(&line) else {
            return false;
        };

        let terminal = !matches!(frame, DecodedFrame::Delta(_));
        frames.push(frame);
        if terminal {
            self.finished = true;
            self.pending.clear();
        }
        terminal
    }
}

fn decode_line(line: &str) -> Option<DecodedFrame> {
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(DecodedFrame::Done);
    }

    // Frames that fail to parse are dropped; the next line may still be good.
    let chunk = serde_json::from_str::<ChatCompletionChunk>(payload).ok()?;
    if let Some(error) = chunk.error.as_ref() {
        return Some(DecodedFrame::Failed {
            code: error.code(),
            message: error.message_or_default(),
        });
    }

    chunk
        .delta_content()
        .map(|content| DecodedFrame::Delta(content.to_owned()))
}
