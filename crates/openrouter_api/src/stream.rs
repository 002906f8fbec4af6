use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};

use crate::error::TransportError;
use crate::sse::{DecodedFrame, SseDeltaDecoder};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Lazy, finite, non-restartable sequence of text deltas decoded from one
/// streamed response body.
///
/// The body is released as soon as `[DONE]`, an in-band error, or a transport
/// failure is observed, and on drop when the consumer stops early. Once the
/// stream has yielded `None` it keeps yielding `None`.
pub struct DeltaStream {
    body: Option<ByteStream>,
    decoder: SseDeltaDecoder,
    ready: VecDeque<String>,
    failure: Option<TransportError>,
}

impl DeltaStream {
    /// Wrap any byte-chunk stream, such as `reqwest::Response::bytes_stream`.
    pub fn new<S, B, E>(body: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]>,
        E: Into<TransportError>,
    {
        let body = body.map(|chunk| chunk.map(|bytes| bytes.as_ref().to_vec()).map_err(Into::into));
        Self {
            body: Some(Box::pin(body)),
            decoder: SseDeltaDecoder::default(),
            ready: VecDeque::new(),
            failure: None,
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// True once the underlying body has been dropped.
    pub fn is_released(&self) -> bool {
        self.body.is_none()
    }

    /// Drain the stream, concatenating every delta.
    pub async fn collect_text(mut self) -> Result<String, TransportError> {
        let mut text = String::new();
        while let Some(delta) = self.next().await {
            text.push_str(&delta?);
        }
        Ok(text)
    }

    fn absorb(&mut self, frames: Vec<DecodedFrame>) {
        for frame in frames {
            match frame {
                DecodedFrame::Delta(delta) => self.ready.push_back(delta),
                DecodedFrame::Done => {
                    self.body = None;
                    return;
                }
                DecodedFrame::Failed { code, message } => {
                    self.body = None;
                    self.failure = Some(TransportError::StreamFailed { code, message });
                    return;
                }
            }
        }
    }
}

impl Stream for DeltaStream {
    type Item = Result<String, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(delta) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            if let Some(error) = this.failure.take() {
                return Poll::Ready(Some(Err(error)));
            }
            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match body.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => {
                    let frames = this.decoder.feed(&bytes);
                    this.absorb(frames);
                }
                Poll::Ready(Some(Err(error))) => {
                    this.body = None;
                    this.failure = Some(error);
                }
                Poll::Ready(None) => {
                    this.body = None;
                    let frames = this.decoder.finish();
                    this.absorb(frames);
                }
            }
        }
    }
}

impl fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaStream")
            .field("released", &self.is_released())
            .field("ready", &self.ready.len())
            .field("failed", &self.failure.is_some())
            .finish()
    }
}
