use std::fmt;

use futures::StreamExt as _;
use futures::stream;

use crate::codec::FrameDecoder;
use crate::errors::RelayError;
use crate::frame::Frame;

/// Incrementally decodes frames from a chunked byte stream.
///
/// Each decoded frame is handed to the caller before another chunk is read.
/// After the first error the consumer is fused and only yields `None`.
pub struct StreamConsumer<S> {
    chunks: S,
    decoder: FrameDecoder,
    done: bool,
}

impl<S, B, E> StreamConsumer<S>
where
    S: futures::Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    pub fn new(chunks: S) -> Self {
        Self {
            chunks,
            decoder: FrameDecoder::default(),
            done: false,
        }
    }

    /// Returns the next frame, `Ok(None)` at a clean end of stream.
    ///
    /// Bytes left over at end of stream are a `FrameError::Truncated`.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, RelayError> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => {}
                Err(err) => {
                    self.done = true;
                    return Err(err.into());
                }
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.decoder.push(chunk.as_ref()),
                Some(Err(err)) => {
                    self.done = true;
                    return Err(RelayError::Transport(format!(
                        "frame stream read failed: {err}"
                    )));
                }
                None => {
                    self.done = true;
                    self.decoder.finish()?;
                    return Ok(None);
                }
            }
        }
    }

    /// Bytes received but not yet decoded.
    pub fn buffered_len(&self) -> usize {
        self.decoder.buffered_len()
    }

    /// Adapts the consumer into a `Stream` of decoded frames.
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<Frame, RelayError>> {
        stream::try_unfold(self, |mut consumer| async move {
            Ok(consumer.next_frame().await?.map(|frame| (frame, consumer)))
        })
    }
}
