//! Line-delimited JSON-RPC over stdin/stdout.

use super::Transport;
use crate::error::Result;
use crate::protocol::{INVALID_REQUEST, JsonRpcResponse, PARSE_ERROR, RpcHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Longest accepted line, newline excluded.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// What one input line turned into.
#[derive(Debug, PartialEq)]
pub enum Frame {
    /// Trimmed text to hand to the envelope handler.
    Envelope(String),
    /// The line could not be decoded; the response goes out as-is.
    Rejected(JsonRpcResponse),
}

/// One JSON envelope per line in, one response per line out.
pub struct LineChannel<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
    max_line: usize,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
            max_line: MAX_LINE_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Next non-blank line, or `None` at end of input.
    ///
    /// Lines that are not UTF-8 or longer than the limit come back as [`Frame::Rejected`] so
    /// the caller can answer them and keep reading.
    ///
    /// # Errors
    ///
    /// Only I/O failures of the underlying reader.
    pub async fn receive_envelope(&mut self) -> Result<Option<Frame>> {
        loop {
            let Some(truncated) = self.read_line().await? else {
                return Ok(None);
            };
            if truncated {
                warn!(limit = self.max_line, "dropping oversized line");
                return Ok(Some(Frame::Rejected(JsonRpcResponse::failure(
                    Value::Null,
                    INVALID_REQUEST,
                    format!("Invalid request: line exceeds {} bytes", self.max_line),
                ))));
            }
            match std::str::from_utf8(&self.line) {
                Ok(text) if text.trim().is_empty() => {}
                Ok(text) => return Ok(Some(Frame::Envelope(text.trim().to_string()))),
                Err(e) => {
                    debug!(error = %e, "line is not valid UTF-8");
                    return Ok(Some(Frame::Rejected(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        "Parse error: line is not valid UTF-8",
                    ))));
                }
            }
        }
    }

    /// Read up to the next `\n` into `self.line`, keeping at most `max_line` bytes.
    ///
    /// Returns `None` at end of input, otherwise whether the line was over the limit. The
    /// remainder of an oversized line is consumed and discarded.
    async fn read_line(&mut self) -> Result<Option<bool>> {
        self.line.clear();
        let mut truncated = false;
        let mut read_any = false;
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(read_any.then_some(truncated));
            }
            read_any = true;
            let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };
            if !truncated {
                if self.line.len() + chunk.len() > self.max_line {
                    truncated = true;
                    self.line.clear();
                } else {
                    self.line.extend_from_slice(chunk);
                }
            }
            self.reader.consume(used);
            if done {
                return Ok(Some(truncated));
            }
        }
    }

    pub async fn send_result(&mut self, response: &JsonRpcResponse) -> Result<()> {
        let mut payload = response.to_json_string();
        payload.push('\n');
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Serve until end of input. Requests are handled one at a time.
    pub async fn serve(&mut self, rpc: &RpcHandler) -> Result<()> {
        while let Some(frame) = self.receive_envelope().await? {
            let response = match frame {
                Frame::Envelope(line) => rpc.handle_payload(&line).await,
                Frame::Rejected(response) => Some(response),
            };
            if let Some(response) = response {
                self.send_result(&response).await?;
            } else {
                debug!("no response for notification");
            }
        }
        Ok(())
    }
}

pub struct StdioTransport;

#[async_trait]
impl Transport for StdioTransport {
    fn name(&self) -> &'static str {
        "stdio"
    }

    async fn run(self: Box<Self>, rpc: Arc<RpcHandler>) -> Result<()> {
        info!(transport = self.name(), "serving");
        let mut channel = LineChannel::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
        channel.serve(&rpc).await?;
        info!("stdin closed, shutting down");
        Ok(())
    }
}
