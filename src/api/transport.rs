//! Purpose: Move wire documents to and from the service endpoint.
//! Exports: `Transport`, `EventSource`, `StreamRead`, `HttpTransport`.
//! Role: The only I/O seam; the executor and sessions see documents, never sockets.
//! Invariants: Transport failures surface as `ErrorKind::Transport` and are never retried here.
//! Invariants: Streams are JSONL (one object-notation document per line).
//! Invariants: Closing a stream drops its socket within one stream read slice.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use crate::core::wire::{WireDocument, WireFormat};
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use url::Url;

type ApiResult<T> = Result<T, Error>;

/// Socket read timeout on streaming connections; bounds how long a closed stream lingers.
/// It also bounds the wait for the stream's response headers.
pub const DEFAULT_STREAM_READ_SLICE: Duration = Duration::from_secs(1);

/// One read from a long-lived notification stream.
#[derive(Debug)]
pub enum StreamRead {
    Document(WireDocument),
    /// Nothing arrived within the requested wait.
    Idle,
    /// The server or the caller closed the stream.
    Closed,
}

pub trait EventSource: Send {
    fn next_document(&mut self, wait: Duration) -> ApiResult<StreamRead>;

    fn close(&mut self) {}
}

pub trait Transport {
    /// Sends one request document and returns the response document.
    fn send(&self, document: &WireDocument, operation: &str) -> ApiResult<WireDocument>;

    fn open_stream(
        &self,
        document: &WireDocument,
        operation: &str,
    ) -> ApiResult<Box<dyn EventSource>> {
        let _ = document;
        Err(Error::new(ErrorKind::Transport)
            .with_operation(operation)
            .with_message("transport does not support streaming"))
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, document: &WireDocument, operation: &str) -> ApiResult<WireDocument> {
        (**self).send(document, operation)
    }

    fn open_stream(
        &self,
        document: &WireDocument,
        operation: &str,
    ) -> ApiResult<Box<dyn EventSource>> {
        (**self).open_stream(document, operation)
    }
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

#[derive(Clone, Debug)]
struct HttpTransportInner {
    endpoint: Url,
    token: Option<String>,
    agent: ureq::Agent,
    stream_agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> ApiResult<Self> {
        let endpoint = parse_endpoint(endpoint.into())?;
        Ok(Self {
            inner: Arc::new(HttpTransportInner {
                endpoint,
                token: None,
                agent: ureq::AgentBuilder::new().build(),
                stream_agent: stream_agent(DEFAULT_STREAM_READ_SLICE),
            }),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.inner_mut().token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner_mut().agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self
    }

    /// Read timeout for streaming connections; a closed stream's socket is dropped
    /// within one slice.
    pub fn with_stream_read_slice(mut self, slice: Duration) -> Self {
        self.inner_mut().stream_agent = stream_agent(slice);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    fn inner_mut(&mut self) -> &mut HttpTransportInner {
        Arc::make_mut(&mut self.inner)
    }

    fn post(
        &self,
        agent: &ureq::Agent,
        document: &WireDocument,
    ) -> Result<ureq::Response, ureq::Error> {
        let mut request = agent
            .post(self.inner.endpoint.as_str())
            .set("Content-Type", document.format.content_type())
            .set("Accept", document.format.content_type());
        if let Some(token) = &self.inner.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request.send_string(&document.body)
    }
}

impl Transport for HttpTransport {
    fn send(&self, document: &WireDocument, operation: &str) -> ApiResult<WireDocument> {
        match self.post(&self.inner.agent, document) {
            Ok(response) => read_document(response, document.format, operation),
            // Service faults travel as 500 with a document body; let the decoder report them.
            Err(ureq::Error::Status(500, response)) => {
                let reply = read_document(response, document.format, operation)?;
                if reply.is_empty() {
                    return Err(status_error(500, operation));
                }
                Ok(reply)
            }
            Err(ureq::Error::Status(code, _)) => Err(status_error(code, operation)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Transport)
                .with_operation(operation)
                .with_message("request failed")
                .with_source(err)),
        }
    }

    fn open_stream(
        &self,
        document: &WireDocument,
        operation: &str,
    ) -> ApiResult<Box<dyn EventSource>> {
        if document.format != WireFormat::ObjectNotation {
            return Err(Error::new(ErrorKind::Usage)
                .with_operation(operation)
                .with_message("streaming requires the json wire format"));
        }
        let response = match self.post(&self.inner.stream_agent, document) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(status_error(code, operation)),
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Transport)
                    .with_operation(operation)
                    .with_message("failed to open stream")
                    .with_source(err));
            }
        };
        Ok(Box::new(LineStream::spawn(response.into_reader())))
    }
}

fn stream_agent(read_slice: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout_read(read_slice).build()
}

/// Reads JSONL on a background thread so waits can time out.
struct LineStream {
    lines: Option<Receiver<ApiResult<String>>>,
    stop: Arc<AtomicBool>,
}

impl LineStream {
    fn spawn(reader: Box<dyn Read + Send + Sync + 'static>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let reader_stop = Arc::clone(&stop);
        thread::spawn(move || {
            read_lines(BufReader::new(reader), &sender, &reader_stop);
            tracing::debug!("stream reader finished");
        });
        Self {
            lines: Some(receiver),
            stop,
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.lines = None;
    }
}

/// Forwards complete lines until EOF, an error, or `stop`. Read timeouts only
/// re-check `stop`; a partial line survives them. Returning drops the reader.
fn read_lines<R: BufRead>(
    mut reader: R,
    sender: &Sender<ApiResult<String>>,
    stop: &AtomicBool,
) {
    let mut line = Vec::new();
    while !stop.load(Ordering::SeqCst) {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line).trim().to_string();
                line.clear();
                if text.is_empty() {
                    continue;
                }
                if sender.send(Ok(text)).is_err() {
                    break;
                }
            }
            Err(err) if is_read_timeout(&err) => continue,
            Err(err) => {
                let _ = sender.send(Err(Error::new(ErrorKind::Transport)
                    .with_message("failed to read stream")
                    .with_source(err)));
                break;
            }
        }
    }
}

fn is_read_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

impl EventSource for LineStream {
    fn next_document(&mut self, wait: Duration) -> ApiResult<StreamRead> {
        let Some(lines) = self.lines.as_ref() else {
            return Ok(StreamRead::Closed);
        };
        match lines.recv_timeout(wait) {
            Ok(Ok(line)) => Ok(StreamRead::Document(WireDocument::new(
                WireFormat::ObjectNotation,
                line,
            ))),
            Ok(Err(err)) => {
                self.stop();
                Err(err)
            }
            Err(RecvTimeoutError::Timeout) => Ok(StreamRead::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                self.stop();
                Ok(StreamRead::Closed)
            }
        }
    }

    fn close(&mut self) {
        self.stop();
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn read_document(
    response: ureq::Response,
    format: WireFormat,
    operation: &str,
) -> ApiResult<WireDocument> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_operation(operation)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    Ok(WireDocument::new(format, body))
}

fn status_error(status: u16, operation: &str) -> Error {
    let err = Error::new(ErrorKind::Transport)
        .with_operation(operation)
        .with_message(format!("endpoint returned status {status}"));
    match status {
        401 | 403 => err.with_hint("Check the credentials passed with --token."),
        _ => err,
    }
}

fn parse_endpoint(raw: String) -> ApiResult<Url> {
    let url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid endpoint url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("endpoint url must use http or https scheme")
        );
    }
    Ok(url)
}
