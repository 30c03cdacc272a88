//! The in-flight response of a single request
//!
//! [`ResponseChannel`] stages status, headers and body until the head is transmitted.
//! Callbacks registered with [`ResponseChannel::on_starting`] run exactly once, right
//! before that happens, and may still rewrite the headers.

use crate::error::ResponseError;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub mod finalizer;
pub mod serializer;

pub use finalizer::{ResponseFinalizer, clear_cache_headers};
pub use serializer::{JsonSerializer, PayloadSerializer};

type OnStarting = Box<dyn FnOnce(&mut HeaderMap) + Send>;

struct ChannelState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    started: bool,
    aborted: Option<String>,
    on_starting: Vec<OnStarting>,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            started: false,
            aborted: None,
            on_starting: Vec::new(),
        }
    }
}

impl ChannelState {
    fn ensure_staging(&self) -> Result<(), ResponseError> {
        if let Some(reason) = &self.aborted {
            return Err(ResponseError::Aborted {
                reason: reason.clone(),
            });
        }
        if self.started {
            return Err(ResponseError::AlreadyStarted);
        }
        Ok(())
    }
}

/// Cloneable handle to the response of one request
///
/// Owned by the transport. Every clone refers to the same response.
#[derive(Clone, Default)]
pub struct ResponseChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl ResponseChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the head went out, or the transport gave up on the response.
    pub fn has_started(&self) -> bool {
        let state = self.state.lock();
        state.started || state.aborted.is_some()
    }

    pub fn status(&self) -> StatusCode {
        self.state.lock().status
    }

    pub fn headers(&self) -> HeaderMap {
        self.state.lock().headers.clone()
    }

    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state.lock().body)
    }

    pub fn set_status(&self, status: StatusCode) -> Result<(), ResponseError> {
        let mut state = self.state.lock();
        state.ensure_staging()?;
        state.status = status;
        Ok(())
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) -> Result<(), ResponseError> {
        let mut state = self.state.lock();
        state.ensure_staging()?;
        state.headers.insert(name, value);
        Ok(())
    }

    /// Drop staged status, headers and body. Registered callbacks are kept.
    pub fn clear(&self) -> Result<(), ResponseError> {
        let mut state = self.state.lock();
        state.ensure_staging()?;
        state.status = StatusCode::OK;
        state.headers.clear();
        state.body.clear();
        Ok(())
    }

    /// Register a callback to run once, immediately before the head is transmitted.
    ///
    /// Callbacks run in registration order while the channel is locked; they must not
    /// use the channel themselves.
    pub fn on_starting<F>(&self, callback: F) -> Result<(), ResponseError>
    where
        F: FnOnce(&mut HeaderMap) + Send + 'static,
    {
        let mut state = self.state.lock();
        state.ensure_staging()?;
        state.on_starting.push(Box::new(callback));
        Ok(())
    }

    /// Append to the body. After the head was sent this continues the stream.
    pub fn write(&self, bytes: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.aborted {
            return Err(ResponseError::Aborted {
                reason: reason.clone(),
            });
        }
        state.body.extend_from_slice(bytes.as_ref());
        Ok(())
    }

    /// Transmit the head. The first call drains the `on_starting` callbacks; later calls
    /// are no-ops.
    pub fn flush(&self) -> Result<(), ResponseError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.aborted {
            return Err(ResponseError::Aborted {
                reason: reason.clone(),
            });
        }
        if state.started {
            return Ok(());
        }

        let callbacks = std::mem::take(&mut state.on_starting);
        for callback in callbacks {
            callback(&mut state.headers);
        }
        state.started = true;
        Ok(())
    }

    /// Transport lost the client; nothing more can be written.
    pub fn abort(&self, reason: impl Into<String>) {
        let mut state = self.state.lock();
        state.aborted = Some(reason.into());
        state.on_starting.clear();
    }

    /// Flush and hand the response over to the server.
    pub fn commit(&self) -> Result<Response, ResponseError> {
        self.flush()?;

        let state = self.state.lock();
        let mut response = Response::new(Body::from(state.body.clone()));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers.clone();
        Ok(response)
    }
}

impl std::fmt::Debug for ResponseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ResponseChannel")
            .field("status", &state.status)
            .field("started", &state.started)
            .field("aborted", &state.aborted)
            .field("pending_callbacks", &state.on_starting.len())
            .finish()
    }
}
