// Copyright 2018 Parity Technologies (UK) Ltd.
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Error types that can result from a chat session.

use std::time::Duration;

use thiserror::Error;

use crate::types::DataName;

/// Error returned by user operations on a [`Session`](crate::Session).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// `leave` was already called; nothing more can be published.
    #[error("the session has already left the room")]
    AlreadyLeft,
}

/// A fetched payload could not be decoded.
#[derive(Debug, Error)]
#[error("malformed chat payload")]
pub struct DecodeError(#[from] serde_json::Error);

/// A data name could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Fewer than the three required components (prefix, session, sequence number).
    #[error("data name '{0}' needs a prefix, a session id and a sequence number")]
    TooShort(String),
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
}

/// Reasons a single remote message is not applied. None of them are fatal to the session.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport gave up on a fetch. Chat delivery is best effort, so it is not retried.
    #[error("timed out fetching {0}")]
    FetchTimeout(DataName),
    /// The payload was produced too long ago to be treated as a live event.
    #[error("discarding {name}, produced {age:?} ago")]
    StaleDelivery { name: DataName, age: Duration },
    /// A liveness check ran against a producer the sync layer no longer tracks.
    #[error("producer {prefix} (session {session_id}) is unknown to the sync layer")]
    UnknownProducer { prefix: String, session_id: u64 },
    #[error("could not decode {name}")]
    MalformedPayload {
        name: DataName,
        #[source]
        source: DecodeError,
    },
}

/// Error returned by [`ConfigBuilder::build`](crate::ConfigBuilder::build).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigBuilderError {
    /// The message cache must hold at least one message.
    #[error("max_cached_messages must be at least 1")]
    EmptyCache,
    #[error("fetch_timeout must not be zero")]
    ZeroFetchTimeout,
    /// At least two heartbeats must fit into one liveness window.
    #[error("heartbeat_interval {heartbeat:?} exceeds half the liveness window {window:?}")]
    HeartbeatTooSlow { heartbeat: Duration, window: Duration },
}
