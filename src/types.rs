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

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::error::NameError;

/// Payload recorded for messages that carry no text.
pub(crate) const NO_PAYLOAD: &str = "xxx";

/// The kind of event a sequence number stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// The producer entered the room.
    Join,
    /// A line of chat text.
    Chat,
    /// The producer is leaving the room.
    Leave,
    /// Heartbeat, published only to stay visible.
    Hello,
}

/// A message produced by the local participant, kept so that remote fetches can be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    /// Sequence number the message was published under.
    pub sequence_no: u64,
    pub kind: MessageKind,
    /// Chat text. Only meaningful for [`MessageKind::Chat`].
    pub payload: String,
    /// When the message was produced.
    pub produced_at: SystemTime,
}

/// A notification from the sync layer that a remote producer advanced its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncUpdate {
    pub producer_prefix: String,
    pub session_id: u64,
    pub sequence_no: u64,
}

impl SyncUpdate {
    pub fn new(producer_prefix: impl Into<String>, session_id: u64, sequence_no: u64) -> Self {
        SyncUpdate {
            producer_prefix: producer_prefix.into(),
            session_id,
            sequence_no,
        }
    }
}

/// The record carried in the content of a fetched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Screen name of the producer.
    pub from: String,
    /// Chat room the message belongs to.
    pub to: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Chat text, only present for [`MessageKind::Chat`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Production time in whole seconds since the UNIX epoch.
    pub timestamp: u64,
}

impl ChatMessage {
    /// Builds the wire record for a locally cached message.
    pub(crate) fn from_cached(from: &str, to: &str, message: &CachedMessage) -> Self {
        let data = match message.kind {
            MessageKind::Chat => Some(message.payload.clone()),
            _ => None,
        };
        ChatMessage {
            from: from.to_owned(),
            to: to.to_owned(),
            kind: message.kind,
            data,
            timestamp: unix_secs(message.produced_at),
        }
    }

    /// Time at which the producer claims to have produced this message.
    pub fn produced_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.timestamp)
    }
}

/// Rounds a point in time to whole seconds since the UNIX epoch.
pub(crate) fn unix_secs(time: SystemTime) -> u64 {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    ((millis + 500) / 1000) as u64
}

/// Name of a single message: `<producer prefix>/<session id>/<sequence number>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataName {
    pub prefix: String,
    pub session_id: u64,
    pub sequence_no: u64,
}

impl DataName {
    pub fn new(prefix: impl Into<String>, session_id: u64, sequence_no: u64) -> Self {
        DataName {
            prefix: prefix.into(),
            session_id,
            sequence_no,
        }
    }

    /// Last component of the producer prefix.
    pub fn producer_name(&self) -> &str {
        last_component(&self.prefix)
    }
}

impl From<&SyncUpdate> for DataName {
    fn from(update: &SyncUpdate) -> Self {
        DataName::new(
            update.producer_prefix.clone(),
            update.session_id,
            update.sequence_no,
        )
    }
}

impl fmt::Display for DataName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.prefix, self.session_id, self.sequence_no)
    }
}

impl FromStr for DataName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut components = s.trim_end_matches('/').rsplitn(3, '/');
        let sequence_no = components.next().filter(|c| !c.is_empty());
        let session_id = components.next();
        let prefix = components.next().filter(|p| !p.is_empty());

        let (Some(sequence_no), Some(session_id), Some(prefix)) = (sequence_no, session_id, prefix)
        else {
            return Err(NameError::TooShort(s.to_owned()));
        };

        Ok(DataName {
            prefix: prefix.to_owned(),
            session_id: session_id
                .parse()
                .map_err(|_| NameError::InvalidNumber(session_id.to_owned()))?,
            sequence_no: sequence_no
                .parse()
                .map_err(|_| NameError::InvalidNumber(sequence_no.to_owned()))?,
        })
    }
}

/// Returns the last `/`-separated component of a prefix.
pub(crate) fn last_component(prefix: &str) -> &str {
    prefix
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Identifier of an outstanding fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchId(pub(crate) u64);

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A fetch the transport must perform on behalf of the session.
///
/// The outcome is reported back with [`Session::on_fetch_response`](crate::Session::on_fetch_response)
/// or [`Session::on_fetch_timeout`](crate::Session::on_fetch_timeout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: FetchId,
    pub name: DataName,
    /// Deadline after which the transport gives up and reports a timeout.
    pub timeout: Duration,
}

/// A participant currently present in the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RosterEntry {
    pub display_name: String,
    pub session_id: u64,
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.display_name, self.session_id)
    }
}
