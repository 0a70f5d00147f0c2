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

use std::collections::VecDeque;

use web_time::SystemTime;

use crate::types::{CachedMessage, MessageKind};

/// Bounded history of the messages the local participant produced.
///
/// Remote participants fetch our messages by sequence number, so the cache is what answers
/// them. Once more than `capacity` messages are held, the oldest are evicted.
#[derive(Debug, Clone)]
pub struct MessageCache {
    msgs: VecDeque<CachedMessage>,
    capacity: usize,
}

impl MessageCache {
    pub fn new(capacity: usize) -> MessageCache {
        MessageCache {
            msgs: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Put a message into the cache under an already allocated sequence number.
    pub(crate) fn append(
        &mut self,
        sequence_no: u64,
        kind: MessageKind,
        payload: impl Into<String>,
        produced_at: SystemTime,
    ) -> u64 {
        self.msgs.push_back(CachedMessage {
            sequence_no,
            kind,
            payload: payload.into(),
            produced_at,
        });
        while self.msgs.len() > self.capacity {
            if let Some(evicted) = self.msgs.pop_front() {
                tracing::trace!(sequence=%evicted.sequence_no, "Evicted message from cache");
            }
        }
        sequence_no
    }

    /// Get the most recent message stored under `sequence_no`.
    pub fn get(&self, sequence_no: u64) -> Option<&CachedMessage> {
        self.msgs
            .iter()
            .rev()
            .find(|msg| msg.sequence_no == sequence_no)
    }

    /// Iterates from the oldest to the newest cached message.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CachedMessage> {
        self.msgs.iter()
    }

    pub fn len(&self) -> usize {
        self.msgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }
}
