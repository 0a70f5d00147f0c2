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

use std::time::Duration;

use web_time::SystemTime;

use crate::{mcache::MessageCache, sync::SyncHandle, types::{MessageKind, NO_PAYLOAD}};

/// Periodically publishes a `Hello` so that an otherwise silent participant stays visible to
/// the liveness checks of others.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    interval: Duration,
    /// Number of heartbeats published since the start of the session.
    ticks: u64,
}

impl Heartbeat {
    pub(crate) fn new(interval: Duration) -> Self {
        Heartbeat { interval, ticks: 0 }
    }

    /// Deadline of the heartbeat following one at `now`.
    pub(crate) fn next_deadline(&self, now: SystemTime) -> SystemTime {
        now + self.interval
    }

    /// Publishes one heartbeat and records it in the cache. Returns its sequence number.
    pub(crate) fn beat<S: SyncHandle>(
        &mut self,
        sync: &mut S,
        cache: &mut MessageCache,
        now: SystemTime,
    ) -> u64 {
        if cache.is_empty() {
            cache.append(sync.sequence_no(), MessageKind::Join, NO_PAYLOAD, now);
        }
        let sequence_no = sync.publish_next();
        cache.append(sequence_no, MessageKind::Hello, NO_PAYLOAD, now);
        self.ticks += 1;
        tracing::trace!(sequence=%sequence_no, ticks=%self.ticks, "Published heartbeat");
        sequence_no
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks
    }
}
