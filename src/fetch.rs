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

//! Translation of sync updates into targeted fetches.

use std::time::Duration;

use fnv::FnvHashMap;
use smallvec::SmallVec;

use crate::types::{last_component, DataName, FetchId, FetchRequest, SyncUpdate};

/// Turns batches of [`SyncUpdate`]s into fetch requests and tracks the ones in flight.
#[derive(Debug)]
pub(crate) struct FetchCoordinator {
    /// Screen name of the local participant; producers whose prefix ends in it are skipped.
    local_name: String,
    /// Prefix the local participant publishes under.
    local_prefix: String,
    timeout: Duration,
    next_id: u64,
    pending: FnvHashMap<FetchId, PendingFetch>,
}

/// A fetch that was handed to the transport and hasn't completed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingFetch {
    pub(crate) name: DataName,
    /// Whether the sync update that triggered this fetch was a recovery.
    pub(crate) is_recovery: bool,
}

impl FetchCoordinator {
    pub(crate) fn new(
        local_name: impl Into<String>,
        local_prefix: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        FetchCoordinator {
            local_name: local_name.into(),
            local_prefix: local_prefix.into(),
            timeout,
            next_id: 0,
            pending: FnvHashMap::default(),
        }
    }

    /// Selects one target per producer prefix, the last one seen in the batch wins, and
    /// registers a fetch for each target that isn't already outstanding.
    pub(crate) fn plan(
        &mut self,
        updates: &[SyncUpdate],
        is_recovery: bool,
    ) -> SmallVec<[FetchRequest; 8]> {
        let mut targets: SmallVec<[DataName; 8]> = SmallVec::new();
        let mut by_prefix: FnvHashMap<&str, usize> = FnvHashMap::default();

        for update in updates {
            if update.producer_prefix == self.local_prefix
                || last_component(&update.producer_prefix) == self.local_name
            {
                tracing::trace!(prefix=%update.producer_prefix, "Skipping update of local producer");
                continue;
            }
            match by_prefix.get(update.producer_prefix.as_str()) {
                Some(&index) => targets[index] = DataName::from(update),
                None => {
                    by_prefix.insert(&update.producer_prefix, targets.len());
                    targets.push(DataName::from(update));
                }
            }
        }

        let mut requests = SmallVec::new();
        for name in targets {
            if self.is_outstanding(&name) {
                tracing::trace!(%name, "Fetch already in flight");
                continue;
            }
            let id = FetchId(self.next_id);
            self.next_id += 1;
            self.pending.insert(
                id,
                PendingFetch {
                    name: name.clone(),
                    is_recovery,
                },
            );
            requests.push(FetchRequest {
                id,
                name,
                timeout: self.timeout,
            });
        }
        requests
    }

    fn is_outstanding(&self, name: &DataName) -> bool {
        self.pending.values().any(|p| &p.name == name)
    }

    /// Completes a fetch, returning what it was for. `None` for unknown or finished fetches.
    pub(crate) fn complete(&mut self, id: FetchId) -> Option<PendingFetch> {
        self.pending.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}
