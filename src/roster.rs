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

//! Presence tracking for the participants of a chat room.

use fnv::FnvHashMap;

use crate::{
    error::DeliveryError,
    types::{MessageKind, RosterEntry},
};

/// The set of participants currently considered present.
///
/// Membership is keyed on the display name. A display name is present with at most one
/// session id; a message from a newer session of the same name replaces the older one.
#[derive(Debug, Default)]
pub struct Roster {
    /// Session id per display name.
    members: FnvHashMap<String, u64>,
    /// Generation of the most recently armed liveness check per member.
    liveness: FnvHashMap<RosterEntry, u64>,
    next_generation: u64,
}

/// How an observed message changed the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observation {
    /// First message from this display name.
    Joined,
    /// A newer session replaced the given older one.
    Superseded { previous: u64 },
    Unchanged,
    /// A leave from someone who was never present.
    Ignored,
}

/// A deferred check that a producer made progress since `sequence_no` was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LivenessCheck {
    pub(crate) entry: RosterEntry,
    pub(crate) prefix: String,
    pub(crate) sequence_no: u64,
    generation: u64,
}

/// Result of running a [`LivenessCheck`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Liveness {
    /// No progress within the window; the member was removed.
    Expired,
    /// The producer advanced but the message that would have re-armed the check never
    /// arrived; the returned check must be scheduled instead.
    Renewed(LivenessCheck),
    /// A newer check was armed, or the member is already gone.
    Superseded,
}

impl Roster {
    /// Applies the join-or-supersede rule for a message of `kind` from `name`/`session_id`.
    pub(crate) fn observe(&mut self, name: &str, session_id: u64, kind: MessageKind) -> Observation {
        match self.members.get_mut(name) {
            Some(current) if kind != MessageKind::Leave && session_id > *current => {
                let previous = std::mem::replace(current, session_id);
                self.liveness.remove(&RosterEntry {
                    display_name: name.to_owned(),
                    session_id: previous,
                });
                Observation::Superseded { previous }
            }
            Some(_) => Observation::Unchanged,
            None if kind == MessageKind::Leave => Observation::Ignored,
            None => {
                self.members.insert(name.to_owned(), session_id);
                Observation::Joined
            }
        }
    }

    /// Whether `name` is present with exactly `session_id`.
    pub fn contains(&self, name: &str, session_id: u64) -> bool {
        self.members.get(name) == Some(&session_id)
    }

    /// Session id under which `name` is present.
    pub fn session_of(&self, name: &str) -> Option<u64> {
        self.members.get(name).copied()
    }

    /// Removes exactly `name`/`session_id`. Returns `false` if that identity isn't present.
    pub(crate) fn remove(&mut self, name: &str, session_id: u64) -> bool {
        if !self.contains(name, session_id) {
            return false;
        }
        self.members.remove(name);
        self.liveness.remove(&RosterEntry {
            display_name: name.to_owned(),
            session_id,
        });
        true
    }

    /// Arms a new liveness check for a member, superseding any earlier one.
    pub(crate) fn arm_liveness(
        &mut self,
        entry: RosterEntry,
        prefix: impl Into<String>,
        sequence_no: u64,
    ) -> LivenessCheck {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.liveness.insert(entry.clone(), generation);
        LivenessCheck {
            entry,
            prefix: prefix.into(),
            sequence_no,
            generation,
        }
    }

    /// Runs a liveness check that reached its deadline.
    ///
    /// `current` is what the sync layer now reports for the producer.
    pub(crate) fn check_liveness(
        &mut self,
        check: &LivenessCheck,
        current: Option<u64>,
    ) -> Result<Liveness, DeliveryError> {
        if self.liveness.get(&check.entry) != Some(&check.generation)
            || !self.contains(&check.entry.display_name, check.entry.session_id)
        {
            return Ok(Liveness::Superseded);
        }
        let current = current.ok_or_else(|| DeliveryError::UnknownProducer {
            prefix: check.prefix.clone(),
            session_id: check.entry.session_id,
        })?;

        if current == check.sequence_no {
            self.remove(&check.entry.display_name, check.entry.session_id);
            return Ok(Liveness::Expired);
        }

        Ok(Liveness::Renewed(self.arm_liveness(
            check.entry.clone(),
            check.prefix.clone(),
            current,
        )))
    }

    /// The members, ordered by display name.
    pub fn members(&self) -> Vec<RosterEntry> {
        let mut members: Vec<_> = self
            .members
            .iter()
            .map(|(name, session_id)| RosterEntry {
                display_name: name.clone(),
                session_id: *session_id,
            })
            .collect();
        members.sort();
        members
    }

    /// Number of present participants.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nobody is present.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
