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

//! The chat session state machine.

use std::collections::VecDeque;

use web_time::SystemTime;

use crate::{
    codec::{Codec, JsonCodec},
    config::Config,
    error::{DeliveryError, SessionError},
    fetch::{FetchCoordinator, PendingFetch},
    heartbeat::Heartbeat,
    identity::Identity,
    mcache::MessageCache,
    roster::{Liveness, LivenessCheck, Observation, Roster},
    sync::SyncHandle,
    timer::Timers,
    types::{
        ChatMessage, DataName, FetchId, FetchRequest, MessageKind, RosterEntry, SyncUpdate,
        NO_PAYLOAD,
    },
};

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the sync layer to finish its initial exchange.
    Joining,
    Active,
    /// `leave` was called; the leave message is still being served.
    Leaving,
    /// The session no longer processes anything.
    Closed,
}

/// Notifications for the user-facing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Live chat text from another participant.
    MessageReceived { from: String, text: String },
    /// A participant was seen for the first time.
    ParticipantJoined { name: String },
    /// A participant left, either explicitly or by staying silent for a whole liveness window.
    ParticipantLeft { name: String },
}

/// Output of a [`Session`], drained with [`Session::next_action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The transport must fetch a message and report back.
    Fetch(FetchRequest),
    /// Notify the user-facing layer.
    Event(Event),
}

/// Deferred work, carrying everything it needs when it fires.
#[derive(Debug)]
enum Task {
    Heartbeat,
    Liveness(LivenessCheck),
    Close,
}

/// Presence and messaging state of the local participant in one chat room.
///
/// The session performs no I/O on its own. The owner feeds it the callbacks of the sync layer,
/// the transport and the clock, one at a time, and drains the resulting [`Action`]s. Every
/// method takes the current time explicitly; [`Session::next_deadline`] tells the owner when
/// [`Session::on_timeout`] has to be called next.
pub struct Session<S, C = JsonCodec> {
    config: Config,
    identity: Identity,
    sync: S,
    codec: C,
    state: SessionState,
    /// Messages we produced, served to remote fetches.
    cache: MessageCache,
    roster: Roster,
    fetches: FetchCoordinator,
    heartbeat: Heartbeat,
    timers: Timers<Task>,
    /// Whether the most recent sync update was a recovery.
    is_recovery_sync: bool,
    /// Queued actions.
    actions: VecDeque<Action>,
}

impl<S> Session<S, JsonCodec>
where
    S: SyncHandle,
{
    /// Creates a session exchanging JSON-encoded payloads.
    pub fn new(identity: Identity, sync: S, config: Config) -> Self {
        Self::with_codec(identity, sync, JsonCodec, config)
    }
}

impl<S, C> Session<S, C>
where
    S: SyncHandle,
    C: Codec,
{
    /// Creates a session exchanging payloads encoded with `codec`.
    pub fn with_codec(identity: Identity, sync: S, codec: C, config: Config) -> Self {
        Session {
            cache: MessageCache::new(config.max_cached_messages()),
            roster: Roster::default(),
            fetches: FetchCoordinator::new(
                identity.screen_name(),
                identity.chat_prefix(),
                config.fetch_timeout(),
            ),
            heartbeat: Heartbeat::new(config.heartbeat_interval()),
            timers: Timers::default(),
            state: SessionState::Joining,
            is_recovery_sync: true,
            actions: VecDeque::new(),
            config,
            identity,
            sync,
            codec,
        }
    }

    /// Called once the sync layer finished joining the room.
    ///
    /// Adds the local participant to the roster, records its join and starts the heartbeat.
    pub fn on_initial(&mut self, now: SystemTime) {
        if self.state != SessionState::Joining {
            tracing::trace!(state=?self.state, "Ignoring repeated initial sync callback");
            return;
        }

        let name = self.identity.screen_name().to_owned();
        let session_id = self.identity.session_id();
        if !self.roster.contains(&name, session_id)
            && self.roster.observe(&name, session_id, MessageKind::Join) == Observation::Joined
        {
            self.push_event(Event::ParticipantJoined { name });
        }
        // A `send` while joining already recorded the join.
        if self.cache.is_empty() {
            self.cache
                .append(self.sync.sequence_no(), MessageKind::Join, NO_PAYLOAD, now);
        }

        self.timers
            .schedule(self.heartbeat.next_deadline(now), Task::Heartbeat);
        self.state = SessionState::Active;
        tracing::debug!(room=%self.identity.chat_room(), user=%self.identity.user_name(), "Joined chat room");
    }

    /// Handles a batch of remote producers that advanced their sequence numbers.
    pub fn on_sync_update(&mut self, updates: &[SyncUpdate], is_recovery: bool) {
        if self.state == SessionState::Closed {
            tracing::trace!("Ignoring sync update on closed session");
            return;
        }

        self.is_recovery_sync = is_recovery;
        for request in self.fetches.plan(updates, is_recovery) {
            tracing::debug!(name=%request.name, id=%request.id, recovery=%is_recovery, "Fetching message");
            self.actions.push_back(Action::Fetch(request));
        }
    }

    /// Handles the content returned for a fetch.
    pub fn on_fetch_response(&mut self, id: FetchId, payload: &[u8], now: SystemTime) {
        if self.state == SessionState::Closed {
            return;
        }
        let Some(pending) = self.fetches.complete(id) else {
            tracing::trace!(%id, "Ignoring response to unknown fetch");
            return;
        };

        match self.handle_response(pending, payload, now) {
            Ok(()) => {}
            Err(error @ DeliveryError::MalformedPayload { .. }) => {
                tracing::warn!(%error, "Dropping fetched message")
            }
            Err(error) => tracing::debug!(%error, "Dropping fetched message"),
        }
    }

    /// Handles a fetch the transport gave up on. Missing chat messages are not retried.
    pub fn on_fetch_timeout(&mut self, id: FetchId) {
        match self.fetches.complete(id) {
            Some(pending) => {
                tracing::debug!(error=%DeliveryError::FetchTimeout(pending.name), "Fetch failed")
            }
            None => tracing::trace!(%id, "Ignoring timeout of unknown fetch"),
        }
    }

    fn handle_response(
        &mut self,
        pending: PendingFetch,
        payload: &[u8],
        now: SystemTime,
    ) -> Result<(), DeliveryError> {
        let PendingFetch { name, is_recovery } = pending;
        let message = self
            .codec
            .decode(payload)
            .map_err(|source| DeliveryError::MalformedPayload {
                name: name.clone(),
                source,
            })?;

        let age = now
            .duration_since(message.produced_at())
            .unwrap_or_default();
        if age >= self.config.stale_delivery_threshold() {
            return Err(DeliveryError::StaleDelivery { name, age });
        }

        let from = message.from.as_str();
        let session_id = name.session_id;
        match self.roster.observe(from, session_id, message.kind) {
            Observation::Joined => {
                tracing::debug!(peer=%from, session=%session_id, "Participant joined");
                self.push_event(Event::ParticipantJoined {
                    name: from.to_owned(),
                });
            }
            Observation::Superseded { previous } => {
                tracing::debug!(peer=%from, %previous, session=%session_id, "Participant rejoined with a new session")
            }
            Observation::Unchanged | Observation::Ignored => {}
        }

        if self.roster.contains(from, session_id) {
            let check = self.roster.arm_liveness(
                RosterEntry {
                    display_name: from.to_owned(),
                    session_id,
                },
                name.prefix.clone(),
                name.sequence_no,
            );
            self.timers.schedule(
                now + self.config.liveness_window(),
                Task::Liveness(check),
            );
        }

        let is_local = from == self.identity.screen_name();
        match message.kind {
            MessageKind::Chat if is_recovery => {
                tracing::trace!(%name, "Not displaying chat replayed by recovery")
            }
            MessageKind::Chat if !is_local => self.push_event(Event::MessageReceived {
                from: from.to_owned(),
                text: message.data.clone().unwrap_or_default(),
            }),
            MessageKind::Leave if !is_local => {
                if self.roster.remove(from, session_id) {
                    tracing::debug!(peer=%from, session=%session_id, "Participant left");
                    self.push_event(Event::ParticipantLeft {
                        name: from.to_owned(),
                    });
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Answers a remote fetch for one of our messages.
    ///
    /// Returns `None` if the name isn't ours or the message is no longer cached.
    pub fn serve(&self, name: &DataName) -> Option<Vec<u8>> {
        if self.state == SessionState::Closed
            || name.prefix != self.identity.chat_prefix()
            || name.session_id != self.identity.session_id()
        {
            return None;
        }
        let cached = self.cache.get(name.sequence_no)?;
        let message = ChatMessage::from_cached(
            self.identity.screen_name(),
            self.identity.chat_room(),
            cached,
        );
        Some(self.codec.encode(&message))
    }

    /// Publishes a line of chat text.
    ///
    /// Empty text is never published and yields `Ok(None)`; otherwise the sequence number of the
    /// new message is returned.
    pub fn send(&mut self, text: &str, now: SystemTime) -> Result<Option<u64>, SessionError> {
        self.ensure_not_left()?;
        if self.cache.is_empty() {
            self.cache
                .append(self.sync.sequence_no(), MessageKind::Join, NO_PAYLOAD, now);
        }
        if text.is_empty() {
            return Ok(None);
        }

        let sequence_no = self.sync.publish_next();
        self.cache.append(sequence_no, MessageKind::Chat, text, now);
        tracing::trace!(sequence=%sequence_no, "Published chat message");
        Ok(Some(sequence_no))
    }

    /// Announces that we leave the room.
    ///
    /// The session keeps serving for the configured grace period so that others can fetch the
    /// announcement, then closes.
    pub fn leave(&mut self, now: SystemTime) -> Result<u64, SessionError> {
        self.ensure_not_left()?;

        let sequence_no = self.sync.publish_next();
        self.cache
            .append(sequence_no, MessageKind::Leave, NO_PAYLOAD, now);
        self.roster
            .remove(self.identity.screen_name(), self.identity.session_id());
        self.state = SessionState::Leaving;
        self.timers
            .schedule(now + self.config.leave_grace_period(), Task::Close);
        tracing::debug!(sequence=%sequence_no, "Leaving chat room");
        Ok(sequence_no)
    }

    fn ensure_not_left(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Joining | SessionState::Active => Ok(()),
            SessionState::Leaving | SessionState::Closed => Err(SessionError::AlreadyLeft),
        }
    }

    /// The earliest point in time at which [`Session::on_timeout`] has work to do.
    pub fn next_deadline(&self) -> Option<SystemTime> {
        self.timers.next_deadline()
    }

    /// Runs every timer whose deadline is not after `now`.
    pub fn on_timeout(&mut self, now: SystemTime) {
        while let Some(task) = self.timers.pop_expired(now) {
            match task {
                Task::Heartbeat => self.on_heartbeat(now),
                Task::Liveness(check) => self.on_liveness_check(check, now),
                Task::Close => self.close(),
            }
        }
    }

    fn on_heartbeat(&mut self, now: SystemTime) {
        if self.state != SessionState::Active {
            tracing::trace!(state=?self.state, "Heartbeat stopped");
            return;
        }
        self.heartbeat.beat(&mut self.sync, &mut self.cache, now);
        self.timers
            .schedule(self.heartbeat.next_deadline(now), Task::Heartbeat);
    }

    fn on_liveness_check(&mut self, check: LivenessCheck, now: SystemTime) {
        let current = self
            .sync
            .producer_sequence_no(&check.prefix, check.entry.session_id);
        match self.roster.check_liveness(&check, current) {
            Ok(Liveness::Expired) => {
                tracing::debug!(peer=%check.entry.display_name, session=%check.entry.session_id, "Participant timed out");
                self.push_event(Event::ParticipantLeft {
                    name: check.entry.display_name,
                });
            }
            Ok(Liveness::Renewed(next)) => {
                self.timers
                    .schedule(now + self.config.liveness_window(), Task::Liveness(next));
            }
            Ok(Liveness::Superseded) => {}
            Err(error) => tracing::trace!(%error, "Skipping liveness check"),
        }
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
        self.timers.clear();
        self.fetches.clear();
        tracing::debug!(room=%self.identity.chat_room(), "Session closed");
    }

    fn push_event(&mut self, event: Event) {
        self.actions.push_back(Action::Event(event));
    }

    /// Pops the oldest queued action.
    pub fn next_action(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The local participant.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The configuration the session was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Participants currently considered present.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Messages produced locally and still served.
    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    /// Whether the most recent sync update was a recovery.
    pub fn is_recovery_sync(&self) -> bool {
        self.is_recovery_sync
    }

    /// Number of fetches waiting for a response or timeout.
    pub fn pending_fetches(&self) -> usize {
        self.fetches.len()
    }

    /// Number of heartbeats published so far.
    pub fn heartbeats(&self) -> u64 {
        self.heartbeat.ticks()
    }

    /// The sync layer handle.
    pub fn sync(&self) -> &S {
        &self.sync
    }

    /// Mutable access to the sync layer handle.
    pub fn sync_mut(&mut self) -> &mut S {
        &mut self.sync
    }
}
