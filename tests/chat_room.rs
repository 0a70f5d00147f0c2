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


//! Several participants chatting through an in-memory sync layer under simulated time.

use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};

use chronochat::{
    Action, Config, DataName, Event, Identity, Session, SessionState, SyncHandle, SyncUpdate,
};
use tracing_subscriber::EnvFilter;
use web_time::{SystemTime, UNIX_EPOCH};

const HUB: &str = "/ndn/broadcast/ChronoChat-0.3/lobby";

/// Latest sequence number of every producer, shared by the whole room.
type Table = Rc<RefCell<HashMap<(String, u64), u64>>>;

struct TableSync {
    table: Table,
    key: (String, u64),
}

impl SyncHandle for TableSync {
    fn publish_next(&mut self) -> u64 {
        let mut table = self.table.borrow_mut();
        let sequence_no = table.entry(self.key.clone()).or_insert(0);
        *sequence_no += 1;
        *sequence_no
    }

    fn sequence_no(&self) -> u64 {
        self.table.borrow().get(&self.key).copied().unwrap_or(0)
    }

    fn producer_sequence_no(&self, prefix: &str, session_id: u64) -> Option<u64> {
        self.table
            .borrow()
            .get(&(prefix.to_owned(), session_id))
            .copied()
    }
}

struct Peer {
    session: Session<TableSync>,
    /// What the sync layer already reported to this peer.
    seen: HashMap<(String, u64), u64>,
    recovering: bool,
    online: bool,
    events: Vec<(SystemTime, Event)>,
}

struct Room {
    table: Table,
    start: SystemTime,
    now: SystemTime,
    peers: Vec<Peer>,
}

impl Room {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();

        let start = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        Room {
            table: Table::default(),
            start,
            now: start,
            peers: Vec::new(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.now.duration_since(self.start).unwrap()
    }

    fn join(&mut self, name: &str, session_id: u64) -> usize {
        let prefix = format!("{HUB}/{name}{session_id}");
        let key = (prefix.clone(), session_id);
        self.table.borrow_mut().insert(key.clone(), 0);

        let sync = TableSync {
            table: self.table.clone(),
            key,
        };
        let mut session = Session::new(
            Identity::new(name, "lobby", prefix, session_id),
            sync,
            Config::default(),
        );
        session.on_initial(self.now);
        self.peers.push(Peer {
            session,
            seen: HashMap::new(),
            recovering: true,
            online: true,
            events: Vec::new(),
        });
        self.pump();
        self.peers.len() - 1
    }

    fn send(&mut self, peer: usize, text: &str) {
        self.peers[peer].session.send(text, self.now).unwrap();
        self.pump();
    }

    fn leave(&mut self, peer: usize) {
        self.peers[peer].session.leave(self.now).unwrap();
        self.pump();
    }

    /// The peer stops without saying goodbye.
    fn crash(&mut self, peer: usize) {
        self.peers[peer].online = false;
    }

    /// Runs every timer up to `elapsed` after the start, in order.
    fn advance(&mut self, elapsed: Duration) {
        let until = self.start + elapsed;
        loop {
            let next = self
                .peers
                .iter()
                .filter(|peer| peer.online)
                .filter_map(|peer| peer.session.next_deadline())
                .min();
            match next {
                Some(deadline) if deadline <= until => {
                    self.now = self.now.max(deadline);
                    for peer in self.peers.iter_mut().filter(|peer| peer.online) {
                        peer.session.on_timeout(self.now);
                    }
                    self.pump();
                }
                _ => break,
            }
        }
        self.now = until;
    }

    /// Spreads sequence numbers and answers fetches until nothing changes.
    fn pump(&mut self) {
        loop {
            let mut progressed = false;
            for i in 0..self.peers.len() {
                if !self.peers[i].online {
                    continue;
                }

                let updates = self.updates_for(i);
                let peer = &mut self.peers[i];
                if !updates.is_empty() {
                    peer.session.on_sync_update(&updates, peer.recovering);
                }
                peer.recovering = false;

                while let Some(action) = self.peers[i].session.next_action() {
                    progressed = true;
                    match action {
                        Action::Fetch(request) => match self.serve(&request.name) {
                            Some(payload) => {
                                self.peers[i]
                                    .session
                                    .on_fetch_response(request.id, &payload, self.now)
                            }
                            None => self.peers[i].session.on_fetch_timeout(request.id),
                        },
                        Action::Event(event) => self.peers[i].events.push((self.now, event)),
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }

    fn updates_for(&mut self, i: usize) -> Vec<SyncUpdate> {
        let own = self.peers[i].session.identity();
        let own = (own.chat_prefix().to_owned(), own.session_id());
        let table = self.table.borrow();
        let peer = &mut self.peers[i];

        let mut updates = Vec::new();
        for (key, sequence_no) in table.iter() {
            if *key == own || peer.seen.get(key) >= Some(sequence_no) {
                continue;
            }
            peer.seen.insert(key.clone(), *sequence_no);
            updates.push(SyncUpdate::new(key.0.clone(), key.1, *sequence_no));
        }
        updates
    }

    fn serve(&self, name: &DataName) -> Option<Vec<u8>> {
        self.peers
            .iter()
            .filter(|peer| peer.online)
            .find(|peer| {
                peer.session.identity().chat_prefix() == name.prefix
                    && peer.session.identity().session_id() == name.session_id
            })
            .and_then(|peer| peer.session.serve(name))
    }

    fn events(&self, peer: usize) -> Vec<Event> {
        self.peers[peer]
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    fn departures(&self, peer: usize, name: &str) -> Vec<Duration> {
        self.peers[peer]
            .events
            .iter()
            .filter(|(_, event)| matches!(event, Event::ParticipantLeft { name: n } if n == name))
            .map(|(at, _)| at.duration_since(self.start).unwrap())
            .collect()
    }
}

fn joined(name: &str) -> Event {
    Event::ParticipantJoined { name: name.into() }
}

fn chat(from: &str, text: &str) -> Event {
    Event::MessageReceived {
        from: from.into(),
        text: text.into(),
    }
}

#[test]
fn chat_reaches_the_other_participant() {
    let mut room = Room::new();
    let alice = room.join("alice", 1);
    let bob = room.join("bob", 2);

    room.advance(Duration::from_secs(5));
    room.send(alice, "hi");

    assert_eq!(room.events(alice), [joined("alice"), joined("bob")]);
    assert_eq!(
        room.events(bob),
        [joined("bob"), joined("alice"), chat("alice", "hi")]
    );
    assert_eq!(room.peers[bob].session.roster().len(), 2);
}

#[test]
fn history_replayed_on_join_is_not_displayed() {
    let mut room = Room::new();
    let alice = room.join("alice", 1);
    room.send(alice, "before");

    let bob = room.join("bob", 2);
    assert_eq!(room.events(bob), [joined("bob"), joined("alice")]);

    room.send(alice, "after");
    assert_eq!(room.events(bob).last(), Some(&chat("alice", "after")));
    assert!(!room.events(bob).contains(&chat("alice", "before")));
}

#[test]
fn leave_is_seen_before_the_liveness_window() {
    let mut room = Room::new();
    let alice = room.join("alice", 1);
    let bob = room.join("bob", 2);

    room.advance(Duration::from_secs(10));
    room.leave(alice);
    assert_eq!(room.departures(bob, "alice"), [Duration::from_secs(10)]);
    assert!(!room.peers[bob].session.roster().contains("alice", 1));

    room.advance(Duration::from_secs(400));
    assert_eq!(room.peers[alice].session.state(), SessionState::Closed);
    assert_eq!(room.departures(bob, "alice").len(), 1);
}

#[test]
fn silent_participant_is_dropped_once() {
    let mut room = Room::new();
    let alice = room.join("alice", 1);
    let bob = room.join("bob", 2);

    room.advance(Duration::from_secs(30));
    room.crash(bob);
    room.advance(Duration::from_secs(400));

    let departures = room.departures(alice, "bob");
    assert_eq!(departures.len(), 1);
    assert!(departures[0] >= Duration::from_secs(120));
    assert!(departures[0] <= Duration::from_secs(125));
    assert!(!room.peers[alice].session.roster().contains("bob", 2));
    assert_eq!(room.elapsed(), Duration::from_secs(400));
}

#[test]
fn heartbeats_keep_quiet_participants_present() {
    let mut room = Room::new();
    let alice = room.join("alice", 1);
    let bob = room.join("bob", 2);

    room.advance(Duration::from_secs(400));

    assert!(room.departures(alice, "bob").is_empty());
    assert!(room.departures(bob, "alice").is_empty());
    assert!(room.peers[alice].session.heartbeats() >= 6);
    assert_eq!(room.peers[alice].session.roster().len(), 2);
}

#[test]
fn restart_replaces_the_previous_session() {
    let mut room = Room::new();
    let alice = room.join("alice", 1);
    let bob = room.join("bob", 2);

    room.advance(Duration::from_secs(10));
    room.crash(bob);
    room.advance(Duration::from_secs(20));
    let bob_again = room.join("bob", 3);

    room.advance(Duration::from_secs(400));
    room.send(bob_again, "back");

    let alice_events = room.events(alice);
    assert_eq!(
        alice_events.iter().filter(|e| **e == joined("bob")).count(),
        1
    );
    assert!(room.departures(alice, "bob").is_empty());
    assert_eq!(alice_events.last(), Some(&chat("bob", "back")));
    assert_eq!(room.peers[alice].session.roster().session_of("bob"), Some(3));
}
