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


use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use chronochat::{
    driver::{self, DriverError},
    Action, ChatMessage, Codec, Config, DataName, Event, Identity, JsonCodec, MessageKind,
    Session, SessionError, SyncHandle, SyncUpdate,
};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;
use web_time::{SystemTime, UNIX_EPOCH};

const ALICE_PREFIX: &str = "/ndn/broadcast/ChronoChat-0.3/lobby/aaaaaaaaaa";
const ALICE_SESSION: u64 = 1_700_000_000;
const BOB_PREFIX: &str = "/ndn/broadcast/ChronoChat-0.3/lobby/bbbbbbbbbb";
const BOB_SESSION: u64 = 1_700_000_100;

/// Sequence numbers as the sync layer would report them.
#[derive(Clone, Default)]
struct SharedSync {
    sequence_no: Arc<Mutex<u64>>,
    producers: Arc<Mutex<HashMap<(String, u64), u64>>>,
}

impl SharedSync {
    fn advance(&self, prefix: &str, session_id: u64, sequence_no: u64) {
        self.producers
            .lock()
            .unwrap()
            .insert((prefix.to_owned(), session_id), sequence_no);
    }
}

impl SyncHandle for SharedSync {
    fn publish_next(&mut self) -> u64 {
        let mut sequence_no = self.sequence_no.lock().unwrap();
        *sequence_no += 1;
        *sequence_no
    }

    fn sequence_no(&self) -> u64 {
        *self.sequence_no.lock().unwrap()
    }

    fn producer_sequence_no(&self, prefix: &str, session_id: u64) -> Option<u64> {
        self.producers
            .lock()
            .unwrap()
            .get(&(prefix.to_owned(), session_id))
            .copied()
    }
}

fn bob_says(text: &str) -> Vec<u8> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    JsonCodec.encode(&ChatMessage {
        from: "bob".into(),
        to: "lobby".into(),
        kind: MessageKind::Chat,
        data: Some(text.into()),
        timestamp,
    })
}

async fn next_event(actions: &mut futures::channel::mpsc::UnboundedReceiver<Action>) -> Event {
    match actions.next().await {
        Some(Action::Event(event)) => event,
        other => panic!("Expected an event, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn drives_a_session_until_it_leaves() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let sync = SharedSync::default();
    let session = Session::new(
        Identity::new("alice", "lobby", ALICE_PREFIX, ALICE_SESSION),
        sync.clone(),
        Config::default(),
    );
    let (handle, mut actions) = driver::spawn(session);

    handle.initial().unwrap();
    assert_eq!(
        next_event(&mut actions).await,
        Event::ParticipantJoined {
            name: "alice".into()
        }
    );

    assert_eq!(handle.send("").await, Ok(None));
    assert_eq!(handle.send("hi").await, Ok(Some(1)));
    let served = handle
        .serve(DataName::new(ALICE_PREFIX, ALICE_SESSION, 1))
        .await
        .unwrap()
        .expect("our message is served");
    assert_eq!(
        JsonCodec.decode(&served).unwrap().data.as_deref(),
        Some("hi")
    );

    sync.advance(BOB_PREFIX, BOB_SESSION, 1);
    handle
        .sync_update(vec![SyncUpdate::new(BOB_PREFIX, BOB_SESSION, 1)], false)
        .unwrap();
    let request = match actions.next().await {
        Some(Action::Fetch(request)) => request,
        other => panic!("Expected a fetch, got {other:?}"),
    };
    assert_eq!(request.name, DataName::new(BOB_PREFIX, BOB_SESSION, 1));
    assert_eq!(request.timeout, Duration::from_secs(5));

    handle
        .fetch_response(request.id, bob_says("hello alice"))
        .unwrap();
    assert_eq!(
        next_event(&mut actions).await,
        Event::ParticipantJoined { name: "bob".into() }
    );
    assert_eq!(
        next_event(&mut actions).await,
        Event::MessageReceived {
            from: "bob".into(),
            text: "hello alice".into()
        }
    );

    // Bob stays silent; the paused clock runs ahead to his liveness deadline.
    let silent_since = tokio::time::Instant::now();
    assert_eq!(
        next_event(&mut actions).await,
        Event::ParticipantLeft { name: "bob".into() }
    );
    assert!(silent_since.elapsed() >= Duration::from_secs(120));

    // Heartbeats went out in the meantime.
    assert!(handle.leave().await.unwrap() >= 3);
    assert_eq!(
        handle.leave().await,
        Err(DriverError::Session(SessionError::AlreadyLeft))
    );

    // The task stops after the grace period.
    assert!(actions.next().await.is_none());
    assert_eq!(handle.send("anyone?").await, Err(DriverError::Stopped));
}

#[tokio::test(start_paused = true)]
async fn stops_when_every_handle_is_dropped() {
    let session = Session::new(
        Identity::new("alice", "lobby", ALICE_PREFIX, ALICE_SESSION),
        SharedSync::default(),
        Config::default(),
    );
    let (handle, mut actions) = driver::spawn(session);
    handle.initial().unwrap();
    drop(handle);

    assert!(matches!(
        actions.next().await,
        Some(Action::Event(Event::ParticipantJoined { .. }))
    ));
    assert!(actions.next().await.is_none());
}
