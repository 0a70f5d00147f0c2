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

use rand::Rng;
use web_time::SystemTime;

use crate::types::unix_secs;

/// Prefix under which the sync layer of every room broadcasts its state.
const SYNC_BROADCAST_PREFIX: &str = "/ndn/broadcast/ChronoChat-0.3";

const RANDOM_COMPONENT_LEN: usize = 10;
const RANDOM_COMPONENT_ALPHABET: &[u8] =
    b"qwertyuiopasdfghjklzxcvbnmQWERTYUIOPASDFGHJKLZXCVBNM0123456789";

/// Who the local participant is and where it publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    screen_name: String,
    user_name: String,
    session_id: u64,
    chat_room: String,
    chat_prefix: String,
}

impl Identity {
    pub fn new(
        screen_name: impl Into<String>,
        chat_room: impl Into<String>,
        chat_prefix: impl Into<String>,
        session_id: u64,
    ) -> Self {
        let screen_name = screen_name.into();
        Identity {
            user_name: format!("{screen_name}{session_id}"),
            screen_name,
            session_id,
            chat_room: chat_room.into(),
            chat_prefix: chat_prefix.into(),
        }
    }

    /// Creates a fresh identity for joining `chat_room` through `hub_prefix`.
    ///
    /// The session id is the current UNIX time in seconds and the producer prefix is
    /// `<hub_prefix>/<chat_room>/<random component>`.
    pub fn generate<R: Rng>(
        screen_name: impl Into<String>,
        hub_prefix: &str,
        chat_room: impl Into<String>,
        rng: &mut R,
        now: SystemTime,
    ) -> Self {
        let chat_room = chat_room.into();
        let chat_prefix = format!(
            "{}/{}/{}",
            hub_prefix.trim_end_matches('/'),
            chat_room,
            random_component(rng)
        );
        Identity::new(screen_name, chat_room, chat_prefix, unix_secs(now))
    }

    /// Name shown to other participants.
    pub fn screen_name(&self) -> &str {
        &self.screen_name
    }

    /// Screen name suffixed with the session id.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn chat_room(&self) -> &str {
        &self.chat_room
    }

    /// Prefix the local participant publishes its messages under.
    pub fn chat_prefix(&self) -> &str {
        &self.chat_prefix
    }

    /// Prefix the sync layer of this room broadcasts its state under.
    pub fn sync_prefix(&self) -> String {
        format!("{SYNC_BROADCAST_PREFIX}/{}", self.chat_room)
    }
}

fn random_component<R: Rng>(rng: &mut R) -> String {
    (0..RANDOM_COMPONENT_LEN)
        .map(|_| {
            let index = rng.gen_range(0..RANDOM_COMPONENT_ALPHABET.len());
            char::from(RANDOM_COMPONENT_ALPHABET[index])
        })
        .collect()
}
