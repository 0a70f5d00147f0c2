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


//! Presence and messaging for a group chat room built on a sequence-number synchronisation
//! layer.
//!
//! Every participant publishes its messages under its own name prefix and announces them by
//! bumping a sequence number. The synchronisation layer spreads those sequence numbers; this
//! crate turns them into a chat: it fetches the announced messages, keeps a roster of who is
//! present, announces the local participant with periodic heartbeats and serves its own
//! messages to everyone else.
//!
//! # Usage
//!
//! The [`Session`] is a state machine that performs no I/O. Feed it the callbacks of the
//! synchronisation layer ([`Session::on_initial`], [`Session::on_sync_update`]), of the
//! transport ([`Session::on_fetch_response`], [`Session::on_fetch_timeout`],
//! [`Session::serve`]) and of the clock ([`Session::on_timeout`] at
//! [`Session::next_deadline`]), then drain [`Session::next_action`] for the fetches to issue
//! and the [`Event`]s to display.
//!
//! With the `tokio` feature, [`driver::spawn`] runs a session on its own task.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod codec;
mod config;
mod error;
mod fetch;
mod heartbeat;
mod identity;
mod mcache;
mod roster;
mod session;
mod sync;
mod timer;
mod types;

#[cfg(feature = "tokio")]
pub mod driver;

pub use crate::codec::{Codec, JsonCodec};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{ConfigBuilderError, DecodeError, DeliveryError, NameError, SessionError};
pub use crate::identity::Identity;
pub use crate::mcache::MessageCache;
pub use crate::roster::Roster;
pub use crate::session::{Action, Event, Session, SessionState};
pub use crate::sync::SyncHandle;
pub use crate::types::{
    CachedMessage, ChatMessage, DataName, FetchId, FetchRequest, MessageKind, RosterEntry,
    SyncUpdate,
};
