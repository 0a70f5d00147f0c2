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


//! Runs a [`Session`] on a tokio task.
//!
//! The task owns the session and applies one command at a time, so callbacks of the
//! synchronisation layer, the transport and the user never race each other. Actions produced
//! by the session are forwarded on the channel returned by [`spawn`].

use std::future;

use futures::{
    channel::{mpsc, oneshot},
    StreamExt,
};
use tokio::time::Instant;
use web_time::SystemTime;

use crate::{
    codec::Codec,
    error::SessionError,
    session::{Action, Session, SessionState},
    sync::SyncHandle,
    types::{DataName, FetchId, SyncUpdate},
};

/// Commands that can be sent to the task driving a session.
#[derive(Debug)]
enum Command {
    Initial,
    SyncUpdate {
        updates: Vec<SyncUpdate>,
        is_recovery: bool,
    },
    FetchResponse {
        id: FetchId,
        payload: Vec<u8>,
    },
    FetchTimeout(FetchId),
    Send {
        text: String,
        reply: oneshot::Sender<Result<Option<u64>, SessionError>>,
    },
    Leave {
        reply: oneshot::Sender<Result<u64, SessionError>>,
    },
    Serve {
        name: DataName,
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
}

/// Error returned by a [`SessionHandle`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DriverError {
    /// The task driving the session has ended.
    #[error("session task has stopped")]
    Stopped,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Cloneable access to a session running on its own task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    /// See [`Session::on_initial`].
    pub fn initial(&self) -> Result<(), DriverError> {
        self.submit(Command::Initial)
    }

    /// See [`Session::on_sync_update`].
    pub fn sync_update(
        &self,
        updates: Vec<SyncUpdate>,
        is_recovery: bool,
    ) -> Result<(), DriverError> {
        self.submit(Command::SyncUpdate {
            updates,
            is_recovery,
        })
    }

    /// See [`Session::on_fetch_response`].
    pub fn fetch_response(&self, id: FetchId, payload: Vec<u8>) -> Result<(), DriverError> {
        self.submit(Command::FetchResponse { id, payload })
    }

    /// See [`Session::on_fetch_timeout`].
    pub fn fetch_timeout(&self, id: FetchId) -> Result<(), DriverError> {
        self.submit(Command::FetchTimeout(id))
    }

    /// See [`Session::send`].
    pub async fn send(&self, text: impl Into<String>) -> Result<Option<u64>, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Send {
            text: text.into(),
            reply,
        })?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    /// See [`Session::leave`].
    pub async fn leave(&self) -> Result<u64, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Leave { reply })?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    /// See [`Session::serve`].
    pub async fn serve(&self, name: DataName) -> Result<Option<Vec<u8>>, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Serve { name, reply })?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    fn submit(&self, command: Command) -> Result<(), DriverError> {
        self.commands
            .unbounded_send(command)
            .map_err(|_| DriverError::Stopped)
    }
}

/// Spawns a task driving `session`.
///
/// The task ends once the session closed after leaving, or once every [`SessionHandle`] was
/// dropped. The returned receiver yields `None` afterwards.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
pub fn spawn<S, C>(session: Session<S, C>) -> (SessionHandle, mpsc::UnboundedReceiver<Action>)
where
    S: SyncHandle + Send + 'static,
    C: Codec + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded();
    let (action_tx, action_rx) = mpsc::unbounded();
    let driver = Driver {
        session,
        commands: command_rx,
        actions: action_tx,
        clock: Clock::start(),
    };
    tokio::spawn(driver.run());
    (
        SessionHandle {
            commands: command_tx,
        },
        action_rx,
    )
}

/// Wall-clock time advancing with tokio's clock, so that a paused runtime pauses it too.
#[derive(Debug, Clone, Copy)]
struct Clock {
    wall: SystemTime,
    base: Instant,
}

impl Clock {
    fn start() -> Self {
        Clock {
            wall: SystemTime::now(),
            base: Instant::now(),
        }
    }

    fn now(&self) -> SystemTime {
        self.wall + self.base.elapsed()
    }

    fn instant_at(&self, at: SystemTime) -> Instant {
        self.base + at.duration_since(self.wall).unwrap_or_default()
    }
}

struct Driver<S, C> {
    session: Session<S, C>,
    commands: mpsc::UnboundedReceiver<Command>,
    actions: mpsc::UnboundedSender<Action>,
    clock: Clock,
}

impl<S, C> Driver<S, C>
where
    S: SyncHandle,
    C: Codec,
{
    async fn run(mut self) {
        loop {
            self.flush();
            if self.session.state() == SessionState::Closed {
                break;
            }

            let deadline = self
                .session
                .next_deadline()
                .map(|at| self.clock.instant_at(at));
            let timer = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => future::pending().await,
                }
            };

            tokio::select! {
                command = self.commands.next() => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        tracing::debug!("Every session handle was dropped");
                        break;
                    }
                },
                _ = timer => self.session.on_timeout(self.clock.now()),
            }
        }
        self.flush();
        tracing::debug!(room=%self.session.identity().chat_room(), "Session task stopped");
    }

    fn on_command(&mut self, command: Command) {
        let now = self.clock.now();
        match command {
            Command::Initial => self.session.on_initial(now),
            Command::SyncUpdate {
                updates,
                is_recovery,
            } => self.session.on_sync_update(&updates, is_recovery),
            Command::FetchResponse { id, payload } => {
                self.session.on_fetch_response(id, &payload, now)
            }
            Command::FetchTimeout(id) => self.session.on_fetch_timeout(id),
            Command::Send { text, reply } => {
                let _ = reply.send(self.session.send(&text, now));
            }
            Command::Leave { reply } => {
                let _ = reply.send(self.session.leave(now));
            }
            Command::Serve { name, reply } => {
                let _ = reply.send(self.session.serve(&name));
            }
        }
    }

    fn flush(&mut self) {
        while let Some(action) = self.session.next_action() {
            if self.actions.unbounded_send(action).is_err() {
                tracing::trace!("Action receiver dropped, discarding action");
            }
        }
    }
}
