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

use crate::error::ConfigBuilderError;

/// Configuration parameters of a chat [`Session`](crate::Session).
#[derive(Clone, Debug)]
pub struct Config {
    max_cached_messages: usize,
    liveness_window: Duration,
    heartbeat_interval: Duration,
    fetch_timeout: Duration,
    stale_delivery_threshold: Duration,
    leave_grace_period: Duration,
}

impl Config {
    // All the getters

    /// Number of locally produced messages kept to answer remote fetches. Older messages are
    /// evicted first. The default is 100.
    pub fn max_cached_messages(&self) -> usize {
        self.max_cached_messages
    }

    /// How long a participant may stay silent before it is dropped from the roster. The
    /// default is 120 seconds.
    pub fn liveness_window(&self) -> Duration {
        self.liveness_window
    }

    /// Time between two heartbeats of the local participant. The default is 60 seconds.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Deadline handed to the transport for every fetch. The default is 5 seconds.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Fetched messages produced longer ago than this are dropped. The default is 120 seconds.
    pub fn stale_delivery_threshold(&self) -> Duration {
        self.stale_delivery_threshold
    }

    /// Time the session keeps serving after `leave` so that others can fetch the leave
    /// message. The default is 1 second.
    pub fn leave_grace_period(&self) -> Duration {
        self.leave_grace_period
    }
}

impl Default for Config {
    fn default() -> Self {
        // use ConfigBuilder to also validate defaults
        ConfigBuilder::default()
            .build()
            .expect("Default config parameters should be valid parameters")
    }
}

/// The builder struct for constructing a chat session configuration.
#[derive(Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        ConfigBuilder {
            config: Config {
                max_cached_messages: 100,
                liveness_window: Duration::from_secs(120),
                heartbeat_interval: Duration::from_secs(60),
                fetch_timeout: Duration::from_secs(5),
                stale_delivery_threshold: Duration::from_secs(120),
                leave_grace_period: Duration::from_secs(1),
            },
        }
    }
}

impl From<Config> for ConfigBuilder {
    fn from(config: Config) -> Self {
        ConfigBuilder { config }
    }
}

impl ConfigBuilder {
    pub fn max_cached_messages(&mut self, max_cached_messages: usize) -> &mut Self {
        self.config.max_cached_messages = max_cached_messages;
        self
    }

    pub fn liveness_window(&mut self, liveness_window: Duration) -> &mut Self {
        self.config.liveness_window = liveness_window;
        self
    }

    pub fn heartbeat_interval(&mut self, heartbeat_interval: Duration) -> &mut Self {
        self.config.heartbeat_interval = heartbeat_interval;
        self
    }

    pub fn fetch_timeout(&mut self, fetch_timeout: Duration) -> &mut Self {
        self.config.fetch_timeout = fetch_timeout;
        self
    }

    pub fn stale_delivery_threshold(&mut self, threshold: Duration) -> &mut Self {
        self.config.stale_delivery_threshold = threshold;
        self
    }

    pub fn leave_grace_period(&mut self, leave_grace_period: Duration) -> &mut Self {
        self.config.leave_grace_period = leave_grace_period;
        self
    }

    /// Constructs a [`Config`] from the given configuration and validates the settings.
    pub fn build(&self) -> Result<Config, ConfigBuilderError> {
        if self.config.max_cached_messages == 0 {
            return Err(ConfigBuilderError::EmptyCache);
        }
        if self.config.fetch_timeout.is_zero() {
            return Err(ConfigBuilderError::ZeroFetchTimeout);
        }
        // A single dropped heartbeat must not be enough to expire us on remote peers.
        if self.config.heartbeat_interval * 2 > self.config.liveness_window {
            return Err(ConfigBuilderError::HeartbeatTooSlow {
                heartbeat: self.config.heartbeat_interval,
                window: self.config.liveness_window,
            });
        }

        Ok(self.config.clone())
    }
}
