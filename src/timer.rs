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
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use web_time::SystemTime;

/// Tasks waiting for their deadline, fired earliest first.
///
/// Tasks scheduled for the same deadline fire in the order they were scheduled.
#[derive(Debug)]
pub(crate) struct Timers<T> {
    queue: BinaryHeap<Reverse<Scheduled<T>>>,
    next_id: u64,
}

#[derive(Debug)]
struct Scheduled<T> {
    deadline: SystemTime,
    id: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.id).cmp(&(other.deadline, other.id))
    }
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Timers {
            queue: BinaryHeap::new(),
            next_id: 0,
        }
    }
}

impl<T> Timers<T> {
    pub(crate) fn schedule(&mut self, deadline: SystemTime, task: T) {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Reverse(Scheduled { deadline, id, task }));
    }

    /// The earliest deadline still pending.
    pub(crate) fn next_deadline(&self) -> Option<SystemTime> {
        self.queue.peek().map(|Reverse(s)| s.deadline)
    }

    /// Removes and returns the earliest task whose deadline is not after `now`.
    pub(crate) fn pop_expired(&mut self, now: SystemTime) -> Option<T> {
        if self.next_deadline()? > now {
            return None;
        }
        self.queue.pop().map(|Reverse(s)| s.task)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}
