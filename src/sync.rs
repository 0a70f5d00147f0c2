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

/// The group synchronisation layer the session is built on.
///
/// The sync layer owns sequence-number allocation for the local producer and keeps the
/// latest known sequence number of every remote producer. Changes it observes are pushed into
/// the session with [`Session::on_sync_update`](crate::Session::on_sync_update).
pub trait SyncHandle {
    /// Publishes the next local sequence number and returns it.
    fn publish_next(&mut self) -> u64;

    /// The sequence number most recently published by the local producer.
    fn sequence_no(&self) -> u64;

    /// Latest sequence number known for a remote producer, or `None` if the producer is not
    /// tracked (never seen, or already dropped).
    fn producer_sequence_no(&self, prefix: &str, session_id: u64) -> Option<u64>;
}

impl<T: SyncHandle + ?Sized> SyncHandle for Box<T> {
    fn publish_next(&mut self) -> u64 {
        (**self).publish_next()
    }

    fn sequence_no(&self) -> u64 {
        (**self).sequence_no()
    }

    fn producer_sequence_no(&self, prefix: &str, session_id: u64) -> Option<u64> {
        (**self).producer_sequence_no(prefix, session_id)
    }
}
