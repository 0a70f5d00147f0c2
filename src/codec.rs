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

use crate::{error::DecodeError, types::ChatMessage};

/// A `Codec` defines how a [`ChatMessage`] is laid out in the content of a fetched message.
pub trait Codec {
    /// Encodes a message served to a remote participant.
    fn encode(&self, message: &ChatMessage) -> Vec<u8>;

    /// Decodes the content of a fetched message.
    fn decode(&self, bytes: &[u8]) -> Result<ChatMessage, DecodeError>;
}

/// Max payload size in bytes
const PAYLOAD_SIZE_MAXIMUM: usize = 64 * 1024;

/// Encodes chat messages as JSON objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &ChatMessage) -> Vec<u8> {
        // Serialising a struct of strings and integers into memory can't fail.
        serde_json::to_vec(message).unwrap_or_default()
    }

    fn decode(&self, bytes: &[u8]) -> Result<ChatMessage, DecodeError> {
        if bytes.len() > PAYLOAD_SIZE_MAXIMUM {
            return Err(DecodeError::from(<serde_json::Error as serde::de::Error>::custom(
                format!(
                    "payload size ({} bytes) exceeds maximum ({PAYLOAD_SIZE_MAXIMUM} bytes)",
                    bytes.len()
                ),
            )));
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}
