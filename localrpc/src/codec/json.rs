//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! JSON codec.

use crate::codec::{Codec, DeserializationError, SerializationError};

/// Human-readable codec built on `serde_json`.
///
/// Slower and larger than [`PostcardCodec`](crate::codec::PostcardCodec), but
/// payloads can be read directly in logs.
#[derive(Clone, Debug, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Creates a JSON codec producing compact output.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Produces pretty-printed JSON.
    pub fn with_pretty_print(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Produces compact JSON (the default).
    pub fn with_compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl Codec for JsonCodec {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        if self.pretty {
            serde_json::to_vec_pretty(value).map_err(Into::into)
        } else {
            serde_json::to_vec(value).map_err(Into::into)
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(Into::into)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
