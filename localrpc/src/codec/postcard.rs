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

//! Postcard codec.

use crate::codec::{Codec, DeserializationError, SerializationError};

/// Compact binary codec built on `postcard`.
///
/// This is the default codec of generated proxies and invokers.
///
/// # Examples
///
/// ```rust
/// use localrpc::codec::{Codec, PostcardCodec};
///
/// // Refuse to decode payloads larger than 1 MiB.
/// let codec = PostcardCodec::new().with_max_size(1024 * 1024);
/// assert_eq!(codec.name(), "postcard");
/// ```
#[derive(Clone, Debug)]
pub struct PostcardCodec {
    max_size: Option<usize>,
}

impl PostcardCodec {
    /// Creates a postcard codec without a size limit.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Sets a maximum payload size accepted when decoding.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Removes any size limit.
    pub fn with_no_limit(mut self) -> Self {
        self.max_size = None;
        self
    }
}

impl Default for PostcardCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for PostcardCodec {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        postcard::to_allocvec(value).map_err(Into::into)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DeserializationError::too_large(bytes.len(), max_size));
            }
        }

        postcard::from_bytes(bytes).map_err(Into::into)
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Account {
        id: u64,
        owner: String,
        balance: i64,
        tags: Vec<String>,
        limits: BTreeMap<String, u32>,
        parent: Option<Box<Account>>,
    }

    fn sample() -> Account {
        Account {
            id: 7,
            owner: "ada".to_string(),
            balance: -1200,
            tags: vec!["vip".to_string(), "eu".to_string()],
            limits: BTreeMap::from([("daily".to_string(), 500), ("weekly".to_string(), 2000)]),
            parent: Some(Box::new(Account {
                id: 1,
                owner: "root".to_string(),
                balance: 0,
                tags: vec![],
                limits: BTreeMap::new(),
                parent: None,
            })),
        }
    }

    #[test]
    fn test_postcard_value_object() {
        let codec = PostcardCodec::default();
        let bytes = codec.serialize(&sample()).unwrap();
        let decoded: Account = codec.deserialize(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_postcard_unit_is_empty() {
        let codec = PostcardCodec::default();
        let bytes = codec.serialize(&()).unwrap();
        assert!(bytes.is_empty());
        let () = codec.deserialize(&bytes).unwrap();
    }

    #[test]
    fn test_postcard_invalid_data() {
        let codec = PostcardCodec::default();
        let result: Result<Account, _> = codec.deserialize(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(result.is_err());
    }

    #[test]
    fn test_postcard_with_max_size() {
        let bytes = PostcardCodec::new().serialize(&sample()).unwrap();
        let result: Result<Account, _> = PostcardCodec::new().with_max_size(5).deserialize(&bytes);
        let error = result.unwrap_err();
        assert!(error.to_string().contains("exceeds maximum"));

        let decoded: Account = PostcardCodec::new()
            .with_max_size(5)
            .with_no_limit()
            .deserialize(&bytes)
            .unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_postcard_deterministic() {
        let codec = PostcardCodec::default();
        assert_eq!(codec.serialize(&sample()).unwrap(), codec.serialize(&sample()).unwrap());
    }

    #[test]
    fn test_postcard_name() {
        assert_eq!(PostcardCodec::default().name(), "postcard");
    }
}
