// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::{fmt, ops::Deref};

use heapless::String;

use crate::{ProtoError, MAXLEN_ID};

/// Bounded message correlation id
#[derive(Clone, PartialEq, Eq, Default)]
pub struct MsgId(String<MAXLEN_ID>);

impl MsgId {
    /// Create an empty id, used where no request id is known
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Create an id from a string, failing if this exceeds [MAXLEN_ID]
    pub fn new(id: &str) -> Result<Self, ProtoError> {
        let mut s = String::new();
        s.push_str(id).map_err(|_| ProtoError::IdTooLong)?;
        Ok(Self(s))
    }

    /// Create an id from the longest prefix of `id` that fits, for tagging
    /// replies to requests with oversized ids
    pub fn truncated(id: &str) -> Self {
        let mut s = String::new();
        for c in id.chars() {
            if s.push(c).is_err() {
                break;
            }
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for MsgId {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for MsgId {
    type Error = ProtoError;

    fn try_from(id: &str) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl fmt::Debug for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.as_str())
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
