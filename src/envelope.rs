//! Call envelopes and the argument wire format.
//!
//! Argument tuples and results travel as opaque serialized byte blobs. The
//! encoding is an internal contract between an executor's `call` side and its
//! own worker loop; no cross-implementation interoperability is guaranteed.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::target::TargetKey;

/// How a dispatched call relates to its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// The caller never waits for or observes a result.
    FireAndForget,
    /// The caller blocks until a result (or failure) is available.
    CallAndWait,
}

impl DispatchMode {
    /// Whether the caller expects a result payload back.
    pub fn expects_result(&self) -> bool {
        matches!(self, Self::CallAndWait)
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FireAndForget => f.write_str("fire-and-forget"),
            Self::CallAndWait => f.write_str("call-and-wait"),
        }
    }
}

/// One intercepted call on its way to an executor.
///
/// Built once per invocation by the dispatch interceptor and consumed exactly
/// once by [`Executor::call`](crate::executor::Executor::call).
#[derive(Debug, Clone)]
pub struct CallEnvelope {
    /// The dispatchable method being called.
    pub target: TargetKey,
    /// Serialized argument tuple, produced by [`encode`].
    pub payload: Vec<u8>,
    /// Result semantics the caller expects.
    pub mode: DispatchMode,
}

impl CallEnvelope {
    pub fn new(target: TargetKey, payload: Vec<u8>, mode: DispatchMode) -> Self {
        Self {
            target,
            payload,
            mode,
        }
    }
}

/// Serialize an argument tuple or result for transport.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a payload produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_tuple_round_trip() {
        let payload = encode(&("a".to_string(), 2i64)).unwrap();
        let (a, b): (String, i64) = decode(&payload).unwrap();
        assert_eq!(a, "a");
        assert_eq!(b, 2);
    }

    #[test]
    fn test_unit_result_round_trip() {
        let payload = encode(&()).unwrap();
        let _: () = decode(&payload).unwrap();
    }

    #[test]
    fn test_mode_expectations() {
        assert!(DispatchMode::CallAndWait.expects_result());
        assert!(!DispatchMode::FireAndForget.expects_result());
    }
}
