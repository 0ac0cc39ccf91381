#![warn(missing_docs)]

//! This crate contains a small, generalized API for persisting keyed records
//! from different backends and encoding schemes.
//!
//! In order to use it, first select or implement an [Encoder], and then select
//! or implement a [StorageBackend]. When you have selected these things, you
//! can construct a [Storage]:
//!
//! ```rust
//! use parcel_storage::{CborEncoder, MemoryStorageBackend, Storage};
//!
//! // Create a CBOR encoder for serialization/deserialization
//! let encoder = CborEncoder;
//!
//! // Create an in-memory storage backend with byte keys and values
//! let backend = MemoryStorageBackend::<Vec<u8>, Vec<u8>>::default();
//!
//! // Combine them into a Storage instance
//! let storage = Storage {
//!     encoder,
//!     backend
//! };
//! ```
//!
//! The prepared `storage` can then read and write any serde-compatible record
//! by key.

mod encoder;
pub use encoder::*;

mod error;
pub use error::*;

mod storage;
pub use storage::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
