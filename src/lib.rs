//! failfast-collections: a growable array and a separately chained hash
//! table whose cursors detect structural modification.
//!
//! Internal Design:
//!
//! Summary
//! - Two containers share a small capability (`SizedContainer`) and a
//!   fail-fast cursor protocol.
//!   - DynamicArray<E>: contiguous slots, explicit capacity, doubling
//!     growth, shifting insert/remove.
//!   - HashTable<K, V, S>: power-of-two bucket array of singly linked
//!     chains; nodes live in a `slotmap` arena and buckets hold the key of
//!     the chain head.
//!   - registry: a consumer that keeps vehicle records in both containers
//!     and reads/writes a lenient line format.
//!
//! Cursors
//! - A cursor is a detached position plus a stamp of the container's
//!   revision. Each step borrows the container explicitly, so the borrow
//!   checker rules out mutation while a step's result is alive, and the
//!   stamp catches mutation between steps.
//! - Structural operations (push/insert/remove/clear, adding or removing a
//!   key, growth) bump the revision. Replacing a value in place does not.
//! - A cursor's own `remove` refreshes its stamp. Any other mismatch is
//!   terminal: every later call reports `ConcurrentModification`.
//! - Handing a cursor a different container yields `ForeignContainer`.
//!
//! Hashing
//! - Each node caches the spread hash of its key; growth relinks nodes
//!   from the cached value and never calls `K: Hash` again.
//! - The default hasher is deterministic, so traversal order is stable
//!   across runs for a given insertion history.
//!
//! Notes and non-goals
//! - Single-threaded; nothing here is synchronized.
//! - Tables and arrays never shrink; `clear` keeps the allocation.
//! - Traversal order of the hash table is unspecified beyond determinism.

pub mod dynamic_array;
mod error;
pub mod hash_table;
mod hash_table_proptest;
pub mod registry;
mod revision;
mod sized;

// Public surface
pub use dynamic_array::{ArrayCursor, DynamicArray};
pub use error::ContainerError;
pub use hash_table::{DefaultHashBuilder, HashTable, KeyCursor, TableCursor, ValueCursor};
pub use registry::{RegistryError, Vehicle, VehicleKind, VehicleRegistry};
pub use revision::CursorState;
pub use sized::SizedContainer;
