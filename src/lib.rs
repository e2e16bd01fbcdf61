//! # rfreelist - A First-Fit Free-List Heap Allocator
//!
//! This crate provides a simple **first-fit, split-only allocator** that
//! manages a fixed, pre-declared byte region without help from any
//! underlying allocator.
//!
//! ## Overview
//!
//! All bookkeeping lives *inside* the managed region: a 4-byte size header
//! precedes every payload, and every free span begins with a 16-byte record
//! linking it into a doubly-linked free list.
//!
//! ```text
//!   Managed Region:
//!
//!   ┌────────────────────────────────────────────────────────────────────┐
//!   │ ┌────┬─────────┐ ┌──────────────────┐ ┌────┬─────────┐ ┌─────────┐ │
//!   │ │hdr │ payload │ │ FreeBlock record │ │hdr │ payload │ │FreeBlock│ │
//!   │ │ 80 │ 80 B    │ │ next prev        │ │ 24 │ 24 B    │ │ record  │ │
//!   │ └────┴─────────┘ │ start size       │ └────┴─────────┘ └─▲───────┘ │
//!   │                  └──────▲─────┬─────┘                    │         │
//!   └─────────────────────────┼─────┼──────────────────────────┼─────────┘
//!                             │     └────── next_free ─────────┘
//!                         free_root
//!
//!   A free span's first bytes double as its own metadata. Once the span is
//!   carved into, the header and payload overwrite the record.
//! ```
//!
//! Reservation walks the list front to back and carves the first span large
//! enough off the front, leaving the remainder in the list at the same
//! position (first-fit, front-split). Release pushes the span back onto the
//! front of the list. Adjacent free spans are never merged: no coalescing,
//! by design.
//!
//! ## Crate Structure
//!
//! ```text
//!   rfreelist
//!   ├── record    - In-band metadata encoding (internal)
//!   └── freelist  - FreeListAllocator implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rfreelist::FreeListAllocator;
//!
//! let mut heap = FreeListAllocator::with_capacity(3000).unwrap();
//!
//! // Reserve 80 bytes; failure is a checkable `None`, never a panic.
//! let addr = heap.reserve(80).unwrap();
//!
//! // ... the span [addr, addr + 80) is yours ...
//!
//! heap.release(addr);
//! ```
//!
//! ## How It Works
//!
//! The allocator owns its arena (`Vec<u8>`) and hands out byte *offsets*
//! into it rather than raw pointers, so every access is a bounds-checked
//! slice index. The splitting and linking algorithm is otherwise exactly
//! the classic in-band free-list design:
//!
//! ```text
//!   reserve(n):  walk free list ──▶ first span with size >= n + 4
//!                 │
//!                 ├─ enough left over? write remainder record right after
//!                 │  the payload; it inherits the old record's neighbors
//!                 │
//!                 └─ otherwise hand out the whole span and unlink it
//!
//!   release(a):  read header at a - 4, push a fresh record for the span
//!                onto the front of the list (no merging with neighbors)
//! ```
//!
//! ## Limitations
//!
//! - **Single-caller only**: the allocator is an ordinary `&mut self`
//!   object; wrap it in a mutex if it must be shared across threads.
//! - **No coalescing**: freeing two neighboring blocks never merges them,
//!   so fragmentation accumulates over mixed workloads.
//! - **No alignment guarantees** beyond the natural alignment of the
//!   4-byte integer metadata.
//! - **Tiny spans leak**: a released span too small to host a free block
//!   record is dropped for good.
//! - **Trusted callers**: double-release and foreign offsets are not
//!   detected; they corrupt the heap's own bookkeeping (never memory
//!   outside it, since all accesses stay inside the owned arena).

mod freelist;
mod record;

pub use freelist::{AllocatorError, FreeBlockInfo, FreeBlocks, FreeListAllocator};
