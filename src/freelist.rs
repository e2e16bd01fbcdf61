use std::fmt;

use crate::record::{
  FreeBlock, HEADER_SIZE, NIL, RECORD_SIZE, read_header, write_header, write_next, write_prev,
};

/// Errors reported when constructing a [`FreeListAllocator`].
#[derive(Debug, PartialEq, Eq)]
pub enum AllocatorError {
  /// The region cannot host even a single free block record.
  RegionTooSmall,
  /// The region is too large to address with the 32-bit in-band offsets.
  RegionTooLarge,
}

impl fmt::Display for AllocatorError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::RegionTooSmall => {
        write!(f, "region is smaller than one free block record ({RECORD_SIZE} bytes)")
      }
      Self::RegionTooLarge => write!(f, "region does not fit 32-bit offsets"),
    }
  }
}

impl std::error::Error for AllocatorError {}

/// First-fit, split-only heap allocator over a fixed byte region.
///
/// The allocator owns its arena and hands out byte offsets into it. All
/// bookkeeping is in-band: a 4-byte size header precedes every payload, and
/// free spans carry a doubly-linked free block record in their first 16
/// bytes. Freed spans are pushed onto the front of the list and are never
/// merged with physically adjacent free spans, so long-running mixed
/// workloads fragment; that is the intended trade-off of this design.
///
/// Releasing an offset that did not come from [`reserve`](Self::reserve), or
/// releasing one twice, corrupts the in-band bookkeeping (or panics on an
/// out-of-bounds index). Callers are trusted, as in any `free`-style API.
pub struct FreeListAllocator {
  mem: Vec<u8>,
  /// Offset of the list head, or [`NIL`] once every byte is reserved.
  free_root: u32,
}

impl FreeListAllocator {
  /// Takes ownership of `mem` and establishes a single free block record
  /// spanning the whole region.
  pub fn new(mem: Vec<u8>) -> Result<Self, AllocatorError> {
    if mem.len() < RECORD_SIZE {
      return Err(AllocatorError::RegionTooSmall);
    }
    if mem.len() >= NIL as usize {
      return Err(AllocatorError::RegionTooLarge);
    }

    let mut heap = Self { mem, free_root: 0 };
    let whole = FreeBlock {
      next_free: NIL,
      prev_free: NIL,
      start: 0,
      size: heap.mem.len() as u32,
    };
    whole.write(&mut heap.mem, 0);

    Ok(heap)
  }

  /// Creates an allocator over a fresh zeroed region of `capacity` bytes.
  pub fn with_capacity(capacity: usize) -> Result<Self, AllocatorError> {
    Self::new(vec![0; capacity])
  }

  /// Size of the managed region in bytes.
  pub fn capacity(&self) -> usize {
    self.mem.len()
  }

  /// Reserves a span usable for `size` bytes of payload and returns its
  /// offset, or `None` if no free span is large enough. Failure is a normal
  /// outcome; the region does not grow.
  ///
  /// First-fit: the list is walked from the most recently freed span, and
  /// the first span with room for the header plus payload wins. The span is
  /// carved from the front; the remainder replaces it in the list in place.
  /// When the remainder is too small to host a record of its own, the whole
  /// span is handed out instead and the header records its full capacity,
  /// so the extra bytes come back on release.
  ///
  /// Size-0 requests are legal and yield a zero-length payload.
  pub fn reserve(
    &mut self,
    size: usize,
  ) -> Option<usize> {
    let needed = u32::try_from(size)
      .ok()
      .and_then(|n| n.checked_add(HEADER_SIZE as u32))?;

    let mut cur = self.free_root;
    while cur != NIL {
      let block = FreeBlock::read(&self.mem, cur);
      debug_assert_eq!(block.start, cur);

      if block.size >= needed {
        let payload = block.start + HEADER_SIZE as u32;
        let leftover = block.size - needed;

        if leftover as usize >= RECORD_SIZE {
          // Split: the remainder record takes over the carved record's spot
          // in the list, inheriting both neighbor links.
          let rest = block.start + needed;
          let rest_block = FreeBlock {
            next_free: block.next_free,
            prev_free: block.prev_free,
            start: rest,
            size: leftover,
          };
          rest_block.write(&mut self.mem, rest);

          if block.prev_free != NIL {
            write_next(&mut self.mem, block.prev_free, rest);
          }
          if block.next_free != NIL {
            write_prev(&mut self.mem, block.next_free, rest);
          }
          if self.free_root == cur {
            self.free_root = rest;
          }

          write_header(&mut self.mem, block.start, size as u32);
        } else {
          // Too little left over to host a record: hand out the whole span
          // unsplit. The header keeps the real capacity, not the request.
          self.unlink(&block);
          write_header(&mut self.mem, block.start, block.size - HEADER_SIZE as u32);
        }

        log::trace!("reserve({size}) -> offset {payload}");
        return Some(payload as usize);
      }

      cur = block.next_free;
    }

    log::trace!("reserve({size}): no free span large enough");
    None
  }

  /// Returns the span at `addr` (an offset previously handed out by
  /// [`reserve`](Self::reserve)) to the free list.
  ///
  /// The freed span is linked at the front of the list, header bytes
  /// included. Spans whose recorded payload is smaller than one free block
  /// record cannot re-enter the list and are silently dropped; those bytes
  /// stay lost for the lifetime of the heap.
  pub fn release(
    &mut self,
    addr: usize,
  ) {
    let at = (addr - HEADER_SIZE) as u32;
    let payload_size = read_header(&self.mem, at);

    if (payload_size as usize) < RECORD_SIZE {
      log::debug!("release({addr}): {payload_size}-byte span cannot host a record, dropping it");
      return;
    }

    let block = FreeBlock {
      next_free: self.free_root,
      prev_free: NIL,
      start: at,
      size: payload_size + HEADER_SIZE as u32,
    };
    block.write(&mut self.mem, at);

    if self.free_root != NIL {
      write_prev(&mut self.mem, self.free_root, at);
    }
    self.free_root = at;

    log::trace!("release({addr}): {} bytes back on the list", block.size);
  }

  /// Walks the free list in list order (most recently freed first).
  ///
  /// Debugging affordance only; correctness never depends on it.
  pub fn free_blocks(&self) -> FreeBlocks<'_> {
    FreeBlocks {
      mem: &self.mem,
      cur: self.free_root,
    }
  }

  /// Removes `block` from the free list without replacement.
  fn unlink(
    &mut self,
    block: &FreeBlock,
  ) {
    if block.prev_free != NIL {
      write_next(&mut self.mem, block.prev_free, block.next_free);
    } else {
      self.free_root = block.next_free;
    }
    if block.next_free != NIL {
      write_prev(&mut self.mem, block.next_free, block.prev_free);
    }
  }
}

impl fmt::Debug for FreeListAllocator {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let link = |l: Option<usize>| l.map_or(-1, |v| v as i64);

    write!(f, "free list:")?;
    for b in self.free_blocks() {
      write!(
        f,
        " [start: {}, size: {}, next: {}, prev: {}]",
        b.start,
        b.size,
        link(b.next_free),
        link(b.prev_free),
      )?;
    }
    Ok(())
  }
}

/// One entry yielded by [`FreeListAllocator::free_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlockInfo {
  /// Offset of the first byte of the free span.
  pub start: usize,
  /// Span length in bytes, record storage included.
  pub size: usize,
  /// Offset of the next record in list order, if any.
  pub next_free: Option<usize>,
  /// Offset of the previous record in list order, if any.
  pub prev_free: Option<usize>,
}

/// Iterator over the free list. See [`FreeListAllocator::free_blocks`].
pub struct FreeBlocks<'a> {
  mem: &'a [u8],
  cur: u32,
}

impl Iterator for FreeBlocks<'_> {
  type Item = FreeBlockInfo;

  fn next(&mut self) -> Option<FreeBlockInfo> {
    if self.cur == NIL {
      return None;
    }

    let block = FreeBlock::read(self.mem, self.cur);
    self.cur = block.next_free;

    Some(FreeBlockInfo {
      start: block.start as usize,
      size: block.size as usize,
      next_free: (block.next_free != NIL).then_some(block.next_free as usize),
      prev_free: (block.prev_free != NIL).then_some(block.prev_free as usize),
    })
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn heap(capacity: usize) -> FreeListAllocator {
    FreeListAllocator::with_capacity(capacity).unwrap()
  }

  /// Walks the whole list and checks the structural invariants: the walk
  /// terminates, every record sits at its own `start`, spans stay inside
  /// the region and never overlap, and every back-link inverts the
  /// corresponding forward link.
  fn assert_intact(heap: &FreeListAllocator) {
    let record_bound = heap.mem.len() / RECORD_SIZE + 1;

    let mut seen = Vec::new();
    let mut cur = heap.free_root;
    while cur != NIL {
      assert!(seen.len() < record_bound, "free list contains a cycle");
      let block = FreeBlock::read(&heap.mem, cur);
      assert_eq!(block.start, cur, "record not stored at its own start");
      assert!(
        cur as usize + block.size as usize <= heap.mem.len(),
        "free span reaches past the region"
      );
      assert!(block.size as usize >= RECORD_SIZE);
      seen.push(cur);
      cur = block.next_free;
    }

    if let Some(&first) = seen.first() {
      assert_eq!(first, heap.free_root);
      assert_eq!(FreeBlock::read(&heap.mem, first).prev_free, NIL);
    }
    for pair in seen.windows(2) {
      assert_eq!(FreeBlock::read(&heap.mem, pair[1]).prev_free, pair[0]);
    }

    let mut spans: Vec<(u32, u32)> = seen
      .iter()
      .map(|&at| (at, at + FreeBlock::read(&heap.mem, at).size))
      .collect();
    spans.sort_unstable();
    for pair in spans.windows(2) {
      assert!(pair[0].1 <= pair[1].0, "free spans overlap");
    }
  }

  #[test]
  fn test_initial_list_covers_region() {
    let heap = heap(3000);

    let blocks: Vec<_> = heap.free_blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].start, 0);
    assert_eq!(blocks[0].size, 3000);
    assert_eq!(blocks[0].next_free, None);
    assert_eq!(blocks[0].prev_free, None);
    assert_intact(&heap);
  }

  #[test]
  fn test_rejects_unusable_regions() {
    assert_eq!(
      FreeListAllocator::with_capacity(RECORD_SIZE - 1).unwrap_err(),
      AllocatorError::RegionTooSmall,
    );
    assert!(FreeListAllocator::with_capacity(RECORD_SIZE).is_ok());
  }

  #[test]
  fn test_reserve_carves_the_front() {
    let mut heap = heap(3000);

    let addr = heap.reserve(80).unwrap();
    assert_eq!(addr, HEADER_SIZE);

    let blocks: Vec<_> = heap.free_blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].start, 84);
    assert_eq!(blocks[0].size, 2916);
    assert_intact(&heap);
  }

  #[test]
  fn test_sequential_reserves_are_adjacent() {
    let mut heap = heap(3000);

    let a = heap.reserve(80).unwrap();
    let b = heap.reserve(160).unwrap();
    assert_eq!(b, a + 80 + HEADER_SIZE);
    assert_intact(&heap);
  }

  #[test]
  fn test_zero_size_reserve_succeeds() {
    let mut heap = heap(256);

    let addr = heap.reserve(0).unwrap();
    assert_eq!(addr, HEADER_SIZE);
    // only the header was consumed
    assert_eq!(heap.free_blocks().next().unwrap().size, 256 - HEADER_SIZE);
    assert_intact(&heap);
  }

  #[test]
  fn test_oversized_requests_fail_cleanly() {
    let mut heap = heap(64);

    assert_eq!(heap.reserve(100), None);
    assert_eq!(heap.reserve(usize::MAX), None);
    // the list is untouched afterwards
    let blocks: Vec<_> = heap.free_blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].size, 64);
    assert_intact(&heap);
  }

  #[test]
  fn test_round_trip_returns_the_same_offset() {
    let mut heap = heap(3000);

    let addr = heap.reserve(80).unwrap();
    heap.release(addr);
    assert_eq!(heap.reserve(80), Some(addr));
    assert_intact(&heap);
  }

  #[test]
  fn test_exhaustion_and_recovery() {
    let mut heap = heap(64);

    // The whole region fits one 60-byte payload: 64 = header + 60, and the
    // zero-byte remainder cannot host a record, so the span goes out whole.
    let addr = heap.reserve(60).unwrap();
    assert_eq!(addr, HEADER_SIZE);
    assert_eq!(heap.free_blocks().count(), 0);

    // Even a zero-size request needs a free span.
    assert_eq!(heap.reserve(0), None);

    heap.release(addr);
    assert_intact(&heap);
    assert_eq!(heap.reserve(60), Some(addr));
  }

  #[test]
  fn test_exhaustion_by_many_small_reserves() {
    let mut heap = heap(64);

    let mut offsets = Vec::new();
    while let Some(addr) = heap.reserve(12) {
      assert!(addr + 12 <= heap.capacity());
      assert!(!offsets.contains(&addr));
      offsets.push(addr);
      assert_intact(&heap);
      assert!(offsets.len() <= 8, "more reservations than the region can hold");
    }

    // 64 bytes fit three split 12-byte blocks plus one retained remainder.
    assert_eq!(offsets, vec![4, 20, 36, 52]);
    assert_eq!(heap.free_blocks().count(), 0);
  }

  #[test]
  fn test_small_released_span_is_dropped() {
    let mut heap = heap(3000);

    let a = heap.reserve(8).unwrap();
    heap.release(a);

    // An 8-byte payload cannot host a record, so the list did not grow and
    // the next reservation comes from the surviving remainder instead.
    assert_eq!(heap.free_blocks().count(), 1);
    let b = heap.reserve(8).unwrap();
    assert_eq!(b, a + 8 + HEADER_SIZE);
    assert_intact(&heap);
  }

  #[test]
  fn test_released_spans_are_not_coalesced() {
    let mut heap = heap(3000);

    let a = heap.reserve(40).unwrap();
    let b = heap.reserve(40).unwrap();
    heap.release(a);
    heap.release(b);

    // Physically adjacent, yet three separate records: b, a, remainder.
    let starts: Vec<_> = heap.free_blocks().map(|blk| blk.start).collect();
    assert_eq!(starts, vec![b - HEADER_SIZE, a - HEADER_SIZE, 88]);
    assert_intact(&heap);
  }

  /// The concrete demonstration sequence: two allocations, a release, a
  /// front-of-list reuse, and a second release leaving two disjoint records.
  #[test]
  fn test_demo_sequence() {
    let mut heap = heap(3000);

    let a = heap.reserve(80).unwrap();
    let b = heap.reserve(160).unwrap();
    assert!(b > a);
    assert_eq!(b, a + 80 + HEADER_SIZE);

    heap.release(a);
    assert_eq!(heap.reserve(80), Some(a));

    heap.release(b);
    let blocks: Vec<_> = heap.free_blocks().collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].start, b - HEADER_SIZE);
    assert_eq!(blocks[0].size, 164);
    assert_eq!(blocks[1].start, 248);
    assert_eq!(blocks[1].size, 2752);
    assert_intact(&heap);
  }

  proptest! {
    /// Random reserve/release interleavings never hand out overlapping
    /// payloads, never leave the region, and keep the list structurally
    /// sound after every single operation.
    #[test]
    fn prop_random_ops_preserve_invariants(
      ops in proptest::collection::vec((any::<bool>(), 0usize..200), 1..64),
    ) {
      let mut heap = FreeListAllocator::with_capacity(2048).unwrap();
      let mut live: Vec<(usize, usize)> = Vec::new();

      for (wants_reserve, n) in ops {
        if wants_reserve || live.is_empty() {
          if let Some(addr) = heap.reserve(n) {
            prop_assert!(addr >= HEADER_SIZE);
            prop_assert!(addr + n <= heap.capacity());
            for &(other, m) in &live {
              let disjoint = addr + n <= other - HEADER_SIZE || other + m <= addr - HEADER_SIZE;
              prop_assert!(disjoint, "span at {addr} overlaps live span at {other}");
            }
            live.push((addr, n));
          }
        } else {
          let (addr, _) = live.swap_remove(n % live.len());
          heap.release(addr);
        }
        assert_intact(&heap);
      }
    }
  }
}
