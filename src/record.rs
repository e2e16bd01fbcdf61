use std::mem;

/// Size in bytes of the allocation header written in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<u32>();

/// Size in bytes of an encoded [`FreeBlock`] (four `u32` fields).
pub const RECORD_SIZE: usize = 4 * mem::size_of::<u32>();

/// Sentinel offset meaning "no record here". Arena lengths are capped below
/// this value in `FreeListAllocator::new`, so it can never collide with a
/// real offset.
pub const NIL: u32 = u32::MAX;

const NEXT_FIELD: usize = 0;
const PREV_FIELD: usize = 4;
const START_FIELD: usize = 8;
const SIZE_FIELD: usize = 12;

/// Decoded view of one free block record.
///
/// The record itself lives inside the managed arena, at the first bytes of
/// the free span it describes. While the span is free those bytes double as
/// the record's storage; as soon as the span is carved into they are
/// overwritten by the allocation header and payload.
pub struct FreeBlock {
  /// Offset of the next record in the free list, or [`NIL`].
  pub next_free: u32,
  /// Offset of the previous record in the free list, or [`NIL`].
  pub prev_free: u32,
  /// Offset of the first byte of the span. Equals the record's own offset
  /// for as long as the span is free.
  pub start: u32,
  /// Length of the span in bytes, measured from `start`. Includes the bytes
  /// currently occupied by the record.
  pub size: u32,
}

impl FreeBlock {
  pub fn read(
    mem: &[u8],
    at: u32,
  ) -> Self {
    let at = at as usize;
    Self {
      next_free: read_u32(mem, at + NEXT_FIELD),
      prev_free: read_u32(mem, at + PREV_FIELD),
      start: read_u32(mem, at + START_FIELD),
      size: read_u32(mem, at + SIZE_FIELD),
    }
  }

  pub fn write(
    &self,
    mem: &mut [u8],
    at: u32,
  ) {
    let at = at as usize;
    write_u32(mem, at + NEXT_FIELD, self.next_free);
    write_u32(mem, at + PREV_FIELD, self.prev_free);
    write_u32(mem, at + START_FIELD, self.start);
    write_u32(mem, at + SIZE_FIELD, self.size);
  }
}

/// Rewrites only the `next_free` field of the record at `at`.
pub fn write_next(
  mem: &mut [u8],
  at: u32,
  next_free: u32,
) {
  write_u32(mem, at as usize + NEXT_FIELD, next_free);
}

/// Rewrites only the `prev_free` field of the record at `at`.
pub fn write_prev(
  mem: &mut [u8],
  at: u32,
  prev_free: u32,
) {
  write_u32(mem, at as usize + PREV_FIELD, prev_free);
}

/// Reads the allocation header at `at`: the payload size in bytes.
pub fn read_header(
  mem: &[u8],
  at: u32,
) -> u32 {
  read_u32(mem, at as usize)
}

/// Writes an allocation header at `at`, recording the payload size.
pub fn write_header(
  mem: &mut [u8],
  at: u32,
  payload_size: u32,
) {
  write_u32(mem, at as usize, payload_size);
}

fn read_u32(
  mem: &[u8],
  at: usize,
) -> u32 {
  let mut bytes = [0u8; 4];
  bytes.copy_from_slice(&mem[at..at + 4]);
  u32::from_le_bytes(bytes)
}

fn write_u32(
  mem: &mut [u8],
  at: usize,
  value: u32,
) {
  mem[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
