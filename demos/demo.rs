use rfreelist::FreeListAllocator;

/// Prints the free list in list order, one record per line.
fn print_free_mem(heap: &FreeListAllocator) {
  if heap.free_blocks().next().is_none() {
    println!("  (empty)");
    return;
  }
  for block in heap.free_blocks() {
    println!(
      "  [start: {}, size: {}, next: {:?}, prev: {:?}]",
      block.start, block.size, block.next_free, block.prev_free,
    );
  }
}

fn main() {
  // Route the allocator's trace/debug records to stderr.
  simple_logger::SimpleLogger::new().init().unwrap();

  // A 3000-byte managed region. The allocator owns the buffer and hands
  // out byte offsets into it.
  let mut heap = FreeListAllocator::with_capacity(3000).unwrap();

  println!("fresh heap, capacity = {} bytes", heap.capacity());
  print_free_mem(&heap);

  // --------------------------------------------------------------------
  // 1) Reserve 80 bytes (room for 20 little-endian u32 values).
  // --------------------------------------------------------------------
  let first = heap.reserve(80).expect("3000-byte heap fits 80 bytes");
  println!("\n[1] reserve(80) -> offset {first}");
  print_free_mem(&heap);

  // --------------------------------------------------------------------
  // 2) Release it. The span goes back to the front of the free list;
  //    note that it is NOT merged with the big remainder next to it.
  // --------------------------------------------------------------------
  heap.release(first);
  println!("\n[2] release({first})");
  print_free_mem(&heap);

  // --------------------------------------------------------------------
  // 3) Reserve 160 bytes. The freed 84-byte span at the front is too
  //    small for this request, so first-fit walks past it and carves the
  //    big remainder instead.
  // --------------------------------------------------------------------
  let second = heap.reserve(160).expect("plenty of room left");
  println!("\n[3] reserve(160) -> offset {second}");
  print_free_mem(&heap);

  // --------------------------------------------------------------------
  // 4) Release that too. Three disjoint records remain; no coalescing
  //    ever happens, so the list keeps all the seams.
  // --------------------------------------------------------------------
  heap.release(second);
  println!("\n[4] release({second})");
  print_free_mem(&heap);
}
