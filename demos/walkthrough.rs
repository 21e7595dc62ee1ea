use std::{io::Read, ptr::NonNull};

use brkheap::{Heap, HeapConfig, HeapResult, Sbrk, SearchMode};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break, the upper boundary of the heap.
fn print_program_break(
  label: &str,
) {
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    Sbrk::program_break(),
  );
}

fn print_block(
  heap: &Heap,
  label: &str,
  payload: NonNull<u8>,
) -> HeapResult<()> {
  let block = heap.header_of(payload)?;
  println!(
    "{} payload = {:?}, header = {:?}, size = {}, used = {}, program break = {:?}",
    label,
    payload,
    block.header,
    block.size,
    block.used,
    Sbrk::program_break(),
  );
  Ok(())
}

fn main() -> HeapResult<()> {
  env_logger::init();

  // BRKHEAP_SEARCH_MODE=next-fit switches the strategy for the whole run.
  let config = HeapConfig::from_env()?;
  let mut heap = Heap::new();
  heap.initialize(config.search_mode);
  println!("Search mode: {}", heap.mode());

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Allocate 3 bytes. The request is rounded up to one machine word.
  // --------------------------------------------------------------------
  let first = heap.allocate(3)?;
  println!("\n[1] Allocate 3 bytes");
  print_block(&heap, "[1]", first)?;

  let first_ptr = first.cast::<u32>();
  unsafe { first_ptr.write(0xDEADBEEF) };
  println!("[1] Value written = 0x{:X}", unsafe { first_ptr.read() });

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 12 bytes, padded to the next word multiple.
  // --------------------------------------------------------------------
  let second = heap.allocate(12)?;
  println!("\n[2] Allocate 12 bytes");
  print_block(&heap, "[2]", second)?;

  unsafe { second.write_bytes(0xAB, 12) };
  println!("[2] Initialized second block with 0xAB");

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Release the first block and ask for something that fits in it.
  //    No new memory is requested from the OS.
  // --------------------------------------------------------------------
  heap.release(first)?;
  println!("\n[3] Released first block at {:?}", first);

  let third = heap.allocate(2)?;
  print_block(&heap, "[3]", third)?;
  println!(
    "[3] third == first? {}",
    if third == first {
      "Yes, the freed block was reused"
    } else {
      "No, the heap grew instead"
    }
  );

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Release two blocks and allocate twice. First-fit returns them in
  //    address order; next-fit continues after the last block it handed out.
  // --------------------------------------------------------------------
  let fourth = heap.allocate(16)?;
  heap.release(third)?;
  heap.release(fourth)?;

  let a = heap.allocate(8)?;
  let b = heap.allocate(8)?;
  println!("\n[4] Released {:?} and {:?}, got back {:?} then {:?}", third, fourth, a, b);

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) A large allocation moves the break up.
  // --------------------------------------------------------------------
  print_program_break("before large alloc");

  let big = heap.allocate(64 * 1024)?;
  println!("\n[5] Allocate 64 KiB");
  print_block(&heap, "[5]", big)?;

  print_program_break("after large alloc");
  println!("[5] {}", heap.stats());
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) Reset hands everything back and the break returns to where the
  //    heap started.
  // --------------------------------------------------------------------
  heap.reset();
  print_program_break("after reset");
  println!("\n[6] End of example.");

  Ok(())
}
