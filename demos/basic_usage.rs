#!/usr/bin/env rust

//! Basic usage example of the txbuf transmission buffer pool

use txbuf::{
    create_tx_buffer_pool, ReserveFailure, Result, TrxBufferIdentifier, TxBufferPoolConfigBuilder,
};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    println!("txbuf Transmission Buffer Pool Example");
    println!("======================================");

    let config = TxBufferPoolConfigBuilder::new()
        .max_codeblock_size(8448)
        .nof_buffers(4)
        .nof_codeblocks(16)
        .expire_timeout_slots(5)
        .build()?;

    println!("Creating pool with {} buffers and {} codeblocks", config.nof_buffers, config.nof_codeblocks);
    let controller = create_tx_buffer_pool(config)?;
    let pool = controller.get_pool();

    // First transmission for user 0x4601, HARQ process 0
    let id = TrxBufferIdentifier::new(0x4601, 0);
    let mut buffer = pool.reserve(0, id, 3);
    println!("\nReserved {} at tick 0: valid={}", id, buffer.is_valid());

    {
        let buf = buffer.get_mut();
        for cb in 0..buf.nof_codeblocks() {
            buf.codeblock_mut(cb, 32).insert(0xc0de_0000 | cb as u64, 0, 32);
            println!("  Codeblock {} -> absolute id {}", cb, buf.absolute_codeblock_id(cb));
        }
    }

    // A second reservation of a locked identifier is refused
    match pool.try_reserve(0, id, 3) {
        Err(ReserveFailure::IdentifierLocked) => println!("  Second reservation refused: identifier locked"),
        other => println!("  Unexpected outcome: {:?}", other.map(|b| b.is_valid())),
    }

    // Releasing the handle keeps the content for a retransmission
    drop(buffer);

    let buffer = pool.reserve(2, id, 3);
    println!("\nRetransmission at tick 2:");
    for cb in 0..buffer.get().nof_codeblocks() {
        println!("  Codeblock {}: {:#010x}", cb, buffer.get().codeblock(cb, 32).extract(0, 32));
    }
    drop(buffer);

    // Idle buffers are evicted once the timeout has elapsed
    for tick in 3..10 {
        pool.run_slot(tick);
    }

    let stats = pool.stats();
    println!("\nPool statistics:");
    println!("  Occupied buffers: {}", stats.occupied_buffers);
    println!("  Free codeblocks: {}", stats.free_codeblocks);
    println!("  {}", stats.summary());

    controller.stop();
    println!("\nPool stopped: {}", pool.is_stopped());

    Ok(())
}
