use clap::{App, Arg, ArgMatches, SubCommand};
use log::info;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    str::FromStr,
    sync::{mpsc, Arc, Barrier},
    thread::{self, JoinHandle},
    time::Instant,
};
use txbuf::{
    create_tx_buffer_pool, error::TxBufError, Result, TrxBufferIdentifier, TxBufferPool,
    TxBufferPoolConfig, UniqueTxBuffer,
};

fn main() -> Result<()> {
    env_logger::init();

    let defaults = TxBufferPoolConfig::default();
    let max_codeblock_size = defaults.max_codeblock_size.to_string();
    let nof_buffers = defaults.nof_buffers.to_string();
    let nof_codeblocks = defaults.nof_codeblocks.to_string();
    let expire_timeout = defaults.expire_timeout_slots.to_string();

    let config_args = [
        Arg::with_name("max_codeblock_size")
            .long("max-codeblock-size")
            .value_name("BITS")
            .help("Maximum codeblock size in bits")
            .default_value(&max_codeblock_size)
            .takes_value(true),
        Arg::with_name("nof_buffers")
            .short("b")
            .long("nof-buffers")
            .value_name("COUNT")
            .help("Number of reservation slots")
            .default_value(&nof_buffers)
            .takes_value(true),
        Arg::with_name("nof_codeblocks")
            .short("c")
            .long("nof-codeblocks")
            .value_name("COUNT")
            .help("Total codeblock budget")
            .default_value(&nof_codeblocks)
            .takes_value(true),
        Arg::with_name("expire_timeout")
            .short("e")
            .long("expire-timeout")
            .value_name("SLOTS")
            .help("Idle slots before an unlocked buffer is evicted")
            .default_value(&expire_timeout)
            .takes_value(true),
        Arg::with_name("external_soft_bits")
            .long("external-soft-bits")
            .help("Keep codeblock storage outside the pool"),
    ];

    let matches = App::new("txbuf-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transmission buffer pool tool")
        .subcommand(
            SubCommand::with_name("simulate")
                .about("Drive a pool with pipeline threads and a release worker")
                .args(&config_args)
                .arg(
                    Arg::with_name("ticks")
                        .short("t")
                        .long("ticks")
                        .value_name("TICKS")
                        .help("Number of slots to simulate")
                        .default_value("1000")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("threads")
                        .short("p")
                        .long("threads")
                        .value_name("THREADS")
                        .help("Number of pipeline threads")
                        .default_value("4")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("users")
                        .short("u")
                        .long("users")
                        .value_name("USERS")
                        .help("Users scheduled per pipeline thread and slot")
                        .default_value("4")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("codeblocks_per_buffer")
                        .short("n")
                        .long("codeblocks-per-buffer")
                        .value_name("COUNT")
                        .help("Codeblocks requested per reservation")
                        .default_value("8")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("config")
                .about("Validate and print a pool configuration")
                .args(&config_args),
        )
        .get_matches();

    match matches.subcommand() {
        ("simulate", Some(sim_matches)) => simulate(sim_matches),
        ("config", Some(config_matches)) => show_config(config_matches),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .ok_or_else(|| TxBufError::invalid_parameter(name, "Missing value"))?
        .parse()
        .map_err(|_| TxBufError::invalid_parameter(name, "Invalid number format"))
}

fn config_from_args(matches: &ArgMatches) -> Result<TxBufferPoolConfig> {
    let config = TxBufferPoolConfig {
        max_codeblock_size: parse_arg(matches, "max_codeblock_size")?,
        nof_buffers: parse_arg(matches, "nof_buffers")?,
        nof_codeblocks: parse_arg(matches, "nof_codeblocks")?,
        expire_timeout_slots: parse_arg(matches, "expire_timeout")?,
        external_soft_bits: matches.is_present("external_soft_bits"),
    };
    config.validate()?;
    Ok(config)
}

fn show_config(matches: &ArgMatches) -> Result<()> {
    let config = config_from_args(matches)?;

    println!("Transmission buffer pool configuration:");
    println!("  Max codeblock size: {} bits", config.max_codeblock_size);
    println!("  Buffers: {}", config.nof_buffers);
    println!("  Codeblocks: {}", config.nof_codeblocks);
    println!("  Expire timeout: {} slots", config.expire_timeout_slots);
    println!("  External soft bits: {}", config.external_soft_bits);
    println!("  Bytes per codeblock: {}", config.codeblock_bytes());
    println!("  Arena size: {} bytes", config.total_memory_required());

    Ok(())
}

fn simulate(matches: &ArgMatches) -> Result<()> {
    let config = config_from_args(matches)?;
    let ticks: u64 = parse_arg(matches, "ticks")?;
    let threads: usize = parse_arg(matches, "threads")?;
    let users: usize = parse_arg(matches, "users")?;
    let nof_cb: usize = parse_arg(matches, "codeblocks_per_buffer")?;

    if threads == 0 {
        return Err(TxBufError::invalid_parameter("threads", "At least one pipeline thread is required"));
    }
    if threads * users > u16::MAX as usize {
        return Err(TxBufError::invalid_parameter("users", "Too many users for the RNTI space"));
    }

    println!("Simulating {} slots with {} pipeline threads, {} users each", ticks, threads, users);

    let controller = create_tx_buffer_pool(config)?;
    let pool = controller.get_pool().clone();
    let write_bits = if pool.config().external_soft_bits {
        0
    } else {
        pool.config().max_codeblock_size.min(64)
    };

    let (sender, receiver) = mpsc::channel::<UniqueTxBuffer>();
    let release_worker = thread::spawn(move || {
        let mut released = 0u64;
        for buffer in receiver {
            drop(buffer);
            released += 1;
        }
        released
    });

    // Pipelines and the slot driver meet twice per slot: once to start
    // reserving, once after every pipeline is done.
    let barrier = Arc::new(Barrier::new(threads + 1));
    let mut pipelines = Vec::new();
    for pipeline_id in 0..threads {
        let pool = pool.clone();
        let sender = sender.clone();
        let barrier = barrier.clone();

        pipelines.push(thread::spawn(move || -> Result<()> {
            let mut failure = None;
            for tick in 0..ticks {
                barrier.wait();
                // A failed pipeline keeps meeting the barrier so the driver never stalls.
                if failure.is_none() {
                    let scheduled = panic::catch_unwind(AssertUnwindSafe(|| {
                        schedule_slot(&pool, &sender, pipeline_id, users, tick, nof_cb, write_bits)
                    }));
                    if let Err(payload) = scheduled {
                        failure = Some(panic_message(payload.as_ref()));
                    }
                }
                barrier.wait();
            }

            match failure {
                Some(message) => Err(TxBufError::concurrency(format!(
                    "pipeline {} panicked: {}",
                    pipeline_id, message
                ))),
                None => Ok(()),
            }
        }));
    }
    drop(sender);

    let start = Instant::now();
    for tick in 0..ticks {
        barrier.wait();
        barrier.wait();
        pool.run_slot(tick);
    }
    let elapsed = start.elapsed();

    for (pipeline_id, pipeline) in pipelines.into_iter().enumerate() {
        join_thread(pipeline, &format!("pipeline {}", pipeline_id))??;
    }
    let released = join_thread(release_worker, "release worker")?;

    info!("simulation finished, stopping pool");
    controller.stop();

    let stats = pool.stats();
    println!("\nResults:");
    println!("  Elapsed: {:?}", elapsed);
    println!("  Handles released by worker: {}", released);
    println!("  Reservation rate: {:.0} ops/sec", stats.reservations as f64 / elapsed.as_secs_f64());
    println!("  {}", stats.summary());

    Ok(())
}

/// Reserve one buffer per user for `tick` and hand each to the release worker
fn schedule_slot(
    pool: &TxBufferPool,
    sender: &mpsc::Sender<UniqueTxBuffer>,
    pipeline_id: usize,
    users: usize,
    tick: u64,
    nof_cb: usize,
    write_bits: usize,
) {
    for user in 0..users {
        let rnti = (pipeline_id * users + user) as u16;
        let id = TrxBufferIdentifier::new(rnti, (tick % 16) as u8);
        let mut buffer = pool.reserve(tick, id, nof_cb);
        if !buffer.is_valid() {
            continue;
        }

        if write_bits > 0 {
            let buf = buffer.get_mut();
            for cb in 0..buf.nof_codeblocks() {
                buf.codeblock_mut(cb, write_bits).insert(tick, 0, write_bits);
            }
        }

        // The receiver outlives every sender.
        let _ = sender.send(buffer);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Join `handle`, turning a panic into a concurrency error
fn join_thread<T>(handle: JoinHandle<T>, name: &str) -> Result<T> {
    handle.join().map_err(|payload| {
        TxBufError::concurrency(format!("{} panicked: {}", name, panic_message(payload.as_ref())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_thread_reports_panic() {
        let handle = thread::spawn(|| -> u64 { panic!("release failed") });
        let err = join_thread(handle, "release worker").unwrap_err();
        assert!(matches!(err, TxBufError::Concurrency { .. }));
        assert!(err.to_string().contains("release worker panicked: release failed"));
    }

    #[test]
    fn test_join_thread_returns_value() {
        let handle = thread::spawn(|| 7u64);
        assert_eq!(join_thread(handle, "worker").unwrap(), 7);
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
