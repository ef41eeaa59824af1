//! msgring-sim: run the message ring core against the software fabric
//!
//! Boots the subsystem with the hosted scheduler, registers counting
//! handlers, injects device traffic and cpu-to-cpu sends, then plays the
//! interrupt controller until every core is idle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};

use msgring::drivers::{MessageRing, SoftFabric, SoftRing};
use msgring::fmn::{BoardInfo, IthreadState, Msgring, MsgringConfig};
use msgring::kern::HostScheduler;
use msgring::message::Envelope;
use msgring::types::{CoreId, StationId, TxStation, THREADS_PER_CORE};

/// Device stations traffic is injected from; 113 is unmapped on both boards
const SOURCES: [u8; 4] = [120, 104, 116, 113];

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Board {
    Xlr,
    Xls,
}

#[derive(Parser)]
#[command(name = "msgring-sim")]
#[command(about = "Message ring dispatch on a simulated fabric", long_about = None)]
struct Cli {
    /// Board description to load
    #[arg(short, long, value_enum, default_value_t = Board::Xlr)]
    board: Board,

    /// Cores running an interrupt thread
    #[arg(short, long, default_value_t = 4)]
    cores: usize,

    /// Device messages injected per core
    #[arg(short, long, default_value_t = 16)]
    messages: usize,

    /// Buckets popped by the dispatch loop
    #[arg(long, default_value_t = 8)]
    buckets: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

type SimRing = Msgring<SoftRing, HostScheduler>;

fn counting_handler(hits: Arc<AtomicU64>) -> Arc<dyn msgring::MessageHandler> {
    Arc::new(move |env: &Envelope| {
        hits.fetch_add(1, Ordering::Relaxed);
        debug!(
            "{} from {}: code={} payload={:x?}",
            env.bucket,
            env.source,
            env.code,
            env.payload()
        );
    })
}

fn wait_for<F: Fn() -> bool>(what: &str, cond: F) -> Result<()> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while !cond() {
        if Instant::now() > deadline {
            bail!("timed out waiting for {}", what);
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

fn quiescent(ms: &SimRing, cores: usize, buckets: usize) -> bool {
    (0..cores).all(|c| {
        let core = CoreId(c);
        ms.ring(core)
            .is_some_and(|r| r.read_status().all_empty(buckets))
            && ms.thread_state(core) == Some(IthreadState::Idle)
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let (board, board_cores) = match cli.board {
        Board::Xlr => (BoardInfo::xlr(), 8),
        Board::Xls => (BoardInfo::xls(), 4),
    };
    if cli.cores == 0 || cli.cores > board_cores {
        bail!("{} board has 1..={} cores", board.name, board_cores);
    }
    let cores = cli.cores;
    let config = MsgringConfig::default().with_pop_buckets(cli.buckets);
    let buckets = config.pop_num_buckets;

    let fabric = SoftFabric::new();
    let sched = Arc::new(HostScheduler::new());
    let ms = Msgring::new(board, config, sched.clone(), fabric.rings(board_cores))
        .context("creating message ring")?;

    ms.init(CoreId(0)).context("boot core init")?;
    for c in 1..cores {
        ms.cpu_init(CoreId(c))
            .with_context(|| format!("core{} init", c))?;
    }

    // Handlers for the device slots and every participating core
    let hits = Arc::new(AtomicU64::new(0));
    let mut slots = vec![TxStation::SAE, TxStation::DMA, TxStation::PCIE];
    slots.extend((0..cores).map(|c| TxStation::cpu(CoreId(c))));
    for slot in slots {
        ms.register_handler(slot, counting_handler(hits.clone()))
            .with_context(|| format!("registering {}", slot))?;
    }

    let hw_thread_mask = (0..cores).fold(0u32, |m, c| m | (0xf << (c * THREADS_PER_CORE)));
    let started = ms.start_threads(hw_thread_mask)?;
    info!("started {} secondary interrupt threads", started);
    wait_for("interrupt threads", || {
        (0..cores).all(|c| ms.worker(CoreId(c)).is_some())
    })?;

    // Device traffic into the popped buckets of every core
    let mut injected = 0u64;
    for c in 0..cores {
        let base = CoreId(c).station_base().index();
        for i in 0..cli.messages {
            let dest = StationId((base + i % buckets) as u8);
            let source = StationId(SOURCES[i % SOURCES.len()]);
            fabric
                .inject(dest, source, (i % 256) as u8, &[i as u64, c as u64])
                .with_context(|| format!("injecting into {}", dest))?;
            injected += 1;
        }
    }

    // Every core sends one message to bucket 0 of its neighbour
    for c in 0..cores {
        let dest = CoreId((c + 1) % cores).station_base();
        ms.send(CoreId(c), dest, 0x7f, &[0xc0de_0000 | c as u64])
            .with_context(|| format!("core{} send to {}", c, dest))?;
        injected += 1;
    }

    // Interrupt controller: deliver the level-triggered ring interrupt
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        for c in 0..cores {
            if fabric.irq_asserted(CoreId(c)) {
                ms.fast_intr(CoreId(c));
            }
        }
        if quiescent(&ms, cores, buckets) {
            break;
        }
        if Instant::now() > deadline {
            bail!("fabric did not drain");
        }
        thread::sleep(Duration::from_millis(1));
    }

    sched.shutdown();

    let mut delivered = 0;
    let mut dropped = 0;
    for c in 0..cores {
        let core = CoreId(c);
        let Some(counters) = ms.counters(core) else {
            continue;
        };
        let snap = counters.snapshot();
        println!(
            "{}: intr={} wakeups={} passes={} delivered={} dropped={} rx_errors={} exit={:#010x}",
            core,
            snap.intr,
            snap.wakeups,
            snap.passes,
            snap.delivered,
            snap.dropped,
            snap.rx_errors,
            fabric.exit_status(core).0
        );
        delivered += snap.delivered;
        dropped += snap.dropped;
    }
    println!(
        "sent={} delivered={} dropped={} handler_calls={}",
        injected,
        delivered,
        dropped,
        hits.load(Ordering::Relaxed)
    );
    if delivered + dropped != injected {
        bail!(
            "{} messages unaccounted for",
            injected.abs_diff(delivered + dropped)
        );
    }
    Ok(())
}
