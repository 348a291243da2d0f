mod scenario;
mod stage;

use std::time::Instant;

use anyhow::{Result, bail};
use argh::FromArgs;

use self::scenario::{Backend, Config, Mode};

#[derive(Debug, FromArgs)]
/// Producer/consumer pipeline over lock-based and lock-free queues
#[argh(help_triggers("--help"))]
struct Args {
    /// number of items to load
    #[argh(option, default = "1_000_000")]
    items: u64,
    /// shape of the pipeline, may be "two-stage", "multi-stage" or "fan-in"
    #[argh(option, default = "Mode::TwoStage")]
    mode: Mode,
    /// queue between stages, may be "blocking" or "spsc"
    #[argh(option, long = "queue", default = "Backend::Blocking")]
    backend: Backend,
    /// number of loaders in fan-in mode
    #[argh(option, default = "4")]
    producers: usize,
    /// ring size of the spsc queue, must be a power of two
    #[argh(option, default = "conveyor::spsc::DEFAULT_CAPACITY")]
    capacity: usize,
    /// id of an item to report at the output
    #[argh(option)]
    sample: Option<u64>,
}

/// Logs the time elapsed between its creation and drop.
struct ScopedTimer {
    name: &'static str,
    start: Instant,
}

impl ScopedTimer {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_millis();
        tracing::info!("finished {}, elapsed={elapsed}ms", self.name);
    }
}

pub fn main() -> Result<()> {
    let args = argh::from_env::<Args>();
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config {
        mode: args.mode,
        backend: args.backend,
        items: args.items,
        producers: args.producers,
        capacity: args.capacity,
        sample: args.sample,
    };
    tracing::info!("started pipeline, config={config:?}");

    let report = {
        let _timer = ScopedTimer::new("pipeline");
        scenario::run(&config)?
    };

    let processed = report.summary.processed;
    if processed != report.loaded {
        bail!("lost items, loaded={} processed={processed}", report.loaded);
    }
    if let Some(item) = report.summary.sample {
        tracing::info!("sampled item, id={} result={}", item.id, item.result);
    } else if let Some(id) = config.sample {
        tracing::warn!("sampled id {id} never reached the output");
    }
    tracing::info!("finished pipeline, processed={processed}");

    Ok(())
}
