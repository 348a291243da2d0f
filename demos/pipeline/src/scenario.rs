use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};

use anyhow::{Result, anyhow, bail};
use conveyor::{BlockingQueue, Dequeue, Enqueue, Message, StreamEnd, spsc};

use crate::stage::{self, DataItem, Summary};

type Tx = Box<dyn Enqueue<Item = Message<DataItem>> + Send>;
type Rx = Box<dyn Dequeue<Item = Message<DataItem>> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// loader -> output
    TwoStage,
    /// loader -> parser -> transformer -> output
    MultiStage,
    /// several loaders -> output
    FanIn,
}

impl FromStr for Mode {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-stage" => Ok(Mode::TwoStage),
            "multi-stage" => Ok(Mode::MultiStage),
            "fan-in" => Ok(Mode::FanIn),
            _ => Err("invalid pipeline mode"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Blocking,
    Spsc,
}

impl FromStr for Backend {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocking" => Ok(Backend::Blocking),
            "spsc" => Ok(Backend::Spsc),
            _ => Err("invalid queue type"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub mode: Mode,
    pub backend: Backend,
    pub items: u64,
    pub producers: usize,
    pub capacity: usize,
    pub sample: Option<u64>,
}

#[derive(Clone, Copy, Debug)]
pub struct Report {
    pub loaded: u64,
    pub summary: Summary,
}

pub fn run(config: &Config) -> Result<Report> {
    let summary = match config.mode {
        Mode::TwoStage => two_stage(config)?,
        Mode::MultiStage => multi_stage(config)?,
        Mode::FanIn => fan_in(config)?,
    };
    Ok(Report {
        loaded: config.items,
        summary,
    })
}

fn link(config: &Config) -> Result<(Tx, Rx)> {
    match config.backend {
        Backend::Blocking => {
            let q = Arc::new(BlockingQueue::<Message<DataItem>>::new());
            let tx: Tx = Box::new(q.clone());
            let rx: Rx = Box::new(q);
            Ok((tx, rx))
        },
        Backend::Spsc => {
            let (tx, rx) = spsc::try_channel::<Message<DataItem>>(config.capacity)?;
            let (tx, rx): (Tx, Rx) = (Box::new(tx), Box::new(rx));
            Ok((tx, rx))
        },
    }
}

fn spawn<'scope, T, F>(
    cx: &'scope Scope<'scope, '_>,
    name: &str,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>>
where
    T: 'scope + Send,
    F: 'scope + Send + FnOnce() -> T,
{
    thread::Builder::new()
        .name(name.to_owned())
        .spawn_scoped(cx, f)
        .map_err(|e| anyhow!("failed to spawn {name}: {e}"))
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("pipeline stage panicked"))
}

fn two_stage(config: &Config) -> Result<Summary> {
    let Config { items, sample, .. } = *config;
    let (tx, rx) = link(config)?;
    thread::scope(|cx| -> Result<Summary> {
        spawn(cx, "loader", move || stage::loader(tx, items))?;
        let output = spawn(cx, "output", move || stage::output(rx, sample))?;
        join(output)
    })
}

fn multi_stage(config: &Config) -> Result<Summary> {
    let Config { items, sample, .. } = *config;
    let (loaded_tx, loaded_rx) = link(config)?;
    let (parsed_tx, parsed_rx) = link(config)?;
    let (transformed_tx, transformed_rx) = link(config)?;
    // Upstream first, so a stage that fails to spawn leaves nothing waiting on
    // its output.
    thread::scope(|cx| -> Result<Summary> {
        spawn(cx, "loader", move || stage::loader(loaded_tx, items))?;
        spawn(cx, "parser", move || stage::relay("parser", loaded_rx, parsed_tx, stage::parse))?;
        spawn(cx, "transformer", move || {
            stage::relay("transformer", parsed_rx, transformed_tx, stage::transform)
        })?;
        let output = spawn(cx, "output", move || stage::output(transformed_rx, sample))?;
        join(output)
    })
}

fn fan_in(config: &Config) -> Result<Summary> {
    let Config {
        backend,
        items,
        producers,
        sample,
        ..
    } = *config;
    if backend != Backend::Blocking {
        bail!("fan-in needs a multi-producer queue, use the blocking queue");
    }
    if producers == 0 {
        bail!("fan-in needs at least one producer");
    }

    let q = Arc::new(BlockingQueue::new());
    let end = StreamEnd::new(producers);
    let chunk = items.div_ceil(producers as u64);
    thread::scope(|cx| -> Result<Summary> {
        for p in 0..producers as u64 {
            let ids = (p * chunk).min(items)..((p + 1) * chunk).min(items);
            let (q, end) = (q.clone(), &end);
            spawn(cx, &format!("loader-{p}"), move || stage::fan_in_loader(q, ids, end))?;
        }
        let output = spawn(cx, "output", move || stage::output(q, sample))?;
        join(output)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: Mode, backend: Backend) -> Config {
        Config {
            mode,
            backend,
            items: 100_000,
            producers: 4,
            capacity: 64,
            sample: None,
        }
    }

    #[test]
    fn two_stage_counts_every_item() {
        for backend in [Backend::Blocking, Backend::Spsc] {
            let report = run(&config(Mode::TwoStage, backend)).unwrap();
            assert_eq!(report.summary.processed, report.loaded);
            assert_eq!(report.summary.sample, None);
        }
    }

    #[test]
    fn multi_stage_sample() {
        for backend in [Backend::Blocking, Backend::Spsc] {
            let id = fastrand::u64(0..100_000);
            let report = run(&Config {
                sample: Some(id),
                ..config(Mode::MultiStage, backend)
            })
            .unwrap();
            assert_eq!(report.summary.processed, report.loaded);
            let sample = report.summary.sample.unwrap();
            assert_eq!(sample.id, id);
            assert_eq!(sample.result, (id.isqrt() * 7) as f64);
        }
    }

    #[test]
    fn fan_in_single_end_marker() {
        for producers in [1, 3, 4, 7] {
            let report = run(&Config {
                producers,
                sample: Some(99_999),
                ..config(Mode::FanIn, Backend::Blocking)
            })
            .unwrap();
            assert_eq!(report.summary.processed, report.loaded);
            assert_eq!(report.summary.sample.map(|d| d.id), Some(99_999));
        }
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(run(&config(Mode::FanIn, Backend::Spsc)).is_err());
        assert!(
            run(&Config {
                producers: 0,
                ..config(Mode::FanIn, Backend::Blocking)
            })
            .is_err()
        );
        let err = run(&Config {
            capacity: 100,
            ..config(Mode::TwoStage, Backend::Spsc)
        })
        .unwrap_err();
        assert!(err.to_string().contains("power of two"));
    }

    #[test]
    fn parses_flags() {
        assert_eq!("multi-stage".parse::<Mode>(), Ok(Mode::MultiStage));
        assert_eq!("spsc".parse::<Backend>(), Ok(Backend::Spsc));
        assert!("three-stage".parse::<Mode>().is_err());
    }
}
