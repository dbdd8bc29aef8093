use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::endpoint::{RawEndpoint, Target};
use crate::error::Error;
use crate::exchange::Transport;
use crate::sampler::{self, SampleParams, SampleSet};
use crate::stats::Statistics;
use crate::Config;

/// A thread-safe boolean representing the receipt of an signal interrupt
pub type InterruptSignal = Arc<AtomicBool>;

/// Register a Ctrl + C handler that raises the returned signal
///
/// # Errors
///
/// Fails if a handler has already been registered for this process.
pub fn interrupt_on_ctrlc() -> Result<InterruptSignal, ctrlc::Error> {
    let signal = InterruptSignal::new(AtomicBool::new(false));
    let set_signal = signal.clone();
    ctrlc::set_handler(move || {
        set_signal.store(true, Ordering::SeqCst);

        trace!("Registered signal interrupt -- stopping after the current payload size")
    })?;
    Ok(signal)
}

/// Opens a fresh endpoint for every payload size
pub trait Connector {
    type Endpoint: Transport;

    fn connect(&mut self, target: &Target, timeout: Duration) -> Result<Self::Endpoint, Error>;
}

/// Connector handing out raw ICMP sockets
#[derive(Debug, Default)]
pub struct RawConnector;

impl Connector for RawConnector {
    type Endpoint = RawEndpoint;

    fn connect(&mut self, target: &Target, timeout: Duration) -> Result<RawEndpoint, Error> {
        RawEndpoint::open(target.addr(), timeout)
    }
}

/// Result for one payload size
#[derive(Debug)]
pub enum SweepEntry {
    /// The sampling run completed; `stats` is `None` if nothing came back
    Measured {
        samples: SampleSet,
        stats: Option<Statistics>,
    },
    /// The transport broke down while sampling this size
    Failed { size: usize, error: Error },
}

impl SweepEntry {
    fn measured(samples: SampleSet) -> Self {
        let stats = samples.statistics();
        Self::Measured { samples, stats }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Measured { samples, .. } => samples.size(),
            Self::Failed { size, .. } => *size,
        }
    }

    pub fn samples(&self) -> Option<&SampleSet> {
        match self {
            Self::Measured { samples, .. } => Some(samples),
            Self::Failed { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<&Statistics> {
        match self {
            Self::Measured { stats, .. } => stats.as_ref(),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything gathered during one sweep, in the configured size order
#[derive(Debug)]
pub struct SweepResult {
    target: Target,
    entries: Vec<SweepEntry>,
    interrupted: bool,
}

impl SweepResult {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn entries(&self) -> &[SweepEntry] {
        &self.entries
    }

    /// Return `true` if the sweep was stopped before its last payload size
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Sweep context
///
/// Holds the resolved destination and the sweep parameters. A sweep runs the sampler once per
/// configured payload size, strictly one after the other.
#[derive(Debug)]
pub struct Sweep {
    target: Target,
    sizes: Vec<usize>,
    count: usize,
    pause: Duration,
    timeout: Duration,
    identifier: u16,
}

impl Sweep {
    /// Create new sweep context from provided configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for inconsistent options and `UnresolvableHost` if the destination
    /// cannot be resolved. Both happen before any packet is sent.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let target = Target::resolve(&config.dest)?;
        Ok(Self::with_target(target, config))
    }

    /// Create new sweep context for an already resolved destination
    pub fn with_target(target: Target, config: Config) -> Self {
        Self {
            target,
            sizes: config.sizes,
            count: config.count,
            pause: config.pause,
            timeout: config.timeout,
            identifier: config.identifier,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the sampler across all payload sizes
    ///
    /// Every finished size is handed to `report` right away and then stored in the result. The
    /// endpoint for a size is closed as soon as that size is done. The interrupt signal is checked
    /// between sizes; once it is raised, the sizes gathered so far are returned.
    ///
    /// A transport failure only ends the size it happened in and is recorded as
    /// [`SweepEntry::Failed`].
    ///
    /// # Errors
    ///
    /// Fails if an endpoint cannot be opened, since no later size could succeed either, or if
    /// sampling reports an error that is not tied to a single size.
    pub fn run<C, F>(
        &self,
        connector: &mut C,
        interrupt: &AtomicBool,
        mut report: F,
    ) -> Result<SweepResult, Error>
    where
        C: Connector,
        F: FnMut(&SweepEntry),
    {
        let mut result = SweepResult {
            target: self.target.clone(),
            entries: Vec::with_capacity(self.sizes.len()),
            interrupted: false,
        };

        for &size in &self.sizes {
            if interrupt.load(Ordering::SeqCst) {
                info!("Sweep interrupted before {} byte payloads", size);
                result.interrupted = true;
                break;
            }

            let params = SampleParams {
                size,
                pause: self.pause,
                count: self.count,
                identifier: self.identifier,
            };

            let entry = {
                let mut endpoint = connector.connect(&self.target, self.timeout)?;
                match sampler::sample(&mut endpoint, &params) {
                    Ok(samples) => SweepEntry::measured(samples),
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => {
                        warn!("Sampling {} byte payloads failed: {}", size, error);
                        SweepEntry::Failed { size, error }
                    }
                }
            };

            report(&entry);
            result.entries.push(entry);
        }

        Ok(result)
    }
}
