//! Repeated exchanges at a single payload size

use std::thread;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::exchange::{self, Corruption, EchoOutcome, Transport};
use crate::packet::ICMP_HEADER_LEN;
use crate::stats::Statistics;

/// Parameters for one sampling run
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SampleParams {
    /// Payload bytes per request
    pub size: usize,
    /// Pause between consecutive requests
    pub pause: Duration,
    /// Number of requests to send
    pub count: usize,
    /// Identifier carried by every request
    pub identifier: u16,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            size: exchange::DEFAULT_PAYLOAD_SIZE,
            pause: Duration::from_millis(5),
            count: 25,
            identifier: exchange::DEFAULT_IDENTIFIER,
        }
    }
}

/// Outcomes collected for one payload size
///
/// Outcomes are kept in send order. Losses are split into timeouts, where no reply arrived, and
/// corruptions, where a reply arrived that did not match the request.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    size: usize,
    pause: Duration,
    timeout: Duration,
    requested: usize,
    outcomes: Vec<EchoOutcome>,
    active: Duration,
}

impl SampleSet {
    /// Create an empty sample set
    pub fn new(size: usize, pause: Duration, timeout: Duration, requested: usize) -> Self {
        Self {
            size,
            pause,
            timeout,
            requested,
            outcomes: Vec::with_capacity(requested),
            active: Duration::from_secs(0),
        }
    }

    /// Append the outcome of one exchange
    pub fn push(&mut self, outcome: EchoOutcome) {
        self.outcomes.push(outcome);
    }

    /// Record the time spent exchanging packets, excluding pauses
    pub fn set_active(&mut self, active: Duration) {
        self.active = active;
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the ICMP message on the wire
    pub fn packet_size(&self) -> usize {
        self.size + ICMP_HEADER_LEN
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of requests the run was asked to send
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn outcomes(&self) -> &[EchoOutcome] {
        &self.outcomes
    }

    /// Requests answered with a matching payload
    pub fn received(&self) -> usize {
        self.outcomes.iter().filter(|o| o.payload_matched()).count()
    }

    /// Requests that never got a reply
    pub fn timeouts(&self) -> usize {
        self.outcomes.iter().filter(|o| o.elapsed().is_none()).count()
    }

    /// Requests whose reply arrived but did not match
    pub fn corruptions(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.elapsed().is_some() && !o.payload_matched())
            .count()
    }

    /// Corruptions of one particular kind
    pub fn corruptions_by(&self, cause: Corruption) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.corruption() == Some(cause))
            .count()
    }

    /// Total loss: timeouts plus corruptions
    pub fn lost(&self) -> usize {
        self.timeouts() + self.corruptions()
    }

    /// Round-trip times of the successful exchanges, in send order
    pub fn times(&self) -> Vec<Duration> {
        self.outcomes
            .iter()
            .filter(|o| o.payload_matched())
            .filter_map(EchoOutcome::elapsed)
            .collect()
    }

    /// Summary statistics, or `None` if nothing was received
    pub fn statistics(&self) -> Option<Statistics> {
        Statistics::from_samples(&self.times())
    }

    /// Payload throughput in KiB/s while exchanging packets
    ///
    /// Pauses between requests are not counted. Returns `None` if nothing was received.
    pub fn rate(&self) -> Option<f64> {
        let received = self.received();
        let active = self.active.as_secs_f64();
        if received == 0 || active <= 0f64 {
            return None;
        }
        Some((received * self.size) as f64 / active / 1024f64)
    }
}

/// Ping the transport's peer `params.count` times
///
/// Sends are strictly sequential. Every request except the first is preceded by a pause of
/// `params.pause`, to be a little nice to the network and the remote host.
///
/// # Errors
///
/// A transport failure aborts the remaining repeats and is returned as is. Timeouts and corrupted
/// replies are recorded in the sample set.
pub fn sample<T: Transport + ?Sized>(
    transport: &mut T,
    params: &SampleParams,
) -> Result<SampleSet, Error> {
    let mut samples = SampleSet::new(params.size, params.pause, transport.timeout(), params.count);

    let start = Instant::now();
    let mut sleeping = Duration::from_secs(0);
    for k in 0..params.count {
        if k > 0 && params.pause > Duration::from_secs(0) {
            let mark = Instant::now();
            thread::sleep(params.pause);
            sleeping += mark.elapsed();
        }

        let outcome = exchange::ping_once(transport, params.size, params.identifier)?;
        samples.push(outcome);
    }
    samples.set_active(start.elapsed().checked_sub(sleeping).unwrap_or_default());

    debug!(
        "{} bytes: {} sent, {} received, {} timed out, {} corrupt",
        params.size,
        samples.requested(),
        samples.received(),
        samples.timeouts(),
        samples.corruptions()
    );

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::testing::{Script, ScriptedTransport};

    const MS: Duration = Duration::from_millis(1);

    fn params(count: usize) -> SampleParams {
        SampleParams {
            size: 32,
            pause: Duration::from_secs(0),
            count,
            identifier: 1,
        }
    }

    #[test]
    fn mixed_outcomes_are_classified() {
        let mut transport = ScriptedTransport::new(vec![
            Script::Echo(10 * MS),
            Script::Silence,
            Script::Mangle(5 * MS),
        ]);
        let samples = sample(&mut transport, &params(3)).unwrap();

        assert_eq!(samples.requested(), 3);
        assert_eq!(samples.received(), 1);
        assert_eq!(samples.timeouts(), 1);
        assert_eq!(samples.corruptions(), 1);
        assert_eq!(samples.lost(), 2);

        let times = samples.times();
        assert_eq!(times.len(), 1);
        assert!(times[0] >= 10 * MS && times[0] < 500 * MS);
    }

    #[test]
    fn counts_always_add_up() {
        let mut transport = ScriptedTransport::new(vec![
            Script::Echo(MS),
            Script::Foreign(9, MS),
            Script::Garbage(MS),
            Script::Silence,
            Script::Echo(MS),
            Script::Mangle(MS),
        ]);
        let samples = sample(&mut transport, &params(6)).unwrap();

        assert_eq!(
            samples.received() + samples.timeouts() + samples.corruptions(),
            samples.requested()
        );
        assert_eq!(samples.received(), 2);
        assert_eq!(samples.corruptions_by(Corruption::ForeignIdentifier), 1);
        assert_eq!(samples.corruptions_by(Corruption::Malformed), 1);
        assert_eq!(samples.corruptions_by(Corruption::PayloadMismatch), 1);
    }

    #[test]
    fn silent_peer_times_out_every_run() {
        for _ in 0..2 {
            let mut transport = ScriptedTransport::new(vec![Script::Silence; 4]);
            let samples = sample(&mut transport, &params(4)).unwrap();

            assert_eq!(samples.received(), 0);
            assert_eq!(samples.timeouts(), 4);
            assert_eq!(samples.statistics(), None);
            assert_eq!(samples.rate(), None);
        }
    }

    #[test]
    fn pause_separates_requests() {
        let mut transport = ScriptedTransport::new(vec![Script::Echo(MS); 3]);
        let mut params = params(3);
        params.pause = 20 * MS;

        let start = Instant::now();
        let samples = sample(&mut transport, &params).unwrap();

        // Two pauses for three requests
        assert!(start.elapsed() >= 40 * MS);
        assert_eq!(samples.pause(), 20 * MS);
        assert_eq!(samples.received(), 3);
        assert!(samples.rate().is_some());
    }

    #[test]
    fn transport_failure_aborts_run() {
        let mut transport =
            ScriptedTransport::new(vec![Script::Echo(MS), Script::Broken, Script::Echo(MS)]);
        let err = sample(&mut transport, &params(3)).unwrap_err();

        assert!(matches!(err, Error::TransportFailure(_)));
        assert_eq!(transport.script.len(), 1);
    }

    #[test]
    fn default_params() {
        let params = SampleParams::default();
        assert_eq!(params.size, 64);
        assert_eq!(params.count, 25);
        assert_eq!(params.identifier, 1);

        let mut transport = ScriptedTransport::new(vec![Script::Echo(MS); 25]);
        let quick = SampleParams {
            pause: Duration::from_secs(0),
            ..params
        };
        let samples = sample(&mut transport, &quick).unwrap();
        assert_eq!(samples.received(), 25);
        assert_eq!(samples.packet_size(), 72);
    }

    #[test]
    fn sample_set_metadata() {
        let mut transport = ScriptedTransport::new(vec![Script::Echo(MS)]);
        transport.timeout = 250 * MS;
        let samples = sample(&mut transport, &params(1)).unwrap();

        assert_eq!(samples.size(), 32);
        assert_eq!(samples.packet_size(), 40);
        assert_eq!(samples.timeout(), 250 * MS);
        assert_eq!(samples.outcomes().len(), 1);
    }
}
