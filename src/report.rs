//! Results table
//!
//! Renders sweep entries as fixed-width text, one line per payload size, so results can be shown
//! while the sweep is still running.

use std::io::{self, Write};

use crate::stats::{as_millis_f64, Statistics};
use crate::sweep::{Sweep, SweepEntry};

const SPREAD_WIDTH: usize = 32;
const PERCENTILE_WIDTH: usize = 41;

/// Which latency columns the table shows
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Layout {
    /// min, avg, [std], max
    Spread,
    /// 0th, 25th, 50th, 75th and 100th percentile
    Percentiles,
}

impl Default for Layout {
    fn default() -> Self {
        Self::Spread
    }
}

/// Fixed-width writer for sweep results
#[derive(Debug, Copy, Clone, Default)]
pub struct Table {
    layout: Layout,
}

impl Table {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Describe the sweep about to run
    pub fn write_banner<W: Write>(&self, w: &mut W, sweep: &Sweep) -> io::Result<()> {
        writeln!(w)?;
        writeln!(w, " Ping Sweep")?;
        writeln!(w, " ==========")?;
        writeln!(
            w,
            " target name: {} ({})",
            sweep.target().host(),
            sweep.target().addr()
        )?;
        writeln!(w, " ping count:  {}", sweep.count())?;
        writeln!(w, " timeout:     {} ms", sweep.timeout().as_millis())?;
        writeln!(w, " pause time:  {} ms", sweep.pause().as_millis())?;
        writeln!(w)
    }

    /// Column titles and divider
    pub fn write_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let (times_a, times_b) = match self.layout {
            Layout::Spread => (
                format!("{:^width$}", "Ping Times (ms)", width = SPREAD_WIDTH),
                format!(" {:>6} {:>6} [{:>6}] {:>7} ", "min", "avg", "std", "max"),
            ),
            Layout::Percentiles => (
                format!("{:^width$}", "Ping Time Percentiles (ms)", width = PERCENTILE_WIDTH),
                format!(
                    " {:>7} {:>7} {:>7} {:>7} {:>7} ",
                    "0%", "25%", "50%", "75%", "100%"
                ),
            ),
        };

        let head_a = format!(
            " {:<14} |{}|{:^13}| {:>7}",
            "Size (bytes)", times_a, "Lost Packets", "Rate"
        );
        let head_b = format!(
            " {:>7} {:>6} |{}| {:>3} {:>3} {:>3} | {:>7}",
            "Payload", "Packet", times_b, "All", "T", "C", "KiB/s"
        );

        writeln!(w, "{}", head_a)?;
        writeln!(w, "{}", head_b)?;
        writeln!(w, " {}", "-".repeat(head_b.len() - 1))
    }

    /// One line for a finished payload size
    pub fn write_entry<W: Write>(&self, w: &mut W, entry: &SweepEntry) -> io::Result<()> {
        match entry {
            SweepEntry::Measured { samples, stats } => {
                let rate = samples
                    .rate()
                    .map(|rate| format!("{:7.1}", rate))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    w,
                    " {:>7} {:>6} |{}| {:>3} {:>3} {:>3} | {:>7}",
                    samples.size(),
                    samples.packet_size(),
                    self.times(stats.as_ref()),
                    samples.lost(),
                    samples.timeouts(),
                    samples.corruptions(),
                    rate
                )
            }
            SweepEntry::Failed { size, error } => writeln!(
                w,
                " {:>7} {:>6} | {}",
                size,
                size + crate::packet::ICMP_HEADER_LEN,
                error
            ),
        }
    }

    /// Write a finished size as it comes in and push it out
    ///
    /// The banner and header go out in front of the first entry, so a sweep that fails to start
    /// prints no table at all.
    pub fn stream_entry<W: Write>(
        &self,
        w: &mut W,
        sweep: &Sweep,
        entry: &SweepEntry,
        first: bool,
    ) -> io::Result<()> {
        if first {
            self.write_banner(w, sweep)?;
            self.write_header(w)?;
        }
        self.write_entry(w, entry)?;
        w.flush()
    }

    /// Closing line, telling whether the sweep ran to completion
    pub fn write_footer<W: Write>(&self, w: &mut W, interrupted: bool) -> io::Result<()> {
        if interrupted {
            writeln!(w, "\nUser stop!")
        } else {
            writeln!(w, "\nDone.")
        }
    }

    fn times(&self, stats: Option<&Statistics>) -> String {
        match (self.layout, stats) {
            (Layout::Spread, Some(s)) => format!(
                " {:6.2} {:6.2} [{:6.2}] {:7.2} ",
                as_millis_f64(s.min),
                as_millis_f64(s.mean),
                as_millis_f64(s.std),
                as_millis_f64(s.max)
            ),
            (Layout::Percentiles, Some(s)) => format!(
                " {:7.2} {:7.2} {:7.2} {:7.2} {:7.2} ",
                as_millis_f64(s.min),
                as_millis_f64(s.quartiles[0]),
                as_millis_f64(s.quartiles[1]),
                as_millis_f64(s.quartiles[2]),
                as_millis_f64(s.max)
            ),
            // Nothing came back
            (Layout::Spread, None) => format!("{:^width$}", "-", width = SPREAD_WIDTH),
            (Layout::Percentiles, None) => format!("{:^width$}", "-", width = PERCENTILE_WIDTH),
        }
    }
}
