//! Line-throughput accounting for the reader benchmarks.
//!
//! Criterion's `iter_custom` hands each sample's iteration count and elapsed
//! time to [`LineStats::record`]; [`LineStats::summary`] turns the samples
//! into per-line latency quantiles and a byte rate.

use std::fmt;
use std::time::Duration;

/// Samples collected for one benchmark id.
#[derive(Debug, Default)]
pub struct LineStats {
    ns_per_line: Vec<f64>,
    lines: u64,
    bytes: u64,
    elapsed: Duration,
}

impl LineStats {
    /// Records one sample of `lines` reads that moved `bytes_per_line` each.
    pub fn record(&mut self, lines: u64, bytes_per_line: u64, elapsed: Duration) {
        if lines == 0 {
            return;
        }
        self.lines = self.lines.saturating_add(lines);
        self.bytes = self.bytes.saturating_add(lines.saturating_mul(bytes_per_line));
        self.elapsed = self.elapsed.saturating_add(elapsed);
        self.ns_per_line.push(elapsed.as_nanos() as f64 / lines as f64);
    }

    /// Quantiles and throughput, or `None` before the first sample.
    pub fn summary(&self) -> Option<LineSummary> {
        let mut sorted = self.ns_per_line.clone();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let secs = self.elapsed.as_secs_f64();
        let mib_per_s = if secs > 0.0 {
            self.bytes as f64 / secs / (1024.0 * 1024.0)
        } else {
            0.0
        };
        Some(LineSummary {
            samples: sorted.len(),
            median_ns: nearest_rank(&sorted, 50),
            p95_ns: nearest_rank(&sorted, 95),
            worst_ns: sorted[sorted.len() - 1],
            mib_per_s,
        })
    }
}

/// Condensed view of a [`LineStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSummary {
    pub samples: usize,
    pub median_ns: f64,
    pub p95_ns: f64,
    pub worst_ns: f64,
    pub mib_per_s: f64,
}

impl fmt::Display for LineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples={} median_ns_line={:.1} p95_ns_line={:.1} worst_ns_line={:.1} mib_s={:.2}",
            self.samples, self.median_ns, self.p95_ns, self.worst_ns, self.mib_per_s
        )
    }
}

/// Nearest-rank percentile (`pct` in 1..=100) of an ascending slice.
pub fn nearest_rank(sorted: &[f64], pct: u32) -> f64 {
    debug_assert!((1..=100).contains(&pct));
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() * pct as usize).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}
