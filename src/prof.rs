//! Stopwatch with a latency histogram.
//!
//! ```ignore
//! let mut prof = Prof::new("insert: ");
//! prof.run();
//! for rule in rules {
//!     prof.begin();
//!     tree.insert(rule);
//!     prof.end();
//! }
//! println!("{}", prof.report());
//! ```
//!
//! Calls are bucketed at 100 ns up to 1 µs, 1 µs up to 10 µs, 10 µs up to
//! 100 µs and 100 µs up to 1 ms. Calls of 1 ms or more are only counted.

use std::fmt::{self, Write};
use std::time::{Duration, Instant};

const BUCKETS: usize = 37;

/// One decade of the histogram.
struct Decade {
    first: usize,
    end: usize,
    start: u64,
    step: u64,
    unit: &'static str,
    label: &'static str,
}

const DECADES: [Decade; 4] = [
    Decade {
        first: 0,
        end: 10,
        start: 0,
        step: 100,
        unit: "ns",
        label: "   0ns - 1000ns",
    },
    Decade {
        first: 10,
        end: 19,
        start: 1,
        step: 1,
        unit: "us",
        label: "   1us - 10us  ",
    },
    Decade {
        first: 19,
        end: 28,
        start: 10,
        step: 10,
        unit: "us",
        label: "  10us - 100us ",
    },
    Decade {
        first: 28,
        end: 37,
        start: 100,
        step: 100,
        unit: "us",
        label: " 100us - 1000us",
    },
];

/// Call-duration profiler.
#[derive(Debug, Clone)]
pub struct Prof {
    banner: String,
    running: bool,
    start: Option<Instant>,
    calls: u32,
    min: Duration,
    max: Duration,
    sum: Duration,
    hist: [u32; BUCKETS],
    slow: u32,
}

impl Prof {
    /// A stopped profiler; every report line starts with `banner`.
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
            running: false,
            start: None,
            calls: 0,
            min: Duration::MAX,
            max: Duration::ZERO,
            sum: Duration::ZERO,
            hist: [0; BUCKETS],
            slow: 0,
        }
    }

    /// Start recording. `begin`/`end` are no-ops until this is called.
    pub fn run(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Forget every recorded call.
    pub fn reset(&mut self) {
        let banner = std::mem::take(&mut self.banner);
        let running = self.running;
        *self = Self::new(banner);
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn begin(&mut self) {
        if self.running {
            self.start = Some(Instant::now());
        }
    }

    #[inline]
    pub fn end(&mut self) {
        if !self.running {
            return;
        }
        if let Some(start) = self.start.take() {
            self.record(start.elapsed());
        }
    }

    /// Add one call of length `d`.
    pub fn record(&mut self, d: Duration) {
        let ns = d.as_nanos();
        if ns >= 1_000_000 {
            self.slow += 1;
            return;
        }
        let ns = ns as u64;
        let i = if ns < 1_000 {
            ns / 100
        } else if ns < 10_000 {
            9 + ns / 1_000
        } else if ns < 100_000 {
            18 + ns / 10_000
        } else {
            27 + ns / 100_000
        };
        self.hist[i as usize] += 1;
        self.calls += 1;
        self.sum += d;
        self.min = self.min.min(d);
        self.max = self.max.max(d);
    }

    /// Calls recorded in the histogram (excludes calls of 1 ms or more).
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Calls of 1 ms or more.
    pub fn slow_calls(&self) -> u32 {
        self.slow
    }

    /// Mean duration of the histogram calls.
    pub fn mean(&self) -> Option<Duration> {
        (self.calls > 0).then(|| self.sum / self.calls)
    }

    /// Text report: a summary line, then one line per bucket. A decade holding
    /// at most 1% of the calls is folded into a single line.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let sum_us = self.sum.as_secs_f64() * 1e6;
        let per_call = if self.calls > 0 { sum_us / f64::from(self.calls) } else { 0.0 };
        let min_ns = if self.calls > 0 { self.min.as_nanos() } else { 0 };
        let _ = writeln!(
            out,
            "{} {} calls, {:.2} us, {:.2} us/call, min: {} ns, max: {:.2} us",
            self.banner,
            self.calls,
            sum_us,
            per_call,
            min_ns,
            self.max.as_secs_f64() * 1e6
        );

        let total = f64::from(self.calls.max(1));
        for dec in &DECADES {
            let bucket = &self.hist[dec.first..dec.end];
            let n: u32 = bucket.iter().sum();
            let share = f64::from(n) / total;
            if share <= 0.01 {
                let _ = writeln!(out, "{}  {}: {:5.2}%  {}", self.banner, dec.label, share * 100.0, n);
                continue;
            }
            for (k, &count) in bucket.iter().enumerate() {
                let lo = dec.start + k as u64 * dec.step;
                let _ = writeln!(
                    out,
                    "{}  {:>4}{u} - {:>4}{u}: {:5.2}%  {}",
                    self.banner,
                    lo,
                    lo + dec.step,
                    f64::from(count) * 100.0 / total,
                    count,
                    u = dec.unit
                );
            }
        }
        let _ = writeln!(out, "{}           >1ms:    ---   {}", self.banner, self.slow);
        out
    }
}

impl fmt::Display for Prof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}
