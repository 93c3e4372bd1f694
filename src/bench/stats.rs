use crate::store::TransactionTimes;

/// Aggregates over the keys both providers delivered.
/// Deltas are `first - second` in nanoseconds; negative means the first provider was earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkStats {
    pub match_count: usize,
    pub first_faster: usize,
    pub second_faster: usize,
    pub ties: usize,
    pub total_diff_ns: i128,
    /// Distinct keys per store
    pub first_unique: usize,
    pub second_unique: usize,
    /// Per-match deltas, sorted ascending
    deltas_ns: Vec<i64>,
}

/// Join both stores on key and classify every match
pub fn calculate_stats(first: &TransactionTimes, second: &TransactionTimes) -> BenchmarkStats {
    let mut stats = BenchmarkStats {
        first_unique: first.len(),
        second_unique: second.len(),
        ..Default::default()
    };

    for (key, t_first) in first {
        let Some(t_second) = second.get(key) else { continue };
        stats.record(delta_nanos(*t_first - *t_second));
    }

    stats.deltas_ns.sort_unstable();
    stats
}

fn delta_nanos(delta: chrono::TimeDelta) -> i64 {
    delta.num_nanoseconds().unwrap_or(if delta < chrono::TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

impl BenchmarkStats {
    fn record(&mut self, delta_ns: i64) {
        self.match_count += 1;
        match delta_ns.signum() {
            -1 => self.first_faster += 1,
            1 => self.second_faster += 1,
            _ => self.ties += 1,
        }
        self.total_diff_ns += i128::from(delta_ns);
        self.deltas_ns.push(delta_ns);
    }

    /// Build stats from raw deltas, as if each came from one matched key
    pub fn from_deltas(deltas_ns: impl IntoIterator<Item = i64>) -> Self {
        let mut stats = Self::default();
        for delta in deltas_ns {
            stats.record(delta);
        }
        stats.first_unique = stats.match_count;
        stats.second_unique = stats.match_count;
        stats.deltas_ns.sort_unstable();
        stats
    }

    pub fn first_only(&self) -> usize {
        self.first_unique.saturating_sub(self.match_count)
    }

    pub fn second_only(&self) -> usize {
        self.second_unique.saturating_sub(self.match_count)
    }

    /// Share of matches, in percent
    pub fn percentage(&self, count: usize) -> f64 {
        if self.match_count == 0 {
            return 0.0;
        }
        count as f64 / self.match_count as f64 * 100.0
    }

    /// Mean signed delta, truncated toward zero. `None` without matches.
    pub fn mean_delta_ns(&self) -> Option<i64> {
        if self.match_count == 0 {
            return None;
        }
        let mean = self.total_diff_ns / self.match_count as i128;
        // the mean of i64 values always fits in an i64
        Some(mean as i64)
    }

    pub fn min_delta_ns(&self) -> Option<i64> {
        self.deltas_ns.first().copied()
    }

    pub fn max_delta_ns(&self) -> Option<i64> {
        self.deltas_ns.last().copied()
    }

    /// Nearest-rank percentile of the deltas, `p` in (0, 100]
    pub fn percentile_ns(&self, p: f64) -> Option<i64> {
        if self.deltas_ns.is_empty() {
            return None;
        }
        let n = self.deltas_ns.len();
        let rank = (p.clamp(0.0, 100.0) / 100.0 * n as f64).ceil() as usize;
        let index = rank.clamp(1, n) - 1;
        Some(self.deltas_ns[index])
    }

    pub fn deltas_ns(&self) -> &[i64] {
        &self.deltas_ns
    }
}
