use itree_schema::StatRecord;

/// Streaming count/mean/variance accumulator (Welford).
///
/// Partial results from independent shards combine with [`OnlineStat::merge`],
/// which uses the pairwise update of Chan et al. and treats an empty stat as
/// the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnlineStat {
    count: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn merge(&mut self, other: &OnlineStat) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;

        self.mean += delta * nb / n;
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// `None` until the first sample arrives.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance; needs at least two samples.
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub fn to_record(&self) -> StatRecord {
        StatRecord {
            count: self.count,
            mean: self.mean,
            m2: self.m2,
        }
    }

    pub fn from_record(record: &StatRecord) -> Self {
        if record.count == 0 {
            return Self::default();
        }
        Self {
            count: record.count,
            mean: record.mean,
            m2: record.m2,
        }
    }
}
