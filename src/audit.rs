use roadnet_core::prelude::*;
use serde::Serialize;

/// Minimum, mean and maximum of a route metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl MetricSummary {
    #[allow(clippy::cast_precision_loss)]
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        let (mut min, mut max, mut sum, mut count) = (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0usize);
        for value in values {
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }
        (count > 0).then(|| Self {
            min,
            mean: sum / count as f64,
            max,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditStats {
    pub queries: usize,
    pub found: usize,
    pub unreachable: usize,
    pub failed: usize,
    /// Over found routes only
    pub distance_m: Option<MetricSummary>,
    pub travel_time_min: Option<MetricSummary>,
}

/// Route picked to represent a position in the distance distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripRank {
    Shortest,
    LowerQuartile,
    Median,
    UpperQuartile,
    Longest,
}

/// Results of one batch of route queries
#[derive(Debug, Clone)]
pub struct AuditRun {
    results: Vec<RouteResult>,
    stats: AuditStats,
}

impl AuditRun {
    pub fn new(results: Vec<RouteResult>) -> Self {
        let found: Vec<&RouteResult> = results.iter().filter(|r| r.is_found()).collect();
        let unreachable = results.iter().filter(|r| r.is_unreachable()).count();
        let stats = AuditStats {
            queries: results.len(),
            found: found.len(),
            unreachable,
            failed: results.len() - found.len() - unreachable,
            distance_m: MetricSummary::of(found.iter().map(|r| r.distance_m)),
            travel_time_min: MetricSummary::of(found.iter().map(|r| r.travel_time_min)),
        };
        Self { results, stats }
    }

    /// Results in query submission order
    pub fn results(&self) -> &[RouteResult] {
        &self.results
    }

    pub fn stats(&self) -> &AuditStats {
        &self.stats
    }

    /// Success rate in percent; zero for an empty batch
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.stats.queries == 0 {
            0.0
        } else {
            self.stats.found as f64 / self.stats.queries as f64 * 100.0
        }
    }

    /// Shortest, quartile, median and longest found routes by distance.
    ///
    /// A route may represent several ranks when few routes were found.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn representative_trips(&self) -> Vec<(TripRank, &RouteResult)> {
        let mut found: Vec<&RouteResult> = self.results.iter().filter(|r| r.is_found()).collect();
        if found.is_empty() {
            return Vec::new();
        }
        found.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.query_index.cmp(&b.query_index))
        });

        let last = found.len() - 1;
        let at = |fraction: f64| found[(fraction * last as f64).round() as usize];
        vec![
            (TripRank::Shortest, found[0]),
            (TripRank::LowerQuartile, at(0.25)),
            (TripRank::Median, at(0.5)),
            (TripRank::UpperQuartile, at(0.75)),
            (TripRank::Longest, found[last]),
        ]
    }
}
