use crate::domain::{FeedData, Record};
use std::collections::{BTreeMap, HashMap};

/// Per-feed fan-in of provider results, fed in level-of-service order.
///
/// Each absorbed provider claims the interval it covers for a feed: from the
/// window start when it holds the feed's whole history from there, otherwise from
/// its first returned record, up to its last returned record. Records of later
/// providers inside an earlier claim are dropped; the rest are added unless the
/// timestamp is already taken.
#[derive(Debug)]
pub(crate) struct FeedMerger {
    start: i64,
    end: i64,
    series: HashMap<String, BTreeMap<i64, Record>>,
    covered: HashMap<String, Vec<(i64, i64)>>,
}

impl FeedMerger {
    pub(crate) fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            series: HashMap::new(),
            covered: HashMap::new(),
        }
    }

    pub(crate) fn absorb(
        &mut self,
        data: FeedData,
        requested: &[String],
        fully_within: impl Fn(&str) -> bool,
    ) {
        for (feed_id, records) in data {
            if !requested.contains(&feed_id) {
                continue;
            }

            let claims = self.covered.get(&feed_id).cloned().unwrap_or_default();
            let series = self.series.entry(feed_id.clone()).or_default();
            let mut seen: Option<(i64, i64)> = None;

            for record in records {
                let ts = record.timestamp;
                if ts < self.start || ts > self.end {
                    continue;
                }
                seen = Some(match seen {
                    Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
                    None => (ts, ts),
                });
                if claims.iter().any(|(lo, hi)| *lo <= ts && ts <= *hi) {
                    continue;
                }
                series.entry(ts).or_insert(record);
            }

            if let Some((first, last)) = seen {
                let lo = if fully_within(&feed_id) { self.start } else { first };
                self.covered.entry(feed_id).or_default().push((lo, last));
            }
        }
    }

    pub(crate) fn finish(self) -> FeedData {
        self.series
            .into_iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(feed_id, series)| (feed_id, series.into_values().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fields;

    fn data(feed: &str, points: &[(i64, &str)]) -> FeedData {
        let records = points
            .iter()
            .map(|(ts, v)| Record::new(feed, *ts, fields([("v", *v)])))
            .collect();
        FeedData::from([(feed.to_string(), records)])
    }

    fn requested(feeds: &[&str]) -> Vec<String> {
        feeds.iter().map(|s| s.to_string()).collect()
    }

    fn values(result: &FeedData, feed: &str) -> Vec<(i64, String)> {
        result[feed]
            .iter()
            .map(|r| (r.timestamp, r.fields["v"].clone()))
            .collect()
    }

    #[test]
    fn test_disjoint_windows_are_unioned() {
        let feeds = requested(&["temp"]);
        let mut merger = FeedMerger::new(0, 100);
        merger.absorb(data("temp", &[(50, "fast"), (60, "fast")]), &feeds, |_| false);
        merger.absorb(data("temp", &[(10, "slow"), (20, "slow")]), &feeds, |_| false);

        let result = merger.finish();
        let timestamps: Vec<i64> = result["temp"].iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20, 50, 60]);
    }

    #[test]
    fn test_first_seen_wins_on_identical_timestamp() {
        let feeds = requested(&["temp"]);
        let mut merger = FeedMerger::new(0, 100);
        merger.absorb(data("temp", &[(10, "fast")]), &feeds, |_| false);
        merger.absorb(data("temp", &[(10, "slow"), (11, "slow")]), &feeds, |_| false);

        let result = merger.finish();
        assert_eq!(
            values(&result, "temp"),
            vec![(10, "fast".to_string()), (11, "slow".to_string())]
        );
    }

    #[test]
    fn test_slower_records_inside_covered_window_are_dropped() {
        let feeds = requested(&["temp"]);
        let mut merger = FeedMerger::new(0, 100);
        // The fast provider holds the feed since before the window start.
        merger.absorb(data("temp", &[(5, "fast"), (40, "fast")]), &feeds, |_| true);
        merger.absorb(
            data("temp", &[(0, "slow"), (30, "slow"), (90, "slow")]),
            &feeds,
            |_| false,
        );

        let result = merger.finish();
        assert_eq!(
            values(&result, "temp"),
            vec![
                (5, "fast".to_string()),
                (40, "fast".to_string()),
                (90, "slow".to_string())
            ]
        );
    }

    #[test]
    fn test_unrequested_and_out_of_window_records_are_ignored() {
        let feeds = requested(&["temp"]);
        let mut merger = FeedMerger::new(10, 20);
        merger.absorb(data("other", &[(15, "x")]), &feeds, |_| false);
        merger.absorb(data("temp", &[(5, "x"), (25, "x")]), &feeds, |_| false);

        assert!(merger.finish().is_empty());
    }
}
