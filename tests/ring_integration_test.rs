use proptest::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;
use telemetry_buffer::buffer::{BufferRing, RingConfig};
use telemetry_buffer::domain::{Fields, TimeUnit, fields};
use telemetry_buffer::port::{DataArchive, DataProvider};

fn manual_ring(partitions: usize) -> BufferRing {
    BufferRing::memory(&RingConfig {
        partitions,
        rotation_interval: None,
        overlap: Duration::ZERO,
        max_partition_bytes: 16 * 1024 * 1024,
    })
    .unwrap()
}

fn feeds(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn timestamps(ring: &BufferRing, feed: &str, unit: TimeUnit, start: i64, end: i64) -> Vec<i64> {
    ring.get_data(&feeds(&[feed]), unit, start, end)
        .unwrap()
        .remove(feed)
        .map(|records| records.into_iter().map(|r| r.timestamp).collect())
        .unwrap_or_default()
}

#[test]
fn test_put_then_get_round_trip() {
    let ring = manual_ring(3);
    ring.put_data("temp", TimeUnit::Milliseconds, 1_000, &fields([("value", "20.5")]))
        .unwrap();
    ring.put_data("temp", TimeUnit::Milliseconds, 2_000, &fields([("value", "21.0")]))
        .unwrap();

    let data = ring
        .get_data(&feeds(&["temp"]), TimeUnit::Milliseconds, 0, 5_000)
        .unwrap();
    let records = &data["temp"];
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].timestamp, 1_000);
    assert_eq!(records[0].fields["value"], "20.5");
    assert_eq!(records[1].fields["value"], "21.0");

    // Window bounds are inclusive.
    assert_eq!(timestamps(&ring, "temp", TimeUnit::Milliseconds, 1_000, 1_000), vec![1_000]);
    assert_eq!(timestamps(&ring, "temp", TimeUnit::Milliseconds, 1_001, 1_999), Vec::<i64>::new());
}

#[test]
fn test_unknown_feed_is_absent() {
    let ring = manual_ring(2);
    ring.put_data("temp", TimeUnit::Seconds, 1, &fields([("v", "1")])).unwrap();

    let data = ring
        .get_data(&feeds(&["temp", "humidity"]), TimeUnit::Seconds, 0, 10)
        .unwrap();
    assert!(data.contains_key("temp"));
    assert!(!data.contains_key("humidity"));
}

#[test]
fn test_eviction_after_partition_count_rotations() {
    let ring = manual_ring(3);
    ring.put_data("temp", TimeUnit::Seconds, 1, &fields([("v", "old")])).unwrap();

    ring.rotate().unwrap();
    ring.rotate().unwrap();
    assert_eq!(timestamps(&ring, "temp", TimeUnit::Seconds, 0, 10), vec![1]);

    // The third rotation reuses the partition holding the record.
    ring.rotate().unwrap();
    assert_eq!(ring.current_partition_index(), 0);
    assert!(timestamps(&ring, "temp", TimeUnit::Seconds, 0, 10).is_empty());
    assert!(!ring.is_fully_within_time_span("temp", TimeUnit::Seconds, 10));
}

#[test]
fn test_query_spans_partitions() {
    let ring = manual_ring(4);
    for (partition, ts) in [(0, 10), (1, 20), (2, 30)] {
        assert_eq!(ring.current_partition_index(), partition);
        ring.put_data("temp", TimeUnit::Seconds, ts, &fields([("p", partition.to_string())]))
            .unwrap();
        ring.put_data("pressure", TimeUnit::Seconds, ts + 1, &fields([("p", "x")]))
            .unwrap();
        ring.rotate().unwrap();
    }

    assert_eq!(timestamps(&ring, "temp", TimeUnit::Seconds, 0, 100), vec![10, 20, 30]);
    assert_eq!(timestamps(&ring, "temp", TimeUnit::Seconds, 15, 30), vec![20, 30]);
    assert_eq!(timestamps(&ring, "pressure", TimeUnit::Seconds, 0, 100), vec![11, 21, 31]);

    let data = ring
        .get_data(&feeds(&["temp", "pressure"]), TimeUnit::Seconds, 20, 21)
        .unwrap();
    assert_eq!(data["temp"].len(), 1);
    assert_eq!(data["pressure"].len(), 1);
}

#[test]
fn test_bulk_write_in_seconds_read_in_millis() {
    let ring = manual_ring(2);
    let entries: BTreeMap<i64, Fields> = (1..=3)
        .map(|ts| (ts, fields([("v", ts.to_string())])))
        .collect();
    ring.put_bulk("temp", TimeUnit::Seconds, &entries).unwrap();

    assert_eq!(
        timestamps(&ring, "temp", TimeUnit::Milliseconds, 0, 10_000),
        vec![1_000, 2_000, 3_000]
    );
    assert!(ring.is_fully_within_time_span("temp", TimeUnit::Milliseconds, 1_000));
    assert!(!ring.is_fully_within_time_span("temp", TimeUnit::Milliseconds, 999));
}

#[test]
fn test_rejected_write_leaves_ring_untouched() {
    let ring = manual_ring(2);
    assert!(ring.put_data("", TimeUnit::Seconds, 1, &fields([("v", "1")])).is_err());
    assert!(ring.put_data("temp", TimeUnit::Seconds, 1, &Fields::new()).is_err());
    assert!(ring.put_data("temp", TimeUnit::Seconds, i64::MAX, &fields([("v", "1")])).is_err());
    assert_eq!(ring.stats().metrics.records_written, 0);
}

#[cfg(feature = "disk")]
#[test]
fn test_disk_ring_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = RingConfig {
        partitions: 3,
        rotation_interval: None,
        overlap: Duration::ZERO,
        max_partition_bytes: 16 * 1024 * 1024,
    };

    {
        let ring = BufferRing::disk(&config, dir.path()).unwrap();
        ring.put_data("temp", TimeUnit::Seconds, 1, &fields([("v", "1")])).unwrap();
        ring.rotate().unwrap();
        ring.put_data("temp", TimeUnit::Seconds, 2, &fields([("v", "2")])).unwrap();
        ring.close().unwrap();
    }

    let reopened = BufferRing::disk(&config, dir.path()).unwrap();
    assert_eq!(reopened.current_partition_index(), 1);
    assert_eq!(timestamps(&reopened, "temp", TimeUnit::Seconds, 0, 10), vec![1, 2]);
    assert!(reopened.is_fully_within_time_span("temp", TimeUnit::Seconds, 1));
    reopened.close().unwrap();
}

proptest! {
    #[test]
    fn prop_queries_return_window_in_order(
        writes in prop::collection::vec((0i64..10_000, 0usize..3), 1..64),
        start in 0i64..10_000,
        len in 0i64..10_000,
    ) {
        let ring = manual_ring(4);
        let mut expected = std::collections::BTreeSet::new();
        for (ts, rotations) in &writes {
            for _ in 0..*rotations {
                // Stay within one lap so nothing is evicted.
                if ring.current_partition_index() < 3 {
                    ring.rotate().unwrap();
                }
            }
            ring.put_data("temp", TimeUnit::Milliseconds, *ts, &fields([("v", ts.to_string())])).unwrap();
            expected.insert(*ts);
        }

        let end = start + len;
        let got = timestamps(&ring, "temp", TimeUnit::Milliseconds, start, end);
        let want: Vec<i64> = expected.range(start..=end).copied().collect();
        prop_assert_eq!(got, want);

        let earliest = *expected.iter().next().unwrap();
        prop_assert_eq!(
            ring.is_fully_within_time_span("temp", TimeUnit::Milliseconds, start),
            earliest <= start
        );
    }
}
