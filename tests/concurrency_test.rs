use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use telemetry_buffer::buffer::{BufferRing, Evictor, RingConfig, evictor};
use telemetry_buffer::domain::{TimeUnit, fields};
use telemetry_buffer::port::{DataArchive, DataProvider};
use tokio_util::sync::CancellationToken;

const PARTITIONS: usize = 16;
const TICKS: usize = PARTITIONS - 2;
const RECORDS_PER_WRITER: i64 = 2_000;

fn manual_ring() -> Arc<BufferRing> {
    Arc::new(
        BufferRing::memory(&RingConfig {
            partitions: PARTITIONS,
            rotation_interval: None,
            overlap: Duration::ZERO,
            max_partition_bytes: 64 * 1024 * 1024,
        })
        .unwrap(),
    )
}

fn timestamps(ring: &BufferRing, feed: &str) -> Vec<i64> {
    ring.get_data(&[feed.to_string()], TimeUnit::Milliseconds, 0, i64::MAX / 1_000_000)
        .unwrap()
        .remove(feed)
        .map(|records| records.into_iter().map(|r| r.timestamp).collect())
        .unwrap_or_default()
}

#[test]
fn test_concurrent_writers_and_rotation_lose_nothing() {
    let ring = manual_ring();
    let done = Arc::new(AtomicBool::new(false));

    // Fewer rotations than partitions: nothing written here is ever evicted.
    let ticker = {
        let ring = ring.clone();
        thread::spawn(move || {
            let mut previous = ring.current_partition_index();
            for _ in 0..TICKS {
                let next = evictor::tick(&ring).unwrap();
                assert_eq!(next, (previous + 1) % PARTITIONS);
                assert_eq!(ring.current_partition_index(), next);
                previous = next;
                thread::sleep(Duration::from_micros(500));
            }
        })
    };

    let observer = {
        let ring = ring.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut last = ring.current_partition_index();
            while !done.load(Ordering::Acquire) {
                let index = ring.current_partition_index();
                assert!(index >= last, "index went back from {last} to {index}");
                assert!(index <= TICKS);
                last = index;
            }
        })
    };

    let reader = {
        let ring = ring.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let seen = timestamps(&ring, "shared");
                assert!(seen.windows(2).all(|w| w[0] < w[1]), "unordered or duplicated read");
            }
        })
    };

    let mut writers = Vec::new();
    for writer in 0..4 {
        let ring = ring.clone();
        writers.push(thread::spawn(move || {
            let feed = format!("feed-{writer}");
            for ts in 0..RECORDS_PER_WRITER {
                ring.put_data(&feed, TimeUnit::Milliseconds, ts, &fields([("v", ts.to_string())]))
                    .unwrap();
            }
        }));
    }
    // Two writers share one feed on disjoint timestamps.
    for parity in 0..2 {
        let ring = ring.clone();
        writers.push(thread::spawn(move || {
            for n in 0..RECORDS_PER_WRITER {
                let ts = n * 2 + parity;
                ring.put_data("shared", TimeUnit::Milliseconds, ts, &fields([("v", "s")]))
                    .unwrap();
            }
        }));
    }

    for writer in writers {
        writer.join().unwrap();
    }
    ticker.join().unwrap();
    done.store(true, Ordering::Release);
    observer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(ring.current_partition_index(), TICKS);
    for writer in 0..4 {
        let seen = timestamps(&ring, &format!("feed-{writer}"));
        assert_eq!(seen, (0..RECORDS_PER_WRITER).collect::<Vec<_>>());
    }
    let shared = timestamps(&ring, "shared");
    assert_eq!(shared, (0..RECORDS_PER_WRITER * 2).collect::<Vec<_>>());

    let stats = ring.stats();
    assert_eq!(stats.metrics.records_written, (RECORDS_PER_WRITER * 8) as u64);
    assert_eq!(stats.metrics.rotations, TICKS as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_acknowledged_writes_are_readable_while_evictor_rotates() {
    let ring = Arc::new(
        BufferRing::memory(&RingConfig {
            partitions: 3,
            rotation_interval: Some(Duration::from_millis(50)),
            overlap: Duration::from_millis(200),
            max_partition_bytes: 64 * 1024 * 1024,
        })
        .unwrap(),
    );
    let token = CancellationToken::new();
    let evictor = Evictor::start(ring.clone(), token.clone()).unwrap();

    let mut writers = Vec::new();
    for writer in 0..3 {
        let ring = ring.clone();
        writers.push(tokio::spawn(async move {
            let feed = format!("feed-{writer}");
            for ts in 0..400 {
                ring.put_data(&feed, TimeUnit::Milliseconds, ts, &fields([("v", "x")]))
                    .unwrap();
                // Well inside the minimum retention of 300ms.
                let latest = ring.get_latest(&[feed.clone()], TimeUnit::Milliseconds, 0, ts);
                assert_eq!(latest[&feed][0].timestamp, ts);
                if ts % 20 == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    assert!(ring.stats().metrics.rotations > 0);
    token.cancel();
    evictor.stop().await;
}
