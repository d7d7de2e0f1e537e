//! Property tests for time window partitioning and record identity

use chrono::{DateTime, Duration, TimeZone, Utc};
use eeindex_core::models::{BoundingBox, RecordId, TimeWindow};
use proptest::prelude::*;

fn instant(offset_days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset_days)
}

proptest! {
    #[test]
    fn yearly_buckets_tile_the_window(start in 0i64..9000, len in 0i64..4000) {
        let window = TimeWindow::new(instant(start), instant(start + len)).unwrap();
        let buckets = window.split_by_year();

        if window.is_empty() {
            prop_assert!(buckets.is_empty());
        } else {
            prop_assert_eq!(buckets.first().unwrap().start(), window.start());
            prop_assert_eq!(buckets.last().unwrap().end(), window.end());
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[0].end(), pair[1].start());
            }
        }

        for bucket in &buckets {
            prop_assert!(!bucket.is_empty());
            prop_assert_eq!(bucket.start().format("%Y").to_string(),
                (bucket.end() - Duration::nanoseconds(1)).format("%Y").to_string());
        }
    }

    #[test]
    fn record_id_is_deterministic(
        item in "[A-Z0-9_]{4,20}",
        offset in 0i64..9000,
        lat in -80.0f64..80.0,
        lon in -170.0f64..170.0,
    ) {
        let bounds = BoundingBox::from_pairs((lat, lat + 1.0), (lon, lon + 1.0)).unwrap();
        let first = RecordId::derive("COPERNICUS/S2_SR", &item, instant(offset), &bounds);
        let second = RecordId::derive("COPERNICUS/S2_SR", &item, instant(offset), &bounds);
        prop_assert_eq!(first, second);
    }
}
