pub mod render;

pub use render::render_line;

use crate::query::LogRecord;

/// Outcome of deduplicating one batch. Borrows from the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dedupe<'a> {
    /// Records not yet emitted, in batch order.
    pub emitted: &'a [LogRecord],
    /// Final record of the batch, or `None` when the batch is empty.
    pub new_last: Option<&'a LogRecord>,
    /// Index of the first record equal to the previous boundary, if found.
    pub boundary: Option<usize>,
}

impl Dedupe<'_> {
    pub fn skipped(&self) -> usize {
        self.boundary.map_or(0, |idx| idx + 1)
    }
}

/// Split `batch` into the already-seen prefix and the new suffix.
///
/// Each query after the first starts at the previous batch's last record, so
/// the service returns that record (and any records sharing its truncated
/// second) again.
///
/// With no previous record every row is new. Otherwise everything up to and
/// including the first row equal to `last_emitted` is dropped. When no row
/// matches (the boundary aged out of the window) the whole batch is new.
pub fn dedupe<'a>(last_emitted: Option<&LogRecord>, batch: &'a [LogRecord]) -> Dedupe<'a> {
    let boundary = last_emitted.and_then(|last| batch.iter().position(|record| record == last));

    let emitted = match boundary {
        Some(idx) => &batch[idx + 1..],
        None => batch,
    };

    Dedupe {
        emitted,
        new_last: batch.last(),
        boundary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: &str, msg: &str, ptr: &str) -> LogRecord {
        LogRecord::from_fields([("@timestamp", ts), ("@message", msg), ("@ptr", ptr)])
    }

    #[test]
    fn test_first_cycle_emits_everything() {
        let batch = vec![
            record("2024-01-01 00:00:01.000", "a", "p1"),
            record("2024-01-01 00:00:02.000", "b", "p2"),
        ];

        let result = dedupe(None, &batch);
        assert_eq!(result.emitted, &batch[..]);
        assert_eq!(result.new_last, Some(&batch[1]));
        assert_eq!(result.boundary, None);
        assert_eq!(result.skipped(), 0);
    }

    #[test]
    fn test_skips_through_boundary() {
        let a = record("2024-01-01 00:00:01.000", "a", "p1");
        let b = record("2024-01-01 00:00:01.500", "b", "p2");
        let c = record("2024-01-01 00:00:01.700", "c", "p3");
        let d = record("2024-01-01 00:00:02.000", "d", "p4");

        let batch = vec![a, b.clone(), c.clone(), d.clone()];
        let result = dedupe(Some(&b), &batch);

        assert_eq!(result.emitted, &[c, d.clone()][..]);
        assert_eq!(result.boundary, Some(1));
        assert_eq!(result.skipped(), 2);
        assert_eq!(result.new_last, Some(&d));
    }

    #[test]
    fn test_boundary_at_end_emits_nothing() {
        let a = record("2024-01-01 00:00:01.000", "a", "p1");
        let b = record("2024-01-01 00:00:02.000", "b", "p2");
        let batch = vec![a, b.clone()];

        let result = dedupe(Some(&b), &batch);
        assert!(result.emitted.is_empty());
        assert_eq!(result.new_last, Some(&b));
    }

    #[test]
    fn test_missing_boundary_treats_batch_as_new() {
        let gone = record("2024-01-01 00:00:00.000", "old", "p0");
        let batch = vec![
            record("2024-01-01 00:00:05.000", "x", "p5"),
            record("2024-01-01 00:00:06.000", "y", "p6"),
        ];

        let result = dedupe(Some(&gone), &batch);
        assert_eq!(result.emitted, &batch[..]);
        assert_eq!(result.boundary, None);
    }

    #[test]
    fn test_pointer_is_part_of_identity() {
        let last = record("2024-01-01 00:00:01.000", "same", "p1");
        let twin = record("2024-01-01 00:00:01.000", "same", "p2");
        let batch = vec![twin.clone(), last.clone()];

        let result = dedupe(Some(&last), &batch);
        assert_eq!(result.boundary, Some(1));
        assert!(result.emitted.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let boundary = record("2024-01-01 00:00:01.000", "b", "p1");
        let other = record("2024-01-01 00:00:02.000", "c", "p2");
        let batch = vec![boundary.clone(), other.clone(), boundary.clone()];

        let result = dedupe(Some(&boundary), &batch);
        assert_eq!(result.emitted, &[other, boundary][..]);
    }

    #[test]
    fn test_empty_batch() {
        let last = record("2024-01-01 00:00:01.000", "a", "p1");
        let result = dedupe(Some(&last), &[]);

        assert!(result.emitted.is_empty());
        assert_eq!(result.new_last, None);
    }

    #[test]
    fn test_overlap_of_k_records() {
        let b1: Vec<LogRecord> = (0..5)
            .map(|i| record(&format!("2024-01-01 00:00:0{}.000", i), &format!("m{}", i), &format!("p{}", i)))
            .collect();
        // Second batch repeats the last three records of the first.
        let mut b2: Vec<LogRecord> = b1[2..].to_vec();
        b2.push(record("2024-01-01 00:00:05.000", "m5", "p5"));
        b2.push(record("2024-01-01 00:00:06.000", "m6", "p6"));

        let result = dedupe(b1.last(), &b2);
        assert_eq!(result.emitted, &b2[3..]);
        for emitted in result.emitted {
            assert!(!b1.contains(emitted));
        }
    }
}
