//! Status response records.

use std::collections::HashMap;

use super::GearmanError;

/// Number of tab-separated fields in a `status` line.
const STATUS_FIELDS: usize = 4;

/// Queue state of a single registered function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionStatus {
    /// Function name as registered by workers.
    pub name: String,
    /// Jobs queued or running.
    pub total: u64,
    /// Jobs currently being executed.
    pub running: u64,
    /// Workers registered as capable of running this function.
    pub workers: u64,
}

impl FunctionStatus {
    /// Parse one `<name>\t<total>\t<running>\t<workers>` line.
    ///
    /// The line must not contain the trailing newline.
    pub fn parse_line(line: &str) -> Result<Self, GearmanError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != STATUS_FIELDS {
            return Err(GearmanError::parse(
                line,
                format!("expected {STATUS_FIELDS} fields, got {}", fields.len()),
            ));
        }

        let name = fields[0];
        if name.is_empty() {
            return Err(GearmanError::parse(line, "empty function name"));
        }

        let number = |field: &str, what: &str| {
            field
                .parse::<u64>()
                .map_err(|e| GearmanError::parse(line, format!("invalid {what} {field:?}: {e}")))
        };

        Ok(Self {
            name: name.to_string(),
            total: number(fields[1], "total")?,
            running: number(fields[2], "running")?,
            workers: number(fields[3], "workers")?,
        })
    }

    /// Jobs queued but not yet picked up by a worker.
    ///
    /// Not clamped: if the server ever reports more running than total jobs
    /// the result is negative. Widened so the full `u64` range never wraps.
    pub fn waiting(&self) -> i128 {
        i128::from(self.total) - i128::from(self.running)
    }
}

/// All functions reported by one `status` call, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    functions: HashMap<String, FunctionStatus>,
}

impl StatusSnapshot {
    /// Build a snapshot from response lines, sentinel already removed.
    ///
    /// Any malformed line fails the whole snapshot. A repeated function name
    /// replaces the earlier entry.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, GearmanError> {
        let mut snapshot = Self::default();
        for line in lines {
            snapshot.insert(FunctionStatus::parse_line(line)?);
        }
        Ok(snapshot)
    }

    /// Insert a record, replacing any previous record with the same name.
    pub fn insert(&mut self, status: FunctionStatus) {
        self.functions.insert(status.name.clone(), status);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionStatus> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Iterate over the records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionStatus> {
        self.functions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_valid() {
        let status = FunctionStatus::parse_line("send_email\t5\t2\t3").unwrap();
        assert_eq!(
            status,
            FunctionStatus {
                name: "send_email".to_string(),
                total: 5,
                running: 2,
                workers: 3,
            }
        );
        assert_eq!(status.waiting(), 3);
    }

    #[test]
    fn test_parse_line_wrong_field_count() {
        let err = FunctionStatus::parse_line("send_email\t5\t2").unwrap_err();
        assert!(matches!(err, GearmanError::Parse { .. }));
        assert!(err.to_string().contains("expected 4 fields, got 3"));

        assert!(FunctionStatus::parse_line("send_email\t5\t2\t3\t1").is_err());
        assert!(FunctionStatus::parse_line("").is_err());
    }

    #[test]
    fn test_parse_line_non_numeric() {
        let err = FunctionStatus::parse_line("fn\tX\t2\t3").unwrap_err();
        assert!(err.to_string().contains("invalid total"));

        assert!(FunctionStatus::parse_line("fn\t1\t-2\t3").is_err());
        assert!(FunctionStatus::parse_line("fn\t1\t2\t ").is_err());
    }

    #[test]
    fn test_parse_line_empty_name() {
        assert!(FunctionStatus::parse_line("\t1\t0\t1").is_err());
    }

    #[test]
    fn test_waiting_is_not_clamped() {
        let status = FunctionStatus::parse_line("odd\t1\t4\t2").unwrap();
        assert_eq!(status.waiting(), -3);
    }

    #[test]
    fn test_waiting_full_u64_range() {
        let big = FunctionStatus::parse_line("big\t18446744073709551615\t0\t1").unwrap();
        assert_eq!(big.waiting(), i128::from(u64::MAX));
        assert!(big.waiting() as f64 > 1.8e19);

        let inverted = FunctionStatus::parse_line("inv\t0\t18446744073709551615\t1").unwrap();
        assert_eq!(inverted.waiting(), -i128::from(u64::MAX));
    }

    #[test]
    fn test_snapshot_last_write_wins() {
        let snapshot =
            StatusSnapshot::from_lines(["resize\t1\t1\t1", "email\t0\t0\t2", "resize\t9\t4\t3"])
                .unwrap();

        assert_eq!(snapshot.len(), 2);
        let resize = snapshot.get("resize").unwrap();
        assert_eq!((resize.total, resize.running, resize.workers), (9, 4, 3));
    }

    #[test]
    fn test_snapshot_aborts_on_bad_line() {
        let result = StatusSnapshot::from_lines(["ok\t1\t0\t1", "fn\tX\t2\t3", "also_ok\t2\t1\t1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_empty() {
        let snapshot = StatusSnapshot::from_lines(std::iter::empty()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.iter().count(), 0);
    }
}
