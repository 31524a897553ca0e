use crate::dataset::{Dataset, Record};
use serde::{Deserialize, Serialize};

/// Currently chosen coordinate. Fields are independent; a combination the
/// dataset does not contain simply has no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub batch: String,
    pub week: String,
    pub buffer: String,
    pub test: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            batch: "1".into(),
            week: "1".into(),
            buffer: "buffer 1".into(),
            test: "UVVIS".into(),
        }
    }
}

impl Selection {
    pub fn new(
        batch: impl Into<String>,
        week: impl Into<String>,
        buffer: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        Self {
            batch: batch.into(),
            week: week.into(),
            buffer: buffer.into(),
            test: test.into(),
        }
    }

    /// Record at this coordinate, image-series records included.
    pub fn record<'a>(&self, dataset: &'a Dataset) -> Option<&'a Record> {
        dataset.get_record(&self.batch, &self.week, &self.buffer, &self.test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    #[test]
    fn default_selection_points_at_first_uvvis_record() {
        let dataset = fixture();
        let record = Selection::default().record(&dataset).unwrap();
        assert_eq!(record.get("c_avg").and_then(|v| v.as_f64()), Some(100.0));
    }

    #[test]
    fn invalid_combination_has_no_data() {
        let dataset = fixture();
        let selection = Selection::new("2", "10", "buffer 1", "DLS");
        assert!(selection.record(&dataset).is_none());
    }
}
