//! Read-only views over a [`Dataset`].
//!
//! Every lookup treats a missing batch, week, buffer, test or field as "no
//! data" and returns `None` or an empty list; nothing here fails.

use crate::dataset::{numeric_key_order, Dataset, Record};
use crate::format::format_with_unit;
use crate::schema::{find_parameter, IMAGE_SERIES_TEST};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record field holding the file reference of a measurement.
pub const FILE_FIELD: &str = "file";

/// Value of one field at one week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub week: u32,
    pub value: f64,
}

/// Value of one field in one buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    pub buffer: String,
    pub value: f64,
}

/// A record field joined with its schema entry, for tabular display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValue {
    pub key: String,
    pub label: Option<&'static str>,
    pub unit: &'static str,
    pub value: Value,
    pub display: String,
}

impl Dataset {
    /// Batch ids, ascending numerically.
    pub fn list_batches(&self) -> Vec<String> {
        sorted_numeric(self.keys_at(&[]))
    }

    /// Week ids of `batch`, ascending numerically.
    pub fn list_weeks(&self, batch: &str) -> Vec<String> {
        sorted_numeric(self.keys_at(&[batch]))
    }

    /// Buffer ids, ascending lexicographically.
    pub fn list_buffers(&self, batch: &str, week: &str) -> Vec<String> {
        let mut buffers = self.keys_at(&[batch, week]);
        buffers.sort();
        buffers
    }

    /// Quantitative test names; the image-series test is left out.
    pub fn list_tests(&self, batch: &str, week: &str, buffer: &str) -> Vec<String> {
        let mut tests = self.list_tests_with_images(batch, week, buffer);
        tests.retain(|test| test != IMAGE_SERIES_TEST);
        tests
    }

    /// Every test name recorded for the coordinate, image-series included.
    pub fn list_tests_with_images(&self, batch: &str, week: &str, buffer: &str) -> Vec<String> {
        let mut tests = self.keys_at(&[batch, week, buffer]);
        tests.sort();
        tests
    }

    /// Cell-type labels under the image-series test.
    pub fn list_image_categories(&self, batch: &str, week: &str, buffer: &str) -> Vec<String> {
        let mut categories = self.keys_at(&[batch, week, buffer, IMAGE_SERIES_TEST]);
        categories.sort();
        categories
    }

    pub fn get_record(&self, batch: &str, week: &str, buffer: &str, test: &str) -> Option<&Record> {
        self.descend(&[batch, week, buffer, test])?.as_object()
    }

    /// Image path of `cell_type` under the image-series test.
    pub fn resolve_image_path(
        &self,
        batch: &str,
        week: &str,
        buffer: &str,
        cell_type: &str,
    ) -> Option<&str> {
        let cell = self
            .descend(&[batch, week, buffer, IMAGE_SERIES_TEST, cell_type])?
            .as_object()?;
        resolve_file_reference(cell)
    }

    /// Numeric value of `field` at one coordinate.
    pub fn field_value(
        &self,
        batch: &str,
        week: &str,
        buffer: &str,
        test: &str,
        field: &str,
    ) -> Option<f64> {
        self.descend(&[batch, week, buffer, test, field])
            .and_then(numeric_value)
    }

    /// `field` across every week of `batch`, earliest first. Weeks where the
    /// field is absent or null are skipped.
    pub fn track_over_weeks(
        &self,
        batch: &str,
        buffer: &str,
        test: &str,
        field: &str,
    ) -> Vec<TrendPoint> {
        self.list_weeks(batch)
            .iter()
            .filter_map(|week| {
                let week_number = week.trim().parse::<u32>().ok()?;
                let value = self.field_value(batch, week, buffer, test, field)?;
                Some(TrendPoint {
                    week: week_number,
                    value,
                })
            })
            .collect()
    }

    /// `field` across every buffer of (`batch`, `week`), in buffer order.
    pub fn compare_across_buffers(
        &self,
        batch: &str,
        week: &str,
        test: &str,
        field: &str,
    ) -> Vec<ComparisonPoint> {
        self.list_buffers(batch, week)
            .into_iter()
            .filter_map(|buffer| {
                let value = self.field_value(batch, week, &buffer, test, field)?;
                Some(ComparisonPoint { buffer, value })
            })
            .collect()
    }
}

/// Path carried by a record's `file` field, either a plain string or an
/// object with a `path` attribute.
pub fn resolve_file_reference(record: &Record) -> Option<&str> {
    match record.get(FILE_FIELD)? {
        Value::String(path) => Some(path.as_str()),
        Value::Object(reference) => reference.get("path")?.as_str(),
        _ => None,
    }
}

/// Every field of `record` except the file reference, sorted by key and
/// labelled from the schema of `test` where known.
pub fn display_fields(record: &Record, test: &str) -> Vec<FieldValue> {
    let mut fields: Vec<FieldValue> = record
        .iter()
        .filter(|(key, _)| key.as_str() != FILE_FIELD)
        .map(|(key, value)| {
            let param = find_parameter(test, key);
            let unit = param.map(|p| p.unit).unwrap_or("");
            let display = match (value, numeric_value(value)) {
                (Value::String(text), None) => text.clone(),
                (_, Some(number)) => format_with_unit(number, unit),
                (other, None) => other.to_string(),
            };
            FieldValue {
                key: key.clone(),
                label: param.map(|p| p.label),
                unit,
                value: value.clone(),
                display,
            }
        })
        .collect();
    fields.sort_by(|a, b| a.key.cmp(&b.key));
    fields
}

/// Numbers count as data points, as do strings holding a number.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn sorted_numeric(mut keys: Vec<String>) -> Vec<String> {
    keys.sort_by(|a, b| numeric_key_order(a, b));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use serde_json::json;

    #[test]
    fn batches_and_weeks_sort_numerically() {
        let dataset = fixture();
        assert_eq!(dataset.list_batches(), vec!["1", "2", "10"]);
        assert_eq!(dataset.list_weeks("1"), vec!["1", "2", "10"]);
        assert!(dataset.list_weeks("7").is_empty());
    }

    #[test]
    fn buffers_sort_lexicographically() {
        let dataset = fixture();
        assert_eq!(
            dataset.list_buffers("1", "1"),
            vec!["buffer 1", "buffer 10", "buffer 2"]
        );
        assert!(dataset.list_buffers("1", "99").is_empty());
    }

    #[test]
    fn test_listing_variants() {
        let dataset = fixture();
        assert_eq!(
            dataset.list_tests("1", "1", "buffer 1"),
            vec!["DLS", "ELISA", "UVVIS"]
        );
        assert_eq!(
            dataset.list_tests_with_images("1", "1", "buffer 1"),
            vec!["Cellules", "DLS", "ELISA", "UVVIS"]
        );
        assert!(dataset.list_tests("1", "1", "buffer 99").is_empty());
    }

    #[test]
    fn lists_image_categories() {
        let dataset = fixture();
        assert_eq!(
            dataset.list_image_categories("1", "1", "buffer 1"),
            vec!["A549", "HEK", "SK"]
        );
        assert!(dataset.list_image_categories("1", "1", "buffer 2").is_empty());
    }

    #[test]
    fn get_record_is_repeatable() {
        let dataset = fixture();
        let first = dataset.get_record("1", "1", "buffer 1", "DLS").cloned();
        let second = dataset.get_record("1", "1", "buffer 1", "DLS").cloned();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(dataset.get_record("1", "1", "buffer 1", "XRD").is_none());
        assert!(dataset.get_record("3", "1", "buffer 1", "DLS").is_none());
    }

    #[test]
    fn resolves_file_references() {
        let plain = json!({"file": "a.png"});
        let nested = json!({"file": {"path": "b.png"}});
        let null = json!({"file": null});
        let missing = json!({"c_avg": 1.0});
        assert_eq!(resolve_file_reference(plain.as_object().unwrap()), Some("a.png"));
        assert_eq!(resolve_file_reference(nested.as_object().unwrap()), Some("b.png"));
        assert_eq!(resolve_file_reference(null.as_object().unwrap()), None);
        assert_eq!(resolve_file_reference(missing.as_object().unwrap()), None);
    }

    #[test]
    fn resolves_image_paths_one_level_deeper() {
        let dataset = fixture();
        assert_eq!(
            dataset.resolve_image_path("1", "1", "buffer 1", "SK"),
            Some("images/batch1/week1/cells_sk.png")
        );
        assert_eq!(
            dataset.resolve_image_path("1", "1", "buffer 1", "HEK"),
            Some("images/batch1/week1/cells_hek.png")
        );
        assert_eq!(dataset.resolve_image_path("1", "1", "buffer 1", "A549"), None);
        assert_eq!(dataset.resolve_image_path("1", "2", "buffer 1", "SK"), None);
    }

    #[test]
    fn tracks_values_over_weeks() {
        let dataset = fixture();
        let points = dataset.track_over_weeks("1", "buffer 1", "UVVIS", "c_avg");
        assert_eq!(
            points,
            vec![
                TrendPoint { week: 1, value: 100.0 },
                TrendPoint { week: 2, value: 100.5 },
                TrendPoint { week: 10, value: 80.0 },
            ]
        );
    }

    #[test]
    fn tracking_drops_null_and_absent_values() {
        let dataset = fixture();
        let points = dataset.track_over_weeks("1", "buffer 1", "UVVIS", "perc_quality");
        let weeks: Vec<_> = points.iter().map(|p| p.week).collect();
        assert_eq!(weeks, vec![1, 10]);
        assert!(points.len() <= dataset.list_weeks("1").len());

        let elisa = dataset.track_over_weeks("1", "buffer 1", "ELISA", "positive");
        assert_eq!(elisa.len(), 1);
        assert!(dataset
            .track_over_weeks("9", "buffer 1", "UVVIS", "c_avg")
            .is_empty());
    }

    #[test]
    fn compares_across_buffers() {
        let dataset = fixture();
        let points = dataset.compare_across_buffers("1", "1", "UVVIS", "c_avg");
        assert_eq!(
            points,
            vec![
                ComparisonPoint {
                    buffer: "buffer 1".into(),
                    value: 100.0
                },
                ComparisonPoint {
                    buffer: "buffer 2".into(),
                    value: 120.0
                },
            ]
        );
    }

    #[test]
    fn numeric_strings_count_as_values() {
        let dataset = fixture();
        assert_eq!(
            dataset.field_value("1", "1", "buffer 2", "UVVIS", "c_peak"),
            Some(2.6e9)
        );
        assert_eq!(numeric_value(&json!("n/a")), None);
        assert_eq!(numeric_value(&json!(true)), None);
    }

    #[test]
    fn display_fields_skip_file_and_attach_units() {
        let dataset = fixture();
        let record = dataset.get_record("1", "1", "buffer 1", "DLS").unwrap();
        let fields = display_fields(record, "DLS");
        let keys: Vec<_> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["PolyDis", "Z-AVG"]);
        assert_eq!(fields[1].unit, "nm");
        assert_eq!(fields[1].label, Some("Z-average"));
        assert_eq!(fields[0].display, "0.12");

        let uvvis = dataset.get_record("1", "1", "buffer 1", "UVVIS").unwrap();
        let peak = display_fields(uvvis, "UVVIS")
            .into_iter()
            .find(|f| f.key == "c_peak")
            .unwrap();
        assert_eq!(peak.display, "2.10e9 particles/mL");
    }
}
