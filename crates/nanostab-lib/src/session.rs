use crate::dataset::{Dataset, Record};
use crate::plot::{figure_from_comparison, figure_from_trend, Figure};
use crate::query::{ComparisonPoint, TrendPoint};
use crate::schema::{find_parameter, test_parameter_schema, Parameter};
use crate::selection::Selection;
use crate::trend::{change_stats_from_points, ChangeStats};
use log::debug;
use serde::Serialize;

/// Derived data a consumer asks the session to bring up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Parameter over weeks for the selected batch and buffer, with stats.
    Trend,
    /// Parameter across buffers for the selected batch and week.
    Comparison,
}

#[derive(Default)]
struct DirtyFlags {
    trend: bool,
    stats: bool,
    trend_figure: bool,
    comparison: bool,
    comparison_figure: bool,
}

impl DirtyFlags {
    fn all() -> Self {
        Self {
            trend: true,
            stats: true,
            trend_figure: true,
            comparison: true,
            comparison_figure: true,
        }
    }

    fn mark_trend(&mut self) {
        self.trend = true;
        self.stats = true;
        self.trend_figure = true;
    }

    fn mark_comparison(&mut self) {
        self.comparison = true;
        self.comparison_figure = true;
    }

    fn mark_all(&mut self) {
        *self = Self::all();
    }
}

#[derive(Default)]
struct Snapshot {
    trend: Vec<TrendPoint>,
    stats: Option<ChangeStats>,
    trend_figure: Option<Figure>,
    comparison: Vec<ComparisonPoint>,
    comparison_figure: Option<Figure>,
}

/// Serializable summary of the trend view.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub selection: Selection,
    pub parameter: Option<Parameter>,
    pub points: Vec<TrendPoint>,
    pub stats: ChangeStats,
}

/// Dataset plus the user's current selection.
///
/// Derived series are recomputed lazily by [`Session::prepare`] after any
/// change that affects them, so readers never see a view computed for an
/// older selection.
pub struct Session {
    dataset: Dataset,
    selection: Selection,
    parameter: Option<String>,
    snapshot: Snapshot,
    dirty: DirtyFlags,
}

impl Session {
    pub fn new(dataset: Dataset) -> Self {
        Self::with_selection(dataset, Selection::default())
    }

    pub fn with_selection(dataset: Dataset, selection: Selection) -> Self {
        let mut session = Self {
            dataset,
            selection,
            parameter: None,
            snapshot: Snapshot::default(),
            dirty: DirtyFlags::all(),
        };
        session.reconcile_parameter();
        session
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.dirty.mark_all();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_batch(&mut self, batch: impl Into<String>) {
        let batch = batch.into();
        if batch != self.selection.batch {
            self.selection.batch = batch;
            self.dirty.mark_all();
        }
    }

    pub fn set_week(&mut self, week: impl Into<String>) {
        let week = week.into();
        if week != self.selection.week {
            self.selection.week = week;
            self.dirty.mark_comparison();
        }
    }

    pub fn set_buffer(&mut self, buffer: impl Into<String>) {
        let buffer = buffer.into();
        if buffer != self.selection.buffer {
            self.selection.buffer = buffer;
            self.dirty.mark_trend();
        }
    }

    pub fn set_test(&mut self, test: impl Into<String>) {
        let test = test.into();
        if test != self.selection.test {
            self.selection.test = test;
            self.reconcile_parameter();
            self.dirty.mark_all();
        }
    }

    /// Track `key` from now on. Keys outside the test's schema are accepted;
    /// they simply yield empty series.
    pub fn set_parameter(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.parameter.as_deref() != Some(key.as_str()) {
            self.parameter = Some(key);
            self.dirty.mark_all();
        }
    }

    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Parameters offered for the selected test.
    pub fn parameters(&self) -> &'static [Parameter] {
        test_parameter_schema(&self.selection.test)
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.selection.record(&self.dataset)
    }

    // Keep the tracked parameter valid for the selected test, falling back
    // to the first one its schema lists.
    fn reconcile_parameter(&mut self) {
        let schema = self.parameters();
        let valid = self
            .parameter
            .as_deref()
            .is_some_and(|key| schema.iter().any(|p| p.key == key));
        if !valid {
            self.parameter = schema.first().map(|p| p.key.to_string());
            debug!(
                "parameter for test {} reset to {:?}",
                self.selection.test, self.parameter
            );
        }
    }

    pub fn prepare(&mut self, view: View) {
        match view {
            View::Trend => {
                self.ensure_trend();
                self.ensure_stats();
                self.ensure_trend_figure();
            }
            View::Comparison => {
                self.ensure_comparison();
                self.ensure_comparison_figure();
            }
        }
    }

    pub fn trend(&self) -> &[TrendPoint] {
        &self.snapshot.trend
    }

    pub fn change_stats(&self) -> Option<&ChangeStats> {
        self.snapshot.stats.as_ref()
    }

    pub fn trend_figure(&self) -> Option<&Figure> {
        self.snapshot.trend_figure.as_ref()
    }

    pub fn comparison(&self) -> &[ComparisonPoint] {
        &self.snapshot.comparison
    }

    pub fn comparison_figure(&self) -> Option<&Figure> {
        self.snapshot.comparison_figure.as_ref()
    }

    pub fn trend_report(&mut self) -> TrendReport {
        self.prepare(View::Trend);
        TrendReport {
            selection: self.selection.clone(),
            parameter: self.current_parameter().copied(),
            points: self.snapshot.trend.clone(),
            stats: self
                .snapshot
                .stats
                .unwrap_or_else(|| change_stats_from_points(&[])),
        }
    }

    fn current_parameter(&self) -> Option<&'static Parameter> {
        let key = self.parameter.as_deref()?;
        find_parameter(&self.selection.test, key)
    }

    fn ensure_trend(&mut self) {
        if !self.dirty.trend {
            return;
        }
        let sel = &self.selection;
        self.snapshot.trend = match self.parameter.as_deref() {
            Some(key) => self
                .dataset
                .track_over_weeks(&sel.batch, &sel.buffer, &sel.test, key),
            None => Vec::new(),
        };
        self.dirty.trend = false;
        self.dirty.stats = true;
        self.dirty.trend_figure = true;
    }

    fn ensure_stats(&mut self) {
        if !self.dirty.stats {
            return;
        }
        self.snapshot.stats = Some(change_stats_from_points(&self.snapshot.trend));
        self.dirty.stats = false;
    }

    fn ensure_trend_figure(&mut self) {
        if !self.dirty.trend_figure {
            return;
        }
        let figure = match self.current_parameter() {
            Some(param) if !self.snapshot.trend.is_empty() => Some(figure_from_trend(
                &self.snapshot.trend,
                param,
                &self.selection.batch,
                &self.selection.buffer,
            )),
            _ => None,
        };
        self.snapshot.trend_figure = figure;
        self.dirty.trend_figure = false;
    }

    fn ensure_comparison(&mut self) {
        if !self.dirty.comparison {
            return;
        }
        let sel = &self.selection;
        self.snapshot.comparison = match self.parameter.as_deref() {
            Some(key) => self
                .dataset
                .compare_across_buffers(&sel.batch, &sel.week, &sel.test, key),
            None => Vec::new(),
        };
        self.dirty.comparison = false;
        self.dirty.comparison_figure = true;
    }

    fn ensure_comparison_figure(&mut self) {
        if !self.dirty.comparison_figure {
            return;
        }
        let figure = match self.current_parameter() {
            Some(param) if !self.snapshot.comparison.is_empty() => Some(figure_from_comparison(
                &self.snapshot.comparison,
                param,
                &self.selection.week,
            )),
            _ => None,
        };
        self.snapshot.comparison_figure = figure;
        self.dirty.comparison_figure = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use crate::trend::Trend;

    #[test]
    fn defaults_to_first_parameter_of_selected_test() {
        let session = Session::new(fixture());
        assert_eq!(session.selection(), &Selection::default());
        assert_eq!(session.parameter(), Some("c_avg"));
        assert_eq!(session.parameters().len(), 3);
    }

    #[test]
    fn changing_test_resets_foreign_parameter() {
        let mut session = Session::new(fixture());
        session.set_test("DLS");
        assert_eq!(session.parameter(), Some("Z-AVG"));
        session.set_test("Cellules");
        assert_eq!(session.parameter(), None);
    }

    #[test]
    fn prepared_trend_follows_selection_changes() {
        let mut session = Session::new(fixture());
        session.prepare(View::Trend);
        assert_eq!(session.trend().len(), 3);
        assert_eq!(
            session.change_stats().map(|s| s.trend),
            Some(Trend::Decrease)
        );
        assert!(session.trend_figure().is_some());

        session.set_buffer("buffer 2");
        session.prepare(View::Trend);
        let values: Vec<_> = session.trend().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![120.0, 115.0, 110.0]);

        session.set_buffer("buffer 404");
        session.prepare(View::Trend);
        assert!(session.trend().is_empty());
        assert!(session.trend_figure().is_none());
        assert_eq!(session.change_stats().map(|s| s.trend), Some(Trend::Stable));
    }

    #[test]
    fn week_change_only_refreshes_comparison() {
        let mut session = Session::new(fixture());
        session.prepare(View::Comparison);
        assert_eq!(session.comparison().len(), 2);

        session.set_week("2");
        session.prepare(View::Comparison);
        let buffers: Vec<_> = session
            .comparison()
            .iter()
            .map(|p| p.buffer.as_str())
            .collect();
        assert_eq!(buffers, vec!["buffer 1", "buffer 2"]);
        assert_eq!(session.comparison()[1].value, 115.0);
        assert!(session.comparison_figure().is_some());
    }

    #[test]
    fn trend_report_carries_parameter_schema() {
        let mut session = Session::new(fixture());
        session.set_test("DLS");
        session.set_parameter("PolyDis");
        let report = session.trend_report();
        assert_eq!(report.parameter.map(|p| p.key), Some("PolyDis"));
        assert_eq!(report.points.len(), 3);
        assert_eq!(report.stats.initial_value, Some(0.12));
    }

    #[test]
    fn selected_record_reads_current_coordinate() {
        let mut session = Session::new(fixture());
        session.set_test("Cellules");
        let record = session.selected_record().unwrap();
        assert!(record.contains_key("SK"));
    }
}
