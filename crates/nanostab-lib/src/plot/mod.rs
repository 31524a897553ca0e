use crate::query::{ComparisonPoint, TrendPoint};
use crate::schema::Parameter;
use serde::{Deserialize, Serialize};

/// Axis caption; the range is derived from the data at draw time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

/// Packed `0xRRGGBB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

/// Weekly measurements joined in week order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub color: Color,
    pub stroke: u32,
}

/// One bar per category, drawn in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    pub name: String,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Series {
    Line(LineSeries),
    Bar(BarSeries),
}

/// Backend-neutral chart description built from query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x: Axis::default(),
            y: Axis::default(),
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// (min, max) over every y value, or `None` for an empty figure.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let values = self.series.iter().flat_map(|series| match series {
            Series::Line(line) => line.points.iter().map(|p| p[1]).collect::<Vec<_>>(),
            Series::Bar(bar) => bar.values.clone(),
        });
        values.fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Something that can render a [`Figure`], such as a PNG writer.
pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

const TREND_COLOR: u32 = 0x2C7A7B;
const COMPARISON_COLOR: u32 = 0x4FD1C5;

fn axis_label_with_unit(param: &Parameter) -> String {
    if param.unit.is_empty() {
        param.label.to_string()
    } else {
        format!("{} ({})", param.label, param.unit)
    }
}

/// Line figure of a parameter tracked over weeks.
pub fn figure_from_trend(
    points: &[TrendPoint],
    param: &Parameter,
    batch: &str,
    buffer: &str,
) -> Figure {
    let mut fig = Figure::new(format!(
        "{} for {} - batch {}",
        axis_label_with_unit(param),
        buffer,
        batch
    ));
    fig.x.label = Some("Week".into());
    fig.y.label = Some(param.unit.to_string()).filter(|unit| !unit.is_empty());
    fig.add_series(Series::Line(LineSeries {
        name: param.label.into(),
        points: points.iter().map(|p| [p.week as f64, p.value]).collect(),
        color: Color(TREND_COLOR),
        stroke: 2,
    }));
    fig
}

/// Bar figure of a parameter compared across buffers for one week.
pub fn figure_from_comparison(points: &[ComparisonPoint], param: &Parameter, week: &str) -> Figure {
    let mut fig = Figure::new(format!(
        "{} across buffers (week {})",
        axis_label_with_unit(param),
        week
    ));
    fig.x.label = Some("Buffer".into());
    fig.y.label = Some(param.unit.to_string()).filter(|unit| !unit.is_empty());
    fig.add_series(Series::Bar(BarSeries {
        name: param.label.into(),
        categories: points.iter().map(|p| p.buffer.clone()).collect(),
        values: points.iter().map(|p| p.value).collect(),
        color: Color(COMPARISON_COLOR),
    }));
    fig
}
