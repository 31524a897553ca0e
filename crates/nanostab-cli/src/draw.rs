use anyhow::{bail, Result};
use nanostab_lib::plot::{Figure, PlotBackend, Series};
use plotters::prelude::*;
use std::path::PathBuf;

/// Renders figures to a PNG file with plotters.
pub struct PngBackend {
    path: PathBuf,
    size: (u32, u32),
}

impl PngBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: (800, 480),
        }
    }
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let Some((y_min, y_max)) = fig.y_range() else {
            bail!("nothing to plot: the selected series has no data points");
        };
        let pad = ((y_max - y_min).abs() * 0.1)
            .max(y_max.abs() * 0.05)
            .max(1e-12);

        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let caption = fig.title.as_str();

        match fig.series.first() {
            Some(Series::Line(_)) => {
                let (x_min, x_max) = line_x_range(fig);
                let mut chart = ChartBuilder::on(&root)
                    .margin(10)
                    .caption(caption, ("sans-serif", 22))
                    .x_label_area_size(30)
                    .y_label_area_size(60)
                    .build_cartesian_2d(x_min..x_max, (y_min - pad)..(y_max + pad))?;
                chart
                    .configure_mesh()
                    .x_desc(fig.x.label.clone().unwrap_or_default())
                    .y_desc(fig.y.label.clone().unwrap_or_default())
                    .draw()?;
                for series in &fig.series {
                    if let Series::Line(line) = series {
                        let (r, g, b) = line.color.rgb();
                        let color = RGBColor(r, g, b);
                        chart.draw_series(LineSeries::new(
                            line.points.iter().map(|p| (p[0], p[1])),
                            color.stroke_width(line.stroke.max(1)),
                        ))?;
                        chart.draw_series(
                            line.points
                                .iter()
                                .map(|p| Circle::new((p[0], p[1]), 4, color.filled())),
                        )?;
                    }
                }
            }
            Some(Series::Bar(bar)) => {
                let categories = bar.categories.clone();
                let count = categories.len().max(1) as f64;
                let mut chart = ChartBuilder::on(&root)
                    .margin(10)
                    .caption(caption, ("sans-serif", 22))
                    .x_label_area_size(30)
                    .y_label_area_size(60)
                    .build_cartesian_2d(0.0..count, (y_min - pad).min(0.0)..(y_max + pad).max(0.0))?;
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(categories.len().max(1))
                    .x_label_formatter(&|x| {
                        let idx = x.floor() as usize;
                        categories.get(idx).cloned().unwrap_or_default()
                    })
                    .x_desc(fig.x.label.clone().unwrap_or_default())
                    .y_desc(fig.y.label.clone().unwrap_or_default())
                    .draw()?;
                let (r, g, b) = bar.color.rgb();
                let color = RGBColor(r, g, b);
                chart.draw_series(bar.values.iter().enumerate().map(|(idx, value)| {
                    let left = idx as f64 + 0.15;
                    let right = idx as f64 + 0.85;
                    Rectangle::new([(left, 0.0), (right, *value)], color.filled())
                }))?;
            }
            None => bail!("figure has no series"),
        }
        root.present()?;
        Ok(())
    }
}

fn line_x_range(fig: &Figure) -> (f64, f64) {
    let xs = fig.series.iter().flat_map(|series| match series {
        Series::Line(line) => line.points.iter().map(|p| p[0]).collect::<Vec<_>>(),
        Series::Bar(_) => Vec::new(),
    });
    let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    }
}
