//! Chart model and renderers.
//!
//! A [`Chart`] is one output document: a heading and one or more panels, each
//! panel a shared timestamp axis with labelled series and optional vertical
//! markers. Renderers turn charts into files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::align::is_all_zero;
use crate::resample::{Aggregation, Resampler};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    /// File stem, e.g. `pg_statviz_localhost_5432_buf`.
    pub name: String,
    /// Heading shown above all panels.
    pub title: String,
    pub panels: Vec<Panel>,
}

impl Chart {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            panels: Vec::new(),
        }
    }

    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// Copy without suppressible all-zero series.
    pub fn visible(&self) -> Chart {
        Chart {
            name: self.name.clone(),
            title: self.title.clone(),
            panels: self
                .panels
                .iter()
                .map(|p| Panel {
                    series: p.series.iter().filter(|s| !s.is_hidden()).cloned().collect(),
                    ..p.clone()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub x: Vec<DateTime<Utc>>,
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl Panel {
    pub fn new(title: impl Into<String>, ylabel: impl Into<String>, x: Vec<DateTime<Utc>>) -> Self {
        Self {
            title: title.into(),
            xlabel: "Time (UTC)".to_string(),
            ylabel: ylabel.into(),
            x,
            series: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        debug_assert_eq!(series.values.len(), self.x.len(), "series {}", series.label);
        self.series.push(series);
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Downsamples every series onto one shared bucket axis, each with its
    /// own aggregation.
    pub fn resampled(self, resampler: &Resampler) -> Panel {
        let Some(layout) = resampler.layout(&self.x) else {
            return self;
        };
        let series = self
            .series
            .into_iter()
            .map(|s| Series {
                values: layout.aggregate(&s.values, s.aggregation),
                ..s
            })
            .collect();
        Panel {
            x: layout.starts,
            series,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub values: Vec<Option<f64>>,
    /// Per-category series are dropped from output when all-zero.
    #[serde(skip)]
    pub suppress_when_zero: bool,
    #[serde(skip)]
    pub aggregation: Aggregation,
}

impl Series {
    pub fn new(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            label: label.into(),
            values,
            suppress_when_zero: false,
            aggregation: Aggregation::Mean,
        }
    }

    /// Per-category series.
    pub fn category(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            suppress_when_zero: true,
            ..Self::new(label, values)
        }
    }

    pub fn aggregated(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.suppress_when_zero && is_all_zero(&self.values)
    }
}

/// Vertical line at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub ts: DateTime<Utc>,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RenderError {
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Encode(e) => write!(f, "encoding error: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

pub trait Renderer {
    /// Writes one chart and returns where it went.
    fn render(&mut self, chart: &Chart) -> Result<PathBuf, RenderError>;
}

/// Writes one pretty-printed JSON document per chart.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    outdir: PathBuf,
}

impl JsonRenderer {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
        }
    }
}

impl Renderer for JsonRenderer {
    fn render(&mut self, chart: &Chart) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.outdir)?;
        let path = self.outdir.join(format!("{}.json", chart.name));
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &chart.visible())?;
        writer.flush()?;
        debug!(path = %path.display(), panels = chart.panels.len(), "chart written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn axis(n: usize) -> Vec<DateTime<Utc>> {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        (0..n).map(|i| t0 + Duration::seconds(10 * i as i64)).collect()
    }

    #[test]
    fn visible_drops_only_suppressible_zero_series() {
        let chart = Chart::new("c", "t").with_panel(
            Panel::new("p", "y", axis(2))
                .with_series(Series::new("Total", vec![Some(0.0), Some(0.0)]))
                .with_series(Series::category("idle", vec![None, Some(0.0)]))
                .with_series(Series::category("busy", vec![None, Some(1.0)])),
        );
        let labels: Vec<_> = chart.visible().panels[0]
            .series
            .iter()
            .map(|s| s.label.clone())
            .collect();
        assert_eq!(labels, vec!["Total", "busy"]);
    }

    #[test]
    fn panel_resampling_uses_series_aggregation() {
        let x = axis(4);
        let panel = Panel::new("p", "y", x)
            .with_series(Series::new("mean", vec![Some(1.0), Some(3.0), Some(5.0), Some(7.0)]))
            .with_series(
                Series::new("sum", vec![Some(1.0), Some(3.0), Some(5.0), Some(7.0)])
                    .aggregated(Aggregation::Sum),
            )
            .resampled(&Resampler::new(2));
        // span 30 s / 2 = 15 s buckets: [0,15) [15,30) [30,45)
        assert_eq!(panel.x.len(), 3);
        assert_eq!(panel.series[0].values, vec![Some(2.0), Some(5.0), Some(7.0)]);
        assert_eq!(panel.series[1].values, vec![Some(4.0), Some(5.0), Some(7.0)]);
    }

    #[test]
    fn json_renderer_writes_nulls_and_rfc3339() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = JsonRenderer::new(dir.path().join("out"));
        let chart = Chart::new("pg_statviz_localhost_5432_wal", "pg_statviz · localhost:5432")
            .with_panel(
                Panel::new("WAL generated", "GB", axis(2))
                    .with_series(Series::new("WAL", vec![None, Some(14.9)])),
            );
        let path = renderer.render(&chart).unwrap();
        assert_eq!(path.file_name().unwrap(), "pg_statviz_localhost_5432_wal.json");

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let panel = &doc["panels"][0];
        assert_eq!(panel["series"][0]["values"][0], serde_json::Value::Null);
        assert_eq!(panel["series"][0]["values"][1], 14.9);
        assert_eq!(panel["x"][0], "2023-11-14T22:13:20Z");
        assert!(panel.get("markers").is_none());
    }
}
