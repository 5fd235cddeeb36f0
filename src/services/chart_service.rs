use std::io::Cursor;

use chrono::{Datelike, Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use thiserror::Error;

use crate::models::{ChartImage, PriceTable};

pub const CHART_WIDTH: u32 = 1400;
pub const CHART_HEIGHT: u32 = 800;
pub const CHART_TITLE: &str = "Historical Stock Prices (Last Year)";
pub const X_DESC: &str = "Date";
pub const Y_DESC: &str = "Closing Price (USD)";

const MARKER_SIZE: i32 = 5;
/// Pixels between a series' last point and its value label
const ANNOTATION_OFFSET: (i32, i32) = (5, 0);
const Y_GRID_LINES: usize = 8;

/// Point marker shapes, assigned by series position modulo the palette size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    TriangleDown,
    TriangleUp,
    TriangleLeft,
    TriangleRight,
    Square,
    Pentagon,
    Diamond,
}

pub const MARKERS: [MarkerShape; 8] = [
    MarkerShape::Circle,
    MarkerShape::TriangleDown,
    MarkerShape::TriangleUp,
    MarkerShape::TriangleLeft,
    MarkerShape::TriangleRight,
    MarkerShape::Square,
    MarkerShape::Pentagon,
    MarkerShape::Diamond,
];

const LINE_COLORS: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

impl MarkerShape {
    /// Marker for the series at `index` in table order
    pub fn for_index(index: usize) -> Self {
        MARKERS[index % MARKERS.len()]
    }

    /// Polygon outline in pixel offsets around the data point.
    /// Circles are drawn natively and have no outline.
    pub fn vertices(self, size: i32) -> Vec<(i32, i32)> {
        let s = size;
        match self {
            MarkerShape::Circle => Vec::new(),
            MarkerShape::TriangleDown => vec![(-s, -s), (s, -s), (0, s)],
            MarkerShape::TriangleUp => vec![(-s, s), (s, s), (0, -s)],
            MarkerShape::TriangleLeft => vec![(s, -s), (s, s), (-s, 0)],
            MarkerShape::TriangleRight => vec![(-s, -s), (-s, s), (s, 0)],
            MarkerShape::Square => vec![(-s, -s), (s, -s), (s, s), (-s, s)],
            MarkerShape::Pentagon => (0..5)
                .map(|i| {
                    let angle = -std::f64::consts::FRAC_PI_2
                        + i as f64 * 2.0 * std::f64::consts::PI / 5.0;
                    (
                        (s as f64 * angle.cos()).round() as i32,
                        (s as f64 * angle.sin()).round() as i32,
                    )
                })
                .collect(),
            MarkerShape::Diamond => vec![(0, -s), (s, 0), (0, s), (-s, 0)],
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("Nothing to render: price table is empty")]
    EmptyTable,
    #[error("{0}")]
    Draw(String),
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// Value label placed next to the most recent point of a series
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub date: NaiveDate,
    pub price: f64,
    pub label: String,
}

/// One line on the chart
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlan {
    pub symbol: String,
    pub marker: MarkerShape,
    pub color: RGBColor,
    pub points: Vec<(NaiveDate, f64)>,
    pub annotation: Annotation,
}

/// Everything needed to draw the chart, computed before touching a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub x_range: (NaiveDate, NaiveDate),
    pub y_range: (f64, f64),
    pub x_grid: Vec<NaiveDate>,
    pub y_grid: Vec<f64>,
    pub series: Vec<SeriesPlan>,
}

/// Lay out lines, markers and annotations for every series in `table`.
///
/// Series keep table order, so marker and colour follow insertion order.
pub fn plan_chart(table: &PriceTable) -> Result<ChartPlan, RenderError> {
    let mut series = Vec::with_capacity(table.len());

    for (idx, price_series) in table.iter().enumerate() {
        let last = match price_series.last() {
            Some(p) => *p,
            None => continue,
        };

        series.push(SeriesPlan {
            symbol: price_series.symbol.clone(),
            marker: MarkerShape::for_index(idx),
            color: LINE_COLORS[idx % LINE_COLORS.len()],
            points: price_series.points.iter().map(|p| (p.date, p.close)).collect(),
            annotation: Annotation {
                date: last.date,
                price: last.close,
                label: format!("{:.2}", last.close),
            },
        });
    }

    if series.is_empty() {
        return Err(RenderError::EmptyTable);
    }

    let all_points = || series.iter().flat_map(|s| s.points.iter());

    // plotters never returns from a non-finite axis
    if let Some(bad) = series
        .iter()
        .find(|s| s.points.iter().any(|p| !p.1.is_finite()))
    {
        return Err(RenderError::Draw(format!(
            "non-finite price in series {}",
            bad.symbol
        )));
    }

    let mut x_min = all_points().map(|p| p.0).min().ok_or(RenderError::EmptyTable)?;
    let mut x_max = all_points().map(|p| p.0).max().ok_or(RenderError::EmptyTable)?;
    if x_min == x_max {
        x_min = x_min - Duration::days(1);
        x_max = x_max + Duration::days(1);
    }
    // leave room for the last-value labels
    x_max = x_max + Duration::days(((x_max - x_min).num_days() / 20).max(1));

    let min_price = all_points().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_price = all_points().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let price_range = (max_price - min_price).max(1e-8);
    let padding = price_range * 0.1;
    let y_min = (min_price - padding).max(0.0);
    let y_max = max_price + padding;

    Ok(ChartPlan {
        x_range: (x_min, x_max),
        y_range: (y_min, y_max),
        x_grid: month_starts(x_min, x_max),
        y_grid: (1..Y_GRID_LINES)
            .map(|i| y_min + (y_max - y_min) * i as f64 / Y_GRID_LINES as f64)
            .collect(),
        series,
    })
}

/// First day of every month strictly inside `(start, end]`
fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());

    loop {
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
        match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) if d <= end => dates.push(d),
            _ => break,
        }
    }

    dates
}

/// Render `table` as a PNG chart held entirely in memory
pub fn render_chart(table: &PriceTable) -> Result<ChartImage, RenderError> {
    let plan = plan_chart(table)?;

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        draw_plan(&root, &plan)?;
        root.present()
            .map_err(|e| RenderError::Draw(format!("Failed to render chart: {}", e)))?;
    }

    encode_png(pixels, CHART_WIDTH, CHART_HEIGHT)
}

fn draw_plan(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    plan: &ChartPlan,
) -> Result<(), RenderError> {
    root.fill(&WHITE)
        .map_err(|e| RenderError::Draw(format!("Failed to fill canvas: {}", e)))?;

    let (x_min, x_max) = plan.x_range;
    let (y_min, y_max) = plan.y_range;

    let mut chart = ChartBuilder::on(root)
        .caption(CHART_TITLE, ("sans-serif", 32.0, FontStyle::Bold).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| RenderError::Draw(format!("Failed to build chart: {}", e)))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(X_DESC)
        .y_desc(Y_DESC)
        .axis_desc_style(("sans-serif", 18.0))
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .y_label_formatter(&|v: &f64| format!("{:.0}", v))
        .draw()
        .map_err(|e| RenderError::Draw(format!("Failed to draw mesh: {}", e)))?;

    let grid_style = BLACK.mix(0.25).stroke_width(1);
    for &date in &plan.x_grid {
        chart
            .draw_series(DashedLineSeries::new(
                vec![(date, y_min), (date, y_max)],
                4,
                4,
                grid_style,
            ))
            .map_err(|e| RenderError::Draw(format!("Failed to draw grid: {}", e)))?;
    }
    for &price in &plan.y_grid {
        chart
            .draw_series(DashedLineSeries::new(
                vec![(x_min, price), (x_max, price)],
                4,
                4,
                grid_style,
            ))
            .map_err(|e| RenderError::Draw(format!("Failed to draw grid: {}", e)))?;
    }

    for series in &plan.series {
        let color = series.color;

        chart
            .draw_series(LineSeries::new(series.points.iter().copied(), color.stroke_width(2)))
            .map_err(|e| RenderError::Draw(format!("Failed to draw line: {}", e)))?
            .label(series.symbol.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        if series.marker == MarkerShape::Circle {
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(|&p| Circle::new(p, MARKER_SIZE, color.filled())),
                )
                .map_err(|e| RenderError::Draw(format!("Failed to draw point: {}", e)))?;
        } else {
            let outline = series.marker.vertices(MARKER_SIZE);
            chart
                .draw_series(series.points.iter().map(|&p| {
                    EmptyElement::at(p) + Polygon::new(outline.clone(), color.filled())
                }))
                .map_err(|e| RenderError::Draw(format!("Failed to draw point: {}", e)))?;
        }

        let note = &series.annotation;
        chart
            .draw_series(std::iter::once(
                EmptyElement::at((note.date, note.price))
                    + Text::new(note.label.clone(), ANNOTATION_OFFSET, ("sans-serif", 14.0)),
            ))
            .map_err(|e| RenderError::Draw(format!("Failed to draw annotation: {}", e)))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 16.0))
        .draw()
        .map_err(|e| RenderError::Draw(format!("Failed to draw legend: {}", e)))?;

    Ok(())
}

fn encode_png(pixels: Vec<u8>, width: u32, height: u32) -> Result<ChartImage, RenderError> {
    let image = image::RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| RenderError::Encode("pixel buffer does not match chart size".to_string()))?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(ChartImage::from_png(png))
}
