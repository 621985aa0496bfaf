//! Raster charts encoded as base64 PNG
//!
//! Charts are drawn without any text so no system font is needed.

use crate::error::{InsightError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::prelude::*;

const MARGIN: i32 = 24;
const SERIES: RGBColor = RGBColor(31, 119, 180);
const ACCENT: RGBColor = RGBColor(214, 39, 40);
const AXIS: RGBColor = RGBColor(64, 64, 64);

/// Equal-width bins over the finite values
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` buckets; the last bucket is closed on the right
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(InsightError::ValidationError("histogram needs at least one bin".to_string()));
        }
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (lo, hi) = bounds(finite.iter().copied())
            .ok_or_else(|| InsightError::ComputationError("no finite values to bin".to_string()))?;
        let (lo, hi) = widen(lo, hi);
        let width = (hi - lo) / bins as f64;

        let mut counts = vec![0usize; bins];
        for v in finite {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        Ok(Self { edges, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Renders small diagnostic charts
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// Linear map from data space to pixel space
struct Frame {
    x: (f64, f64),
    y: (f64, f64),
    width: i32,
    height: i32,
}

impl Frame {
    fn new(x: (f64, f64), y: (f64, f64), width: u32, height: u32) -> Self {
        Self { x: widen(x.0, x.1), y: widen(y.0, y.1), width: width as i32, height: height as i32 }
    }

    fn px(&self, (x, y): (f64, f64)) -> (i32, i32) {
        let plot_w = (self.width - 2 * MARGIN) as f64;
        let plot_h = (self.height - 2 * MARGIN) as f64;
        let fx = (x - self.x.0) / (self.x.1 - self.x.0);
        let fy = (y - self.y.0) / (self.y.1 - self.y.0);
        (MARGIN + (fx * plot_w).round() as i32, self.height - MARGIN - (fy * plot_h).round() as i32)
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width.max(2 * MARGIN as u32 + 16), height: height.max(2 * MARGIN as u32 + 16) }
    }

    /// Polyline through the points in the given order
    pub fn line(&self, points: &[(f64, f64)]) -> Result<String> {
        self.lines(&[points.to_vec()])
    }

    /// Several polylines sharing one frame; colors alternate per series
    pub fn lines(&self, series: &[Vec<(f64, f64)>]) -> Result<String> {
        let series = series.iter().map(|s| finite_points(s)).collect::<Result<Vec<_>>>()?;
        let all: Vec<(f64, f64)> = series.iter().flatten().copied().collect();
        if all.is_empty() {
            return Err(InsightError::RenderError("no series to draw".to_string()));
        }
        let frame = self.frame_for(&all, false);
        self.render(|area| {
            draw_axes(area, &frame)?;
            for (i, points) in series.iter().enumerate() {
                let color = if i % 2 == 0 { SERIES } else { ACCENT };
                let path: Vec<(i32, i32)> = points.iter().map(|&p| frame.px(p)).collect();
                area.draw(&PathElement::new(path.clone(), color.stroke_width(2)))?;
                for p in path {
                    area.draw(&Circle::new(p, 4, color.filled()))?;
                }
            }
            Ok(())
        })
    }

    /// Scatter plot, optionally with an identity line (y = x) or a
    /// horizontal zero line
    pub fn scatter(&self, points: &[(f64, f64)], identity: bool, zero_line: bool) -> Result<String> {
        let points = finite_points(points)?;
        let frame = self.frame_for(&points, identity);
        self.render(|area| {
            draw_axes(area, &frame)?;
            if identity {
                let lo = frame.x.0.min(frame.y.0);
                let hi = frame.x.1.max(frame.y.1);
                area.draw(&PathElement::new(vec![frame.px((lo, lo)), frame.px((hi, hi))], ACCENT.stroke_width(2)))?;
            }
            if zero_line && frame.y.0 <= 0.0 && frame.y.1 >= 0.0 {
                area.draw(&PathElement::new(
                    vec![frame.px((frame.x.0, 0.0)), frame.px((frame.x.1, 0.0))],
                    ACCENT.stroke_width(1),
                ))?;
            }
            for &p in &points {
                area.draw(&Circle::new(frame.px(p), 3, SERIES.mix(0.7).filled()))?;
            }
            Ok(())
        })
    }

    /// Vertical bars, one per value, in the given order
    pub fn bar(&self, values: &[f64]) -> Result<String> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return Err(InsightError::RenderError("bar chart needs finite values".to_string()));
        }
        let y_lo = values.iter().copied().fold(0.0f64, f64::min);
        let y_hi = values.iter().copied().fold(0.0f64, f64::max);
        let frame = Frame::new((0.0, values.len() as f64), (y_lo, y_hi), self.width, self.height);
        self.render(|area| {
            draw_axes(area, &frame)?;
            for (i, &v) in values.iter().enumerate() {
                let left = frame.px((i as f64 + 0.1, 0.0));
                let right = frame.px((i as f64 + 0.9, v));
                area.draw(&Rectangle::new([left, right], SERIES.filled()))?;
            }
            Ok(())
        })
    }

    /// Histogram bars spanning their bin edges
    pub fn histogram(&self, hist: &Histogram) -> Result<String> {
        let (Some(&lo), Some(&hi)) = (hist.edges.first(), hist.edges.last()) else {
            return Err(InsightError::RenderError("histogram has no bins".to_string()));
        };
        let top = hist.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
        let frame = Frame::new((lo, hi), (0.0, top), self.width, self.height);
        self.render(|area| {
            draw_axes(area, &frame)?;
            for (i, &count) in hist.counts.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let a = frame.px((hist.edges[i], 0.0));
                let b = frame.px((hist.edges[i + 1], count as f64));
                area.draw(&Rectangle::new([a, b], SERIES.filled()))?;
                area.draw(&Rectangle::new([a, b], WHITE.stroke_width(1)))?;
            }
            Ok(())
        })
    }

    fn frame_for(&self, points: &[(f64, f64)], square: bool) -> Frame {
        let x = bounds(points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
        let y = bounds(points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
        if square {
            let both = (x.0.min(y.0), x.1.max(y.1));
            Frame::new(both, both, self.width, self.height)
        } else {
            Frame::new(x, y, self.width, self.height)
        }
    }

    /// Draw into an RGB buffer, encode PNG, then base64
    fn render<F>(&self, draw: F) -> Result<String>
    where
        F: FnOnce(&DrawingArea<BitMapBackend, plotters::coord::Shift>) -> Result<()>,
    {
        let (w, h) = (self.width, self.height);
        let mut buf = vec![0u8; (w * h * 3) as usize];
        {
            let area = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
            area.fill(&WHITE).map_err(render_error)?;
            draw(&area)?;
            area.present().map_err(render_error)?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&buf, w, h, ColorType::Rgb8)
            .map_err(|e| InsightError::RenderError(format!("PNG encoding failed: {}", e)))?;
        Ok(STANDARD.encode(png))
    }
}

fn draw_axes(area: &DrawingArea<BitMapBackend, plotters::coord::Shift>, frame: &Frame) -> Result<()> {
    let origin = (MARGIN, frame.height - MARGIN);
    area.draw(&PathElement::new(vec![origin, (frame.width - MARGIN, origin.1)], AXIS.stroke_width(1)))?;
    area.draw(&PathElement::new(vec![origin, (MARGIN, MARGIN)], AXIS.stroke_width(1)))?;
    Ok(())
}

fn render_error<E: std::fmt::Display>(e: E) -> InsightError {
    InsightError::RenderError(e.to_string())
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for InsightError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        render_error(e)
    }
}

fn finite_points(points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
    let finite: Vec<(f64, f64)> = points.iter().copied().filter(|(x, y)| x.is_finite() && y.is_finite()).collect();
    if finite.is_empty() {
        return Err(InsightError::RenderError("no finite points to draw".to_string()));
    }
    Ok(finite)
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Give degenerate ranges a non-zero width
fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi - lo > f64::EPSILON * hi.abs().max(1.0) {
        (lo, hi)
    } else {
        let pad = (lo.abs() * 0.05).max(0.5);
        (lo - pad, hi + pad)
    }
}
