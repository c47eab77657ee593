use fovea_common::config::TelemetryConfig;
use fovea_engine::{stats, Rect, RenderPlan};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One line of per-tick telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub seq: u64,
    pub elapsed_ms: f64,
    pub width: u32,
    pub height: u32,
    #[serde(serialize_with = "plan_kind")]
    pub plan: RenderPlan,
    pub region: Option<RegionReport>,
    /// `None` when the frame has no area.
    pub savings_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegionReport {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

fn plan_kind<S: serde::Serializer>(plan: &RenderPlan, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(plan.kind())
}

impl From<Rect> for RegionReport {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            w: r.w,
            h: r.h,
        }
    }
}

impl TickReport {
    pub fn new(seq: u64, elapsed: Duration, resolution: (u32, u32), plan: &RenderPlan) -> Self {
        let (width, height) = resolution;
        Self {
            seq,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            width,
            height,
            plan: *plan,
            region: plan.bbox().and_then(|b| b.rect()).map(RegionReport::from),
            savings_percent: stats::plan_savings(plan, width, height),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Totals {
    pub ticks: u64,
    pub keyframes: u64,
    pub no_change: u64,
    pub foveated: u64,
    pub errors: u64,
    pub elapsed_ms_total: f64,
    savings_sum: f64,
    savings_samples: u64,
}

impl Totals {
    pub fn mean_savings(&self) -> Option<f64> {
        (self.savings_samples > 0).then(|| self.savings_sum / self.savings_samples as f64)
    }

    pub fn mean_elapsed_ms(&self) -> Option<f64> {
        (self.ticks > 0).then(|| self.elapsed_ms_total / self.ticks as f64)
    }
}

/// Observational sink for tick reports. Never feeds back into the engine;
/// write failures are logged and otherwise ignored.
pub struct Telemetry {
    writer: Option<BufWriter<File>>,
    summary_path: Option<PathBuf>,
    summary_every: u64,
    totals: Totals,
}

impl Telemetry {
    pub fn open(config: &TelemetryConfig) -> std::io::Result<Self> {
        let writer = match &config.stats_path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                info!(path = %path.display(), "writing per-tick stats");
                Some(BufWriter::new(file))
            }
            None => None,
        };
        Ok(Self {
            writer,
            summary_path: config.summary_path.clone(),
            summary_every: config.summary_every,
            totals: Totals::default(),
        })
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn record(&mut self, report: &TickReport) {
        let t = &mut self.totals;
        t.ticks += 1;
        t.elapsed_ms_total += report.elapsed_ms;
        match report.plan {
            RenderPlan::Keyframe => t.keyframes += 1,
            RenderPlan::NoChange => t.no_change += 1,
            RenderPlan::Foveated(_) => t.foveated += 1,
        }
        if let Some(s) = report.savings_percent {
            t.savings_sum += s;
            t.savings_samples += 1;
        }

        match (report.region, report.savings_percent) {
            (Some(r), Some(savings)) => debug!(
                seq = report.seq,
                elapsed_ms = format!("{:.2}", report.elapsed_ms),
                resolution = format!("{}x{}", report.width, report.height),
                roi = format!("{}x{}", r.w, r.h),
                savings = format!("{:.1}", savings),
                "foveated tick"
            ),
            _ => debug!(
                seq = report.seq,
                elapsed_ms = format!("{:.2}", report.elapsed_ms),
                resolution = format!("{}x{}", report.width, report.height),
                plan = report.plan.kind(),
                "tick"
            ),
        }

        if let Some(w) = &mut self.writer {
            match serde_json::to_string(report) {
                Ok(line) => {
                    if let Err(e) = writeln!(w, "{line}") {
                        warn!(error = %e, "failed to write tick stats");
                    }
                }
                Err(e) => warn!(error = %e, seq = report.seq, "failed to serialize tick stats"),
            }
        }

        if self.summary_every > 0 && self.totals.ticks % self.summary_every == 0 {
            self.summarize();
        }
    }

    pub fn record_error(&mut self) {
        self.totals.errors += 1;
    }

    pub fn summary_json(&self) -> serde_json::Value {
        let t = &self.totals;
        serde_json::json!({
            "ticks": t.ticks,
            "plans": {
                "keyframe": t.keyframes,
                "no_change": t.no_change,
                "foveated": t.foveated,
            },
            "errors": t.errors,
            "mean_elapsed_ms": t.mean_elapsed_ms().map(|v| (v * 100.0).round() / 100.0),
            "mean_savings_percent": t.mean_savings().map(|v| (v * 10.0).round() / 10.0),
            "updated_at": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
    }

    /// Log the running totals and refresh the summary file.
    pub fn summarize(&mut self) {
        let t = &self.totals;
        info!(
            ticks = t.ticks,
            keyframes = t.keyframes,
            no_change = t.no_change,
            foveated = t.foveated,
            errors = t.errors,
            mean_savings = format!("{:.1}", t.mean_savings().unwrap_or(0.0)),
            "telemetry summary"
        );

        if let Some(w) = &mut self.writer {
            if let Err(e) = w.flush() {
                warn!(error = %e, "failed to flush tick stats");
            }
        }
        if let Some(path) = &self.summary_path {
            if let Err(e) = std::fs::write(path, self.summary_json().to_string()) {
                warn!(error = %e, path = %path.display(), "failed to write summary file");
            }
        }
    }
}
