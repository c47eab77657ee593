mod analysis;
mod capture;
mod keys;
mod render;
mod telemetry;

use analysis::AnalysisHook;
use capture::{CaptureError, CapturedFrame, FrameSource, ResolutionWatch};
use fovea_common::config::Config;
use fovea_engine::{EngineError, EngineSettings, FrameStateMachine, PixelBuffer, RenderPlan};
use render::{Compositor, RenderError, SharedCompositor};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use telemetry::{Telemetry, TickReport};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fovea.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        pattern = config.capture.pattern,
        fps = config.capture.fps,
        threshold = config.engine.threshold,
        metric = config.engine.metric,
        blur_px = config.engine.blur_px,
        analysis = config.analysis.enabled,
        "starting fovea player"
    );

    // Threshold and metric are checked here, before the first frame.
    let settings = match EngineSettings::from_config(&config.engine) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid engine settings");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config, settings).await {
        error!(error = %e, "player stopped");
        std::process::exit(1);
    }
}

async fn run(config: &Config, settings: EngineSettings) -> Result<(), PlayerError> {
    let source = FrameSource::from_pattern(&config.capture.pattern, config.capture.loop_playback)?;

    if let Some(dir) = &config.render.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let machine = FrameStateMachine::new(settings)?;
    let compositor = Compositor::new(
        machine.settings().blur_px,
        config.render.draw_border,
        config.render.output_dir.clone(),
    );
    let player = Player::new(
        machine,
        compositor,
        config.analysis.enabled.then(|| AnalysisHook::new(&config.analysis)),
        Telemetry::open(&config.telemetry)?,
    );

    let interval = Duration::from_secs_f64(1.0 / config.capture.fps);
    player.run_loop(source, interval).await
}

/// Wires the collaborators around one state machine.
struct Player {
    machine: FrameStateMachine,
    compositor: SharedCompositor,
    analysis: Option<AnalysisHook>,
    telemetry: Telemetry,
    watch: ResolutionWatch,
    in_flight: JoinSet<Result<PathBuf, analysis::AnalysisError>>,
    seq: u64,
}

type PendingFrame = (bool, JoinHandle<Result<CapturedFrame, CaptureError>>);

impl Player {
    fn new(
        machine: FrameStateMachine,
        compositor: Compositor,
        analysis: Option<AnalysisHook>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            machine,
            compositor: compositor.shared(),
            analysis,
            telemetry,
            watch: ResolutionWatch::default(),
            in_flight: JoinSet::new(),
            seq: 0,
        }
    }

    async fn run_loop(mut self, mut source: FrameSource, interval: Duration) -> Result<(), PlayerError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut pending = next_pending(&mut source);
        info!(frames = source.frame_count(), "entering playback loop");

        while let Some((restarted, handle)) = pending.take() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut ctrl_c => {
                    info!("interrupted, stopping playback");
                    break;
                }
            }

            let captured = handle.await?;
            // Start decoding the next frame while this one is processed.
            pending = next_pending(&mut source);

            let captured = match captured {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "failed to capture frame, skipping");
                    self.telemetry.record_error();
                    continue;
                }
            };
            self.tick(captured, restarted).await?;
        }

        self.drain_analysis().await;
        self.telemetry.summarize();
        info!(ticks = self.telemetry.totals().ticks, "playback finished");
        Ok(())
    }

    async fn tick(&mut self, captured: CapturedFrame, restarted: bool) -> Result<(), PlayerError> {
        let CapturedFrame {
            path,
            frame,
            captured_at_ms,
        } = captured;
        self.seq += 1;

        let start = Instant::now();
        let plan = self.plan_for(&frame, restarted)?;
        let resolution = frame.dimensions();

        // The crop is cut before the frame moves to the compositor.
        if let (Some(hook), RenderPlan::Foveated(bbox)) = (self.analysis.as_mut(), &plan) {
            if let Some(request) = hook.maybe_analyze(&frame, bbox, captured_at_ms, Instant::now()) {
                self.in_flight.spawn(request.submit());
            }
        }

        let painted = render::paint(self.compositor.clone(), frame, plan, self.seq).await?;
        let elapsed = start.elapsed();
        debug!(seq = self.seq, path = %path.display(), ?painted, "composited");

        self.telemetry
            .record(&TickReport::new(self.seq, elapsed, resolution, &plan));

        // Reap finished analyses without waiting.
        while let Some(done) = self.in_flight.try_join_next() {
            log_analysis(done);
        }
        Ok(())
    }

    /// Run one frame through the state machine.
    ///
    /// A stream restart or a resolution change resets the machine first, so
    /// the frame becomes the new keyframe. A size mismatch that still reaches
    /// the machine is counted as an error and the frame is resubmitted.
    fn plan_for(&mut self, frame: &PixelBuffer, restarted: bool) -> Result<RenderPlan, PlayerError> {
        if restarted {
            info!("stream restarted");
            self.machine.reset();
        }
        if self.watch.observe(frame.dimensions()) {
            info!(
                width = frame.width(),
                height = frame.height(),
                "resolution changed"
            );
            self.machine.reset();
        }

        match self.machine.process(frame) {
            Ok(plan) => Ok(plan),
            Err(e @ EngineError::DimensionMismatch { .. }) => {
                warn!(error = %e, seq = self.seq, "resubmitting as keyframe");
                self.telemetry.record_error();
                self.machine.reset();
                Ok(self.machine.process(frame)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn drain_analysis(&mut self) {
        while let Some(done) = self.in_flight.join_next().await {
            log_analysis(done);
        }
    }
}

fn next_pending(source: &mut FrameSource) -> Option<PendingFrame> {
    source
        .next_frame()
        .map(|next| (next.restarted, capture::spawn_decode(next.path)))
}

fn log_analysis(
    done: Result<Result<PathBuf, analysis::AnalysisError>, tokio::task::JoinError>,
) {
    match done {
        Ok(Ok(path)) => debug!(path = %path.display(), "region stored for analysis"),
        Ok(Err(e)) => warn!(error = %e, "region analysis failed"),
        Err(e) => warn!(error = %e, "region analysis task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fovea_common::config::TelemetryConfig;
    use fovea_engine::BoundingBox;

    fn machine() -> FrameStateMachine {
        FrameStateMachine::new(EngineSettings::new(30, 0.0).unwrap()).unwrap()
    }

    fn player_with(machine: FrameStateMachine) -> Player {
        Player::new(
            machine,
            Compositor::new(0.0, false, None),
            None,
            Telemetry::open(&TelemetryConfig::default()).unwrap(),
        )
    }

    fn black(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::filled(w, h, [0, 0, 0, 255]).unwrap()
    }

    #[test]
    fn resolution_change_starts_new_keyframe() {
        let mut player = player_with(machine());
        assert_eq!(player.plan_for(&black(4, 4), false).unwrap(), RenderPlan::Keyframe);
        assert_eq!(player.plan_for(&black(8, 8), false).unwrap(), RenderPlan::Keyframe);
        assert_eq!(player.plan_for(&black(8, 8), false).unwrap(), RenderPlan::NoChange);
        assert_eq!(player.telemetry.totals().errors, 0);
    }

    #[test]
    fn mismatch_is_counted_and_resubmitted() {
        // Machine already holds a 4x4 baseline the watch never saw.
        let mut m = machine();
        m.process(&black(4, 4)).unwrap();
        let mut player = player_with(m);

        assert_eq!(player.plan_for(&black(8, 8), false).unwrap(), RenderPlan::Keyframe);
        assert_eq!(player.telemetry.totals().errors, 1);
        assert_eq!(player.machine.baseline().unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn restart_resets_to_keyframe() {
        let mut player = player_with(machine());
        assert_eq!(player.plan_for(&black(4, 4), false).unwrap(), RenderPlan::Keyframe);
        assert_eq!(player.plan_for(&black(4, 4), false).unwrap(), RenderPlan::NoChange);
        assert_eq!(player.plan_for(&black(4, 4), true).unwrap(), RenderPlan::Keyframe);
        assert_eq!(player.telemetry.totals().errors, 0);
    }

    #[test]
    fn changed_pixel_gives_foveated_plan() {
        let mut player = player_with(machine());
        player.plan_for(&black(4, 4), false).unwrap();
        let next = black(4, 4).with_pixel(2, 1, [255, 255, 255, 255]);
        match player.plan_for(&next, false).unwrap() {
            RenderPlan::Foveated(bbox) => assert_eq!(bbox, BoundingBox::new(2, 3, 1, 2)),
            other => panic!("expected foveated plan, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ticks_feed_telemetry() {
        let mut player = player_with(machine());
        for _ in 0..2 {
            let captured = CapturedFrame {
                path: PathBuf::from("frame.png"),
                frame: black(4, 4),
                captured_at_ms: 0,
            };
            player.tick(captured, false).await.unwrap();
        }

        let totals = player.telemetry.totals();
        assert_eq!(totals.ticks, 2);
        assert_eq!(totals.keyframes, 1);
        assert_eq!(totals.no_change, 1);
        assert_eq!(player.compositor.lock().unwrap().canvas().unwrap().dimensions(), (4, 4));
    }
}
