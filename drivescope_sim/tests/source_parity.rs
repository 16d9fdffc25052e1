//! The same pipeline, fed by the synthetic source and by the live source
//! over a scripted platform, has to reach the same conclusions.

use approx::assert_relative_eq;
use drivescope_core::{
    BrakingThresholds, DashboardSession, LiveSensorSource, LiveSourceConfig, SessionConfig,
    SessionUpdate,
};
use drivescope_env::{
    MotionSample, PositionFault, PositionSample, RawMotion, RawOrientation, RawPosition,
    RecordingToneSink, SensorChannel, SensorEvent, SensorSource,
};
use drivescope_sim::{
    DriveModel, OrientationStyle, PlatformScript, SimConfig, SimContext, SimPlatform,
    SyntheticSensorSource,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

type SimSession = DashboardSession<SimContext, RecordingToneSink>;

fn new_session(ctx: &Arc<SimContext>) -> SimSession {
    DashboardSession::new(ctx.clone(), RecordingToneSink::new(), SessionConfig::default())
}

/// Yields until the session has applied `ticks` samples on every channel.
async fn pump_until(session: &mut SimSession, ticks: u64) {
    for _ in 0..100_000 {
        tokio::task::yield_now().await;
        session.drain_pending();
        let stats = session.stats();
        if stats.position_samples >= ticks
            && stats.orientation_samples >= ticks
            && stats.motion_samples >= ticks
        {
            return;
        }
    }
    panic!("session stalled at {:?}", session.stats());
}

async fn run_synthetic(config: &SimConfig) -> SimSession {
    let ctx = SimContext::shared(config.seed);
    let mut session = new_session(&ctx);
    let mut source = SyntheticSensorSource::new(ctx.clone(), config.clone(), ctx.derive_rng(1));

    session.attach(&mut source).await;
    pump_until(&mut session, config.total_ticks()).await;
    session.detach(&mut source);
    session
}

async fn run_live(config: &SimConfig, style: OrientationStyle) -> SimSession {
    let ctx = SimContext::shared(config.seed);
    let mut session = new_session(&ctx);
    let (platform, feeds) = SimPlatform::new(PlatformScript {
        orientation_style: style,
        ..Default::default()
    });
    let mut source = LiveSensorSource::new(Arc::new(platform), LiveSourceConfig::default());
    session.attach(&mut source).await;

    // One tick at a time, so each motion sample meets the speed of its own tick
    let mut model = DriveModel::new(config, ctx.derive_rng(1));
    for tick in 1..=config.total_ticks() {
        assert!(feeds.feed_frame(&model.step(ctx.epoch_millis())));
        pump_until(&mut session, tick).await;
    }
    session.detach(&mut source);
    session
}

#[tokio::test]
async fn test_sources_agree_on_braking() {
    for seed in [1, 2, 3] {
        let config = SimConfig {
            seed,
            duration_secs: 60.0,
            ..Default::default()
        };
        let synthetic = run_synthetic(&config).await;

        for style in [OrientationStyle::W3c, OrientationStyle::Ios] {
            let live = run_live(&config, style).await;

            assert_eq!(
                live.stats().braking_episodes,
                synthetic.stats().braking_episodes,
                "seed {} style {:?}",
                seed,
                style
            );
            assert_eq!(live.state().speed_mps, synthetic.state().speed_mps);
            assert_relative_eq!(live.state().bearing_deg, synthetic.state().bearing_deg, epsilon = 1e-9);
            assert_relative_eq!(live.state().azimuth_deg, synthetic.state().azimuth_deg, epsilon = 1e-9);
            assert_relative_eq!(live.state().latitude, synthetic.state().latitude);
            assert_eq!(live.stats().dropped, 0);
        }
    }
}

#[tokio::test]
async fn test_live_source_travel_aligned_with_facing() {
    let ctx = SimContext::shared(1);
    let mut session = new_session(&ctx);
    let (platform, feeds) = SimPlatform::new(PlatformScript::default());
    let mut source = LiveSensorSource::new(Arc::new(platform), LiveSourceConfig::default());
    session.attach(&mut source).await;

    feeds.raw_position(RawPosition {
        latitude: 52.52,
        longitude: 13.405,
        speed: Some(10.0),
        heading: Some(90.0),
        accuracy: 4.0,
        timestamp_ms: 0,
    });
    feeds.raw_orientation(RawOrientation {
        alpha: Some(270.0),
        ..Default::default()
    });

    loop {
        tokio::task::yield_now().await;
        session.drain_pending();
        if session.stats().orientation_samples == 1 && session.stats().position_samples == 1 {
            break;
        }
    }

    let snap = session.snapshot();
    assert_relative_eq!(snap.velocity_rotation_deg, 0.0);
    assert_relative_eq!(snap.north_rotation_deg, -90.0);
    assert_eq!(snap.speed_kmh, 36.0);
    assert_eq!(snap.cardinal, "E");
    assert_eq!(snap.channels.position, "active");
    assert_eq!(snap.channels.orientation, "active");
    session.detach(&mut source);
}

#[tokio::test]
async fn test_denied_position_leaves_other_channels_running() {
    let ctx = SimContext::shared(1);
    let mut session = new_session(&ctx);
    let (platform, feeds) = SimPlatform::new(PlatformScript {
        denied: vec![SensorChannel::Position],
        linear_acceleration: false,
        ..Default::default()
    });
    let mut source = LiveSensorSource::new(Arc::new(platform), LiveSourceConfig::default());
    let caps = session.attach(&mut source).await;
    assert!(!caps.position_available);
    assert!(caps.motion_available);

    let config = SimConfig::default();
    let mut model = DriveModel::new(&config, ctx.derive_rng(1));
    for _ in 0..30 {
        feeds.feed_frame(&model.step(0));
    }
    for _ in 0..1_000 {
        tokio::task::yield_now().await;
        session.drain_pending();
        if session.stats().motion_samples == 30 {
            break;
        }
    }

    let snap = session.snapshot();
    assert_eq!(snap.channels.position, "denied");
    assert_eq!(snap.channels.motion, "degraded");
    assert_eq!(session.stats().position_samples, 0);
    assert_eq!(session.stats().motion_samples, 30);
    assert!(source.is_running());
    session.detach(&mut source);
    assert!(!source.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_liveness_window_runs_on_wall_clock() {
    let ctx = SimContext::shared(1);
    let mut session = new_session(&ctx);
    let (platform, feeds) = SimPlatform::new(PlatformScript::default());
    let mut source = session.config().live_source(Arc::new(platform));
    session.attach(&mut source).await;

    // Nothing usable: an empty motion event and a provider timeout
    assert!(feeds.raw_motion(RawMotion::default()));
    assert!(feeds.position_fault(PositionFault::Timeout));

    // Drive time racing ahead leaves the window open
    ctx.advance_time(Duration::from_secs(30));
    for _ in 0..10 {
        tokio::task::yield_now().await;
        session.drain_pending();
    }
    let snap = session.snapshot();
    assert_eq!(snap.channels.position, "degraded");
    assert_eq!(snap.channels.orientation, "pending");
    assert_eq!(snap.channels.motion, "pending");

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    session.drain_pending();
    let snap = session.snapshot();
    assert_eq!(snap.channels.orientation, "unavailable");
    assert_eq!(snap.channels.motion, "unavailable");
    assert_eq!(session.stats().motion_samples, 0);
    session.detach(&mut source);
}

fn fix(speed: f64) -> SensorEvent {
    SensorEvent::Position(PositionSample {
        latitude: 0.0,
        longitude: 0.0,
        speed_mps: Some(speed),
        bearing_deg: None,
        accuracy_m: 10.0,
        timestamp_ms: 0,
    })
}

proptest! {
    #[test]
    fn prop_indicator_tracks_instantaneous_condition(
        readings in prop::collection::vec((0.0f64..20.0, -10.0f64..5.0), 1..60)
    ) {
        let ctx = SimContext::shared(0);
        let mut session = new_session(&ctx);
        let thresholds = BrakingThresholds::default();

        for (speed, forward) in readings {
            session.handle_event(fix(speed));
            let update = session.handle_event(SensorEvent::Motion(MotionSample::forward_only(forward)));
            let expected = speed > thresholds.speed_threshold_mps
                && forward < thresholds.brake_threshold_mps2;
            match update {
                SessionUpdate::Snapshot(snap) => prop_assert_eq!(snap.braking_visible, expected),
                SessionUpdate::Dropped(err) => prop_assert!(false, "unexpected drop: {}", err),
            }
        }
        // Audio never unlocked: every episode is suppressed, none fired
        prop_assert_eq!(session.stats().alerts_fired, 0);
        prop_assert_eq!(session.stats().alerts_suppressed, session.stats().braking_episodes);
    }
}
