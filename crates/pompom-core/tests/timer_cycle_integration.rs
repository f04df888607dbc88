//! Integration tests for the work/break cycle.
//!
//! Most tests run on a paused tokio clock: sleeping in the test advances
//! virtual time, and the engine's 50 ms ticker follows it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pompom_core::timer::PhaseState;
use pompom_core::{
    Event, Notification, NotificationKind, Notifier, Phase, Status, TimerEngine, TimerSettings,
};
use tokio::sync::broadcast;

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<NotificationKind>>,
    dismissed: Mutex<usize>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.kind);
    }

    fn dismiss(&self) {
        *self.dismissed.lock().unwrap() += 1;
    }
}

fn engine(settings: TimerSettings) -> (TimerEngine, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TimerEngine::new(settings, notifier.clone()).unwrap();
    (engine, notifier)
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn started(events: &[Event], wanted: Phase) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::PhaseStarted {
                phase,
                duration_secs,
                ..
            } if *phase == wanted => Some(*duration_secs),
            _ => None,
        })
        .collect()
}

fn completed(events: &[Event]) -> Vec<Phase> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::PhaseCompleted { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down_monotonically() {
    let (engine, _) = engine(TimerSettings::default());
    engine.start(1).unwrap();
    assert_eq!(engine.duration_secs(), 60);

    let mut previous = engine.remaining_secs();
    assert_eq!(previous, 60);
    for _ in 0..59 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let now = engine.remaining_secs();
        assert!(now <= previous, "remaining went up: {previous} -> {now}");
        previous = now;
    }
    assert_eq!(previous, 1);

    tokio::time::sleep(Duration::from_millis(1020)).await;
    assert_eq!(engine.subscribe_view().borrow().time_text, "00:00");
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_work_expiry_fires_one_break_transition() {
    let (engine, notifier) = engine(TimerSettings::default());
    let mut events = engine.subscribe_events();

    engine.start(1).unwrap();
    tokio::time::sleep(Duration::from_secs(62)).await;

    let events = drain(&mut events);
    assert_eq!(started(&events, Phase::Break), vec![300]);
    assert_eq!(completed(&events), vec![Phase::Work]);
    assert_eq!(engine.status(), Status::OnBreak);
    assert_eq!(engine.duration_secs(), 300);
    let remaining = engine.remaining_secs();
    assert!((298..=300).contains(&remaining), "remaining {remaining}");
    assert_eq!(*notifier.seen.lock().unwrap(), vec![NotificationKind::BreakStarted]);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_break_expiry_restarts_work_with_last_duration() {
    let settings = TimerSettings {
        work_secs: 25 * 60,
        ..TimerSettings::default()
    };
    let (engine, notifier) = engine(settings);
    let mut events = engine.subscribe_events();

    engine.start(1).unwrap();
    tokio::time::sleep(Duration::from_secs(62)).await;
    tokio::time::sleep(Duration::from_secs(302)).await;

    let events = drain(&mut events);
    assert_eq!(started(&events, Phase::Work), vec![60, 60]);
    assert_eq!(completed(&events), vec![Phase::Work, Phase::Break]);
    assert_eq!(engine.status(), Status::Working);
    assert_eq!(engine.duration_secs(), 60);
    assert_eq!(engine.work_secs(), 60);
    assert_eq!(
        *notifier.seen.lock().unwrap(),
        vec![NotificationKind::BreakStarted, NotificationKind::WorkStarted]
    );
    assert_eq!(*notifier.dismissed.lock().unwrap(), 1);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pause_preserves_remaining_time() {
    let (engine, _) = engine(TimerSettings::default());
    engine.start(25).unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    engine.pause();
    assert_eq!(engine.status(), Status::Paused);
    assert_eq!(engine.remaining_secs(), 1490);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(engine.remaining_secs(), 1490);

    engine.pause();
    assert_eq!(engine.status(), Status::Working);
    assert_eq!(engine.remaining_secs(), 1490);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.remaining_secs(), 1480);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_emit_events() {
    let (engine, _) = engine(TimerSettings::default());
    let mut events = engine.subscribe_events();
    engine.start(25).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    engine.pause();
    tokio::time::sleep(Duration::from_secs(30)).await;
    engine.pause();

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::TimerPaused { remaining_secs: 1490, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::TimerResumed { remaining_secs: 1490, .. })));
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_break() {
    let settings = TimerSettings {
        expiry_hold: Duration::ZERO,
        ..TimerSettings::default()
    };
    let (engine, _) = engine(settings);
    engine.start(1).unwrap();
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(engine.status(), Status::OnBreak);
    assert_eq!(engine.remaining_secs(), 260);

    engine.pause();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(engine.status(), Status::Paused);
    assert_eq!(engine.phase(), Phase::Break);
    assert_eq!(engine.remaining_secs(), 260);

    engine.pause();
    assert_eq!(engine.status(), Status::OnBreak);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_idempotent() {
    let (engine, _) = engine(TimerSettings::default());
    engine.reset();
    engine.reset();
    assert_eq!(engine.status(), Status::Ready);
    assert_eq!(engine.remaining_secs(), engine.duration_secs());

    engine.start(10).unwrap();
    tokio::time::sleep(Duration::from_secs(42)).await;
    engine.pause();
    engine.reset();
    engine.reset();

    assert_eq!(engine.status(), Status::Ready);
    assert!(!engine.is_paused());
    assert_eq!(engine.duration_secs(), 600);
    assert_eq!(engine.remaining_secs(), 600);
    assert_eq!(engine.view().time_text, "10:00");
    assert_eq!(engine.view().progress, 1.0);
    engine.join().await;
    assert_eq!(engine.active_loops(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_loop_within_one_poll_interval() {
    let (engine, _) = engine(TimerSettings::default());
    let mut events = engine.subscribe_events();
    engine.start(1).unwrap();
    tokio::time::sleep(Duration::from_millis(30_025)).await;
    assert_eq!(engine.active_loops(), 1);

    engine.reset();
    let joined = tokio::time::timeout(engine.settings().poll_interval, engine.join()).await;
    assert!(joined.is_ok(), "loop still alive after one poll interval");
    assert_eq!(engine.active_loops(), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    let events = drain(&mut events);
    assert!(completed(&events).is_empty());
    assert!(started(&events, Phase::Break).is_empty());
    assert_eq!(engine.status(), Status::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_reset_while_paused_stops_loop() {
    let (engine, _) = engine(TimerSettings::default());
    engine.start(5).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    engine.pause();
    tokio::time::sleep(Duration::from_secs(3)).await;
    engine.reset();
    engine.join().await;
    assert_eq!(engine.active_loops(), 0);
    assert_eq!(engine.status(), Status::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_start_leaves_ready() {
    let (engine, _) = engine(TimerSettings::default());
    let mut events = engine.subscribe_events();
    assert!(engine.start(0).unwrap_err().is_invalid_duration());
    assert!(engine.start(-5).unwrap_err().is_invalid_duration());
    assert!(engine.start_from_input("twenty").unwrap_err().is_invalid_duration());
    assert_eq!(engine.status(), Status::Ready);
    assert_eq!(engine.remaining_secs(), 1500);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_then_start_keeps_single_loop() {
    let (engine, _) = engine(TimerSettings::default());
    for minutes in 1..=5 {
        engine.start(minutes).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        engine.reset();
    }
    engine.start(3).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(engine.active_loops(), 1);
    assert_eq!(engine.peak_loops(), 1);
    assert_eq!(engine.duration_secs(), 180);
    assert_eq!(engine.remaining_secs(), 179);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_many_cycles_keep_one_loop() {
    let settings = TimerSettings {
        break_secs: 60,
        expiry_hold: Duration::ZERO,
        ..TimerSettings::default()
    };
    let (engine, _) = engine(settings);
    let mut events = engine.subscribe_events();
    engine.start(1).unwrap();

    // Ten full work/break cycles plus a few seconds into the eleventh.
    tokio::time::sleep(Duration::from_secs(10 * 120 + 5)).await;

    let events = drain(&mut events);
    assert_eq!(started(&events, Phase::Break).len(), 10);
    assert_eq!(started(&events, Phase::Work).len(), 11);
    assert_eq!(engine.status(), Status::Working);
    assert_eq!(engine.active_loops(), 1);
    assert_eq!(engine.peak_loops(), 1);
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_never_double_launch() {
    let settings = TimerSettings {
        poll_interval: Duration::from_millis(1),
        expiry_hold: Duration::ZERO,
        ..TimerSettings::default()
    };
    let (engine, _) = engine(settings);
    let engine = Arc::new(engine);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let engine = engine.clone();
            tokio::task::spawn_blocking(move || {
                for i in 0..300 {
                    match (i + worker) % 4 {
                        0 => {
                            let _ = engine.start(1 + (i % 3) as i64);
                        }
                        1 | 2 => engine.pause(),
                        _ => engine.reset(),
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.await.unwrap();
    }

    engine.shutdown().await;
    assert_eq!(engine.active_loops(), 0);
    assert!(engine.peak_loops() <= 1, "peak loops {}", engine.peak_loops());
    assert_eq!(engine.status(), Status::Ready);
}

#[test]
fn test_phase_state_is_usable_without_engine() {
    let now = tokio::time::Instant::now();
    let mut state = PhaseState::new(60, 300);
    state.begin_work(now, 120);
    state.pause(now + Duration::from_secs(20));
    state.resume(now + Duration::from_secs(50));
    assert_eq!(
        state.remaining(now + Duration::from_secs(50)),
        Duration::from_secs(100)
    );
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn start_sets_duration_to_minutes_times_sixty(minutes in 1i64..=10_000) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            rt.block_on(async {
                let (engine, _) = engine(TimerSettings::default());
                engine.start(minutes).unwrap();
                prop_assert_eq!(engine.duration_secs(), minutes as u64 * 60);
                prop_assert_eq!(engine.remaining_secs(), minutes as u64 * 60);
                engine.shutdown().await;
                Ok(())
            })?;
        }

        #[test]
        fn non_positive_minutes_are_rejected(minutes in i64::MIN..=0) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            rt.block_on(async {
                let (engine, _) = engine(TimerSettings::default());
                prop_assert!(engine.start(minutes).is_err());
                prop_assert_eq!(engine.status(), Status::Ready);
                Ok(())
            })?;
        }
    }
}
