use std::{cell::RefCell, rc::Rc, sync::Arc, time::Duration};

use stream_player_core::{
    AnalyzerConfig, AppConfig, AudioService, GestureConfig, GestureEvent, InputTarget, KeyCode,
    KeyPress, KeyboardShortcuts, MediaAction, MediaPlaybackState, MediaSessionBridge, MemoryStore,
    OutputEvent, RecordingSurface, ServiceSlot, SessionManager, SimulatedOutput, SnapshotStore,
    SpectrumVisualizer, SwipeRecognizer, TeardownReason, Track, Transport,
};

fn track(id: u64, title: &str) -> Track {
    Track {
        url: format!("https://soundcloud.com/band/{title}"),
        artist: "Band".to_string(),
        title: title.to_string(),
        duration: 120_000,
        artwork_url: None,
        id,
        playback_count: Some(10),
        likes_count: None,
    }
}

struct App {
    slot: ServiceSlot,
    output: SimulatedOutput,
    store: Arc<dyn SnapshotStore>,
    config: AppConfig,
}

impl App {
    fn new() -> Self {
        Self {
            slot: ServiceSlot::new(),
            output: SimulatedOutput::new(),
            store: Arc::new(MemoryStore::new()),
            config: AppConfig::default(),
        }
    }

    /// What a view does when it mounts.
    fn enter_view(&self) -> SessionManager {
        let output = self.output.clone();
        let service = self
            .slot
            .attach_or_create(|| AudioService::new(output))
            .unwrap();
        SessionManager::activate(service, Arc::clone(&self.store), &self.config).unwrap()
    }

    /// Pumps simulated playback time through the session.
    fn play_for(&self, session: &mut SessionManager, seconds: f64) {
        for event in self.output.advance(seconds) {
            session.handle_output_event(event).unwrap();
        }
    }
}

#[test]
fn wrap_around_scenarios() {
    let app = App::new();
    let mut session = app.enter_view();
    let (a, b, c) = (track(1, "a"), track(2, "b"), track(3, "c"));
    session.set_playlist(vec![a.clone(), b, c.clone()]);

    session.load_track(c).unwrap();
    session.next().unwrap();
    assert_eq!(session.state().track(), Some(&a));

    session.previous().unwrap();
    assert_eq!(session.state().track().unwrap().id, 3);
}

#[test]
fn natural_end_advances_then_stops_at_the_last_track() {
    let app = App::new();
    let mut session = app.enter_view();
    let a = track(1, "a");
    let b = track(2, "b");
    app.output.set_duration(a.stream_locator(&app.config.api.base_url), 3.0);
    app.output.set_duration(b.stream_locator(&app.config.api.base_url), 3.0);
    session.set_playlist(vec![a.clone(), b]);

    session.load_track(a).unwrap();
    app.play_for(&mut session, 5.0);
    assert_eq!(session.state().track().unwrap().id, 2);
    assert!(session.state().is_playing());

    app.play_for(&mut session, 5.0);
    assert_eq!(session.state().track().unwrap().id, 2);
    assert!(!session.state().is_playing());
    assert_eq!(session.state().position(), 0.0);
}

#[test]
fn double_selection_does_not_restart_audio() {
    let app = App::new();
    let mut session = app.enter_view();
    let a = track(1, "a");

    session.load_track(a.clone()).unwrap();
    app.play_for(&mut session, 8.0);
    session.load_track(a).unwrap();

    assert_eq!(app.output.loads(), 1);
    assert_eq!(session.state().position(), 8.0);
}

#[test]
fn navigation_keeps_one_output_and_one_graph() {
    let app = App::new();

    let mut first = app.enter_view();
    let service = Arc::clone(first.service());
    let mut visualizer = SpectrumVisualizer::new(Arc::clone(&service), AnalyzerConfig::default());
    first.load_track(track(1, "a")).unwrap();
    app.play_for(&mut first, 20.0);
    visualizer.tick(true);
    visualizer.teardown(TeardownReason::Navigation);
    drop(first);

    let second = app.enter_view();
    assert!(Arc::ptr_eq(second.service(), &service));
    assert!(service.has_analyser().unwrap());
    assert_eq!(app.output.loads(), 1);
    assert_eq!(second.state().position(), 20.0);
    assert!(second.state().is_playing());

    app.slot.shutdown().unwrap();
    assert!(!service.has_analyser().unwrap());
    assert_eq!(app.output.play_calls(), 1);
}

#[test]
fn media_controls_and_keyboard_share_the_transport() {
    let app = App::new();
    let mut session = app.enter_view();
    let mut surface = RecordingSurface::default();
    let mut bridge = MediaSessionBridge::new();
    bridge.register(&mut surface);
    let mut shortcuts = KeyboardShortcuts::new();
    shortcuts.enable();

    session.set_playlist(vec![track(1, "a"), track(2, "b")]);
    session.load_track(track(1, "a")).unwrap();
    bridge.publish(&session.take_changes(), session.state(), &mut surface);
    assert_eq!(surface.metadata.as_ref().unwrap().title, "a");

    let command = shortcuts
        .handle(&KeyPress::new(KeyCode::ArrowRight).with_shift())
        .unwrap();
    session.dispatch(command).unwrap();
    bridge.publish(&session.take_changes(), session.state(), &mut surface);
    assert_eq!(surface.metadata.as_ref().unwrap().title, "b");

    let command = bridge.command_for(MediaAction::Pause).unwrap();
    session.dispatch(command).unwrap();
    bridge.publish(&session.take_changes(), session.state(), &mut surface);
    assert_eq!(surface.playback_state, MediaPlaybackState::Paused);
}

#[test]
fn output_events_keep_position_in_range() {
    let app = App::new();
    let mut session = app.enter_view();
    session.load_track(track(1, "a")).unwrap();

    session
        .handle_output_event(OutputEvent::TimeUpdate(500.0))
        .unwrap();
    let state = session.state();
    assert!(state.position() >= 0.0 && state.position() <= state.duration().unwrap());
    assert_eq!(session.transport(), Transport::Playing);
}

#[test]
fn bars_fall_back_to_the_floor_after_pause() {
    let app = App::new();
    let mut session = app.enter_view();
    let service = Arc::clone(session.service());
    let config = AnalyzerConfig::default();
    let mut visualizer = SpectrumVisualizer::new(Arc::clone(&service), config.clone());
    session.load_track(track(1, "a")).unwrap();

    for _ in 0..20 {
        service
            .push_samples(&app.output.render_block(44_100, config.fft_size))
            .unwrap();
        visualizer.tick(session.state().is_playing());
    }
    let loud = visualizer.bars().heights().iter().cloned().fold(0.0, f32::max);
    assert!(loud > 0.0);

    session.toggle_play_pause().unwrap();
    for _ in 0..200 {
        visualizer.tick(session.state().is_playing());
    }
    let frame = visualizer.frame(1000.0);
    assert!(frame.iter().all(|h| *h == config.min_bar_height));
}

#[test]
fn swipes_drive_navigation_intents() {
    let views = Rc::new(RefCell::new(Vec::new()));
    let (left, right) = (Rc::clone(&views), Rc::clone(&views));
    let mut recognizer = SwipeRecognizer::new(GestureConfig::default())
        .on_left(move || left.borrow_mut().push("search"))
        .on_right(move || right.borrow_mut().push("profile"));

    recognizer.handle(GestureEvent::TouchStart {
        x: 300.0,
        y: 100.0,
        target: InputTarget::Element,
    });
    recognizer.handle(GestureEvent::TouchEnd { x: 239.0, y: 140.0 });

    for (i, dx) in [40.0, 40.0, 41.0].into_iter().enumerate() {
        recognizer.handle(GestureEvent::Wheel {
            delta_x: dx,
            delta_y: 2.0,
            ctrl: false,
            target: InputTarget::Element,
            at: Duration::from_millis(16 * i as u64),
        });
    }

    assert_eq!(*views.borrow(), vec!["search", "profile"]);
}
