//! Integration tests for the RaceService → lights / display / events
//! pipeline.  No beam traffic here; see `race_scenario_tests` for that.

use flyball_ets::app::commands::RaceCommand;
use flyball_ets::app::events::RaceEvent;
use flyball_ets::app::ports::{FieldId, FieldView};
use flyball_ets::app::service::RaceService;
use flyball_ets::drivers::display::DisplayController;
use flyball_ets::events::{Level, Sensor, TRIGGER_QUEUE_CAP, TriggerQueue};
use flyball_ets::race::RaceState;

use crate::mock_hw::{MockClock, RecordingSink, default_config, light_levels, mock_lights};

const BOOT_US: u64 = 1_000_000;

#[test]
fn start_stop_button_walks_the_whole_lifecycle() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();
    let mut display = DisplayController::new(500);

    // Idle → STARTING: red comes on with the first pass.
    svc.handle_command(RaceCommand::StartStop, &mut lights, &mut sink);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Starting);
    assert_eq!(light_levels(&pins), [true, false, false, false]);

    // Green at the zero-point → RACING.
    clock.advance_ms(3000);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Racing);
    assert_eq!(light_levels(&pins), [false, false, false, true]);

    // RACING → STOP: lights go dark, race archived.
    clock.advance_ms(2500);
    svc.handle_command(RaceCommand::StartStop, &mut lights, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Stop);
    assert_eq!(light_levels(&pins), [false; 4]);
    assert_eq!(svc.race().race_time_ms(), 2500);

    // Finished → reset, then → a new start.
    svc.handle_command(RaceCommand::StartStop, &mut lights, &mut sink);
    assert_eq!(svc.race().race_id(), 1);
    assert_eq!(svc.race().race_time_ms(), 0);
    svc.handle_command(RaceCommand::StartStop, &mut lights, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Starting);

    let states: Vec<(RaceState, RaceState)> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            RaceEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            (RaceState::Stop, RaceState::Starting),
            (RaceState::Starting, RaceState::Racing),
            (RaceState::Racing, RaceState::Stop),
            (RaceState::Stop, RaceState::Starting),
        ]
    );
}

#[test]
fn stop_twice_archives_once() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();

    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    clock.advance_ms(4000);
    svc.handle_command(RaceCommand::Stop, &mut lights, &mut sink);
    clock.advance_ms(4000);
    svc.handle_command(RaceCommand::Stop, &mut lights, &mut sink);

    assert_eq!(svc.race().history().len(), 1);
    assert_eq!(sink.count(|e| matches!(e, RaceEvent::RaceArchived(_))), 1);
    // Stopped one second after the zero-point.
    assert_eq!(svc.race().race_time_ms(), 1000);
}

#[test]
fn start_on_finished_race_needs_reset_first() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();

    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    svc.handle_command(RaceCommand::Stop, &mut lights, &mut sink);
    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Stop);

    svc.handle_command(RaceCommand::Reset, &mut lights, &mut sink);
    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Starting);
    assert_eq!(svc.race().race_id(), 1);
}

#[test]
fn reset_is_rejected_while_racing() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();
    let mut display = DisplayController::new(500);

    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    clock.advance_ms(3000);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Racing);

    svc.handle_command(RaceCommand::Reset, &mut lights, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Racing);
    assert_eq!(svc.race().race_id(), 0);
}

#[test]
fn team_time_field_follows_the_clock_at_refresh_rate() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();
    let mut display = DisplayController::new(500);

    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    clock.advance_ms(3000);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(display.field_text(FieldId::RaceState), Some("RACING"));
    assert_eq!(display.field_text(FieldId::TeamTime), Some("  0.000"));

    // Inside the refresh interval the field is left alone.
    clock.advance_ms(200);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(display.field_text(FieldId::TeamTime), Some("  0.000"));

    clock.advance_ms(300);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(display.field_text(FieldId::TeamTime), Some("  0.500"));
}

#[test]
fn queue_overrun_is_survivable() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();
    let mut display = DisplayController::new(500);

    svc.handle_command(RaceCommand::Start, &mut lights, &mut sink);
    // Glitching beam: more edges than the ring holds between two passes.
    for i in 0..TRIGGER_QUEUE_CAP as u64 {
        let level = if i % 2 == 0 { Level::High } else { Level::Low };
        svc.race().trigger_sensor(Sensor::Box, level, BOOT_US + i);
    }
    assert_eq!(svc.race().queue_overruns(), 1);

    clock.advance_ms(10);
    svc.tick(&mut lights, &mut display, &mut sink);
    assert_eq!(svc.race().state(), RaceState::Starting);
    assert!(queue.is_empty());
}
