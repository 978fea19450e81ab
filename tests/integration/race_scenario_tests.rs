//! End-to-end race scenarios: beam edges in, times and verdicts out.
//!
//! Each test plays gate passes into a private trigger queue, advances
//! the mock clock and drives the full `RaceService` pass, exactly as the
//! main loop does on the device.

use flyball_ets::app::commands::RaceCommand;
use flyball_ets::app::events::RaceEvent;
use flyball_ets::app::ports::{FieldId, FieldView};
use flyball_ets::app::service::RaceService;
use flyball_ets::drivers::display::DisplayController;
use flyball_ets::events::TriggerQueue;
use flyball_ets::race::RaceState;
use flyball_ets::race::dogs::{Attempt, Direction};

use crate::mock_hw::{MockClock, RecordingSink, default_config, mock_lights, pass};

const BOOT_US: u64 = 2_000_000;
/// Timer zero-point: boot plus the 3 s lead-in.
const T0: u64 = BOOT_US + 3_000_000;
const MS: u64 = 1_000;
const SEC: u64 = 1_000_000;

/// Start from idle and run the lights until green.
macro_rules! start_and_go_green {
    ($svc:expr, $clock:expr, $lights:expr, $sink:expr) => {{
        $svc.handle_command(RaceCommand::StartStop, &mut $lights, &mut $sink);
        assert_eq!($svc.race().state(), RaceState::Starting);
        $clock.set_us(T0);
        let mut fields = DisplayController::new(500);
        $svc.tick(&mut $lights, &mut fields, &mut $sink);
        assert_eq!($svc.race().state(), RaceState::Racing);
    }};
}

#[test]
fn clean_race_stops_when_last_dog_is_home() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();

    start_and_go_green!(svc, clock, lights, sink);

    for dog in 0..4u64 {
        // Out 100 ms after the perfect crossing, home 4 s after it.
        pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + dog * 4 * SEC + 100 * MS);
        assert_eq!(svc.race().direction(), Direction::ComingBack);
        pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + (dog + 1) * 4 * SEC);
    }

    let race = svc.race();
    assert_eq!(race.state(), RaceState::Stop);
    assert!(race.is_finished());
    assert_eq!(race.race_time_ms(), 16_000);
    assert!(!race.has_fault());
    for dog in 0..4u8 {
        assert_eq!(race.dog_time_ms(dog, Attempt::Latest), 3_900, "dog {dog}");
        assert_eq!(race.crossing_offset_ms(dog, Attempt::Latest), 100, "dog {dog}");
    }
    assert_eq!(race.total_crossing_ms(), 400);

    let record = race.history().latest().copied().unwrap();
    assert_eq!(record.id, 0);
    assert_eq!(record.elapsed_us, 16 * SEC);
    assert_eq!(record.end_us, T0 + 16 * SEC);

    assert_eq!(sink.count(|e| matches!(e, RaceEvent::DogChanged { .. })), 3);
    assert_eq!(sink.count(|e| matches!(e, RaceEvent::FaultChanged { .. })), 0);
    assert_eq!(sink.count(|e| matches!(e, RaceEvent::RaceArchived(_))), 1);
}

#[test]
fn early_crossing_faults_dog_and_forces_rerun() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();

    start_and_go_green!(svc, clock, lights, sink);

    // Dog 0 out, then dog 1 leaves 100 ms before dog 0 is home.
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + 100 * MS);
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + 3_900 * MS);
    assert!(svc.race().dog_fault(1));
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + 4 * SEC);
    assert_eq!(svc.race().current_dog(), 1);

    // Dogs 1, 2 and 3 come home; 2 and 3 leave cleanly.
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + 8 * SEC);
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + 8_100 * MS);
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + 12 * SEC);
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + 12_100 * MS);
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + 16 * SEC);

    // The team is not clean: dog 1 goes again.
    let race = svc.race();
    assert_eq!(race.state(), RaceState::Racing);
    assert!(race.rerun_busy());
    assert_eq!(race.current_dog(), 1);
    assert_eq!(race.run_count(1), 1);
    assert_eq!(sink.count(|e| matches!(e, RaceEvent::RerunStarted)), 1);

    // Clean rerun ends the race.
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + 16_100 * MS);
    assert!(!svc.race().dog_fault(1));
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + 20 * SEC);

    let race = svc.race();
    assert_eq!(race.state(), RaceState::Stop);
    assert_eq!(race.race_time_ms(), 20_000);
    assert!(!race.rerun_busy());
    assert_eq!(race.dog_time_ms(1, Attempt::Index(1)), 3_900);
    assert!(!race.has_fault());

    let raised = sink.count(|e| matches!(e, RaceEvent::FaultChanged { dog: 1, faulted: true }));
    let cleared = sink.count(|e| matches!(e, RaceEvent::FaultChanged { dog: 1, faulted: false }));
    assert_eq!((raised, cleared), (1, 1));
}

#[test]
fn first_dog_before_green_is_faulted_with_negative_offset() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();

    svc.handle_command(RaceCommand::StartStop, &mut lights, &mut sink);
    pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 - 200 * MS);

    let race = svc.race();
    assert_eq!(race.state(), RaceState::Starting);
    assert!(race.dog_fault(0));
    assert_eq!(race.crossing_offset_ms(0, Attempt::Latest), -200);
    assert_eq!(race.direction(), Direction::ComingBack);
    assert!(sink.events.iter().any(|e| matches!(e, RaceEvent::FaultChanged { dog: 0, faulted: true })));
}

#[test]
fn edges_while_idle_are_dropped() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let svc = RaceService::new(&queue, &clock, default_config());

    assert!(!svc.race().trigger_sensor(
        flyball_ets::events::Sensor::Handler,
        flyball_ets::events::Level::High,
        BOOT_US,
    ));
    assert!(queue.is_empty());
}

#[test]
fn finished_race_renders_final_fields() {
    let queue = TriggerQueue::new();
    let clock = MockClock::new(BOOT_US);
    let mut svc = RaceService::new(&queue, &clock, default_config());
    let (mut lights, _pins) = mock_lights(1000);
    let mut sink = RecordingSink::new();

    start_and_go_green!(svc, clock, lights, sink);
    for dog in 0..4u64 {
        pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "ABab", T0 + dog * 4 * SEC + 100 * MS);
        pass(&mut svc, &clock, &queue, &mut lights, &mut sink, "BAba", T0 + (dog + 1) * 4 * SEC);
    }

    // Much later: nothing keeps running once the race is over.
    clock.set_us(T0 + 60 * SEC);
    let mut display = DisplayController::new(500);
    svc.render_fields(&mut display);

    assert_eq!(display.field_text(FieldId::RaceState), Some(" STOP"));
    assert_eq!(display.field_text(FieldId::TeamTime), Some(" 16.000"));
    assert_eq!(display.field_text(FieldId::TotalCrossTime), Some("  0.400"));
    assert_eq!(display.field_text(FieldId::DogTime(3)), Some("  3.900"));
    assert_eq!(display.field_text(FieldId::CrossTime(2)), Some("+  0.100"));
    assert_eq!(display.field_text(FieldId::RerunInfo(0)), Some("  "));
}
