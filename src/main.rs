//! Flyball ETS Firmware: Main Entry Point
//!
//! Hexagonal architecture: interrupt-fed race engine in the middle,
//! peripherals behind port traits.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspClock          LightsSequencer   ConsoleDisplay            │
//! │  (Clock)           (StartLights)     (DisplaySurface)          │
//! │  LogEventSink      DisplayController ButtonDriver              │
//! │  (EventSink)       (FieldSink)       (RaceCommand source)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              RaceService (pure logic)                  │    │
//! │  │  RaceHandler · transitions · dog tables · reruns       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                              ▲                                 │
//! │  gate ISRs ──▶ TRIGGER_QUEUE ┘                                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{debug, error, info};

use flyball_ets::adapters::clock::EspClock;
use flyball_ets::adapters::hardware::{LightPin, take_light_pins};
use flyball_ets::adapters::log_sink::LogEventSink;
use flyball_ets::adapters::serial_display::ConsoleDisplay;
use flyball_ets::app::commands::RaceCommand;
use flyball_ets::app::service::RaceService;
use flyball_ets::config::RaceConfig;
use flyball_ets::drivers::button::{BUTTON_LATCH, ButtonDriver};
use flyball_ets::drivers::display::DisplayController;
use flyball_ets::drivers::hw_init;
use flyball_ets::drivers::lights::LightsSequencer;
use flyball_ets::drivers::task_pin::{Core, spawn_on_core};
use flyball_ets::events::TRIGGER_QUEUE;
use flyball_ets::pins;

/// Race loop task: stack holds the engine and its race history.
const RACE_TASK_STACK_KB: usize = 192;
const RACE_TASK_PRIORITY: u8 = 5;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Flyball ETS v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = RaceConfig::default();
    config.validate()?;

    // ── 3. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without gate inputs there is nothing to time.
        error!("HAL init failed: {}, halting", e);
        return Err(e.into());
    }
    hw_init::init_isr_service()?;
    let lights = LightsSequencer::new(take_light_pins()?, config.light_stage_ms);

    // ── 4. Race task ──────────────────────────────────────────
    let race_task = spawn_on_core(
        Core::App,
        RACE_TASK_PRIORITY,
        RACE_TASK_STACK_KB,
        "race\0",
        move || run_race_loop(config, lights),
    )?;

    race_task
        .join()
        .map_err(|_| anyhow::anyhow!("race task panicked"))?;
    Ok(())
}

fn run_race_loop(config: RaceConfig, mut lights: LightsSequencer<LightPin>) {
    let mut display = DisplayController::new(config.display_refresh_ms);
    let mut console = ConsoleDisplay::new();
    let mut sink = LogEventSink::new();
    let mut button = ButtonDriver::new(pins::BUTTON_GPIO, config.button_lockout_ms, &BUTTON_LATCH);
    let mut service = RaceService::new(&TRIGGER_QUEUE, EspClock::new(), config);

    info!("System ready. Press the start button.");

    loop {
        if let Some(press) = button.tick() {
            debug!("Button press at {} ms", press.at_ms);
            service.handle_command(RaceCommand::StartStop, &mut lights, &mut sink);
        }

        service.tick(&mut lights, &mut display, &mut sink);
        display.refresh(service.now_ms(), &mut console);

        // Yield so the idle task can feed the task watchdog.
        FreeRtos::delay_ms(1);
    }
}
