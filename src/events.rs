//! Interrupt-fed sensor trigger queue.
//!
//! Every edge on either photoelectric beam produces one
//! [`SensorTriggerRecord`], pushed from the GPIO ISR.  The race engine
//! drains the queue once per main-loop pass.
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────┐     ┌────────────────┐
//! │ Handler beam ISR │────▶│                │     │                │
//! │                  │     │  TriggerQueue  │────▶│  RaceHandler   │
//! │ Box beam ISR     │────▶│  (SPSC, N=50)  │     │  ::process()   │
//! └──────────────────┘     └────────────────┘     └────────────────┘
//! ```
//!
//! ## Overrun
//!
//! The producer never waits and never checks for space.  When it laps the
//! consumer, the write cursor lands on the read cursor, the backlog reads
//! as empty, and the next push overwrites the oldest unread slot.  Each
//! lap is counted in [`TriggerQueue::overruns`].

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};

/// Number of slots in the ring.
pub const TRIGGER_QUEUE_CAP: usize = 50;

/// Which beam produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Sensor {
    /// Beam nearest the handler (start/finish line side).
    Handler = 0,
    /// Beam nearest the box.
    Box = 1,
}

/// Beam level sampled in the ISR.  `High` means the beam is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

/// One physical edge on one beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTriggerRecord {
    pub sensor: Sensor,
    /// Monotonic microseconds since boot.
    pub timestamp_us: u64,
    pub level: Level,
}

impl SensorTriggerRecord {
    pub const fn new(sensor: Sensor, level: Level, timestamp_us: u64) -> Self {
        Self { sensor, timestamp_us, level }
    }
}

// ── Slot storage ──────────────────────────────────────────────
//
// 64-bit atomics are not available on every Xtensa core, so the
// timestamp is split across two words.  Slot contents are published by
// the Release store of the write cursor, which makes Relaxed sufficient
// inside the slot.

struct Slot {
    ts_hi: AtomicU32,
    ts_lo: AtomicU32,
    /// bit 0: level, bit 1: sensor
    tag: AtomicU8,
}

impl Slot {
    const fn new() -> Self {
        Self {
            ts_hi: AtomicU32::new(0),
            ts_lo: AtomicU32::new(0),
            tag: AtomicU8::new(0),
        }
    }

    fn store(&self, record: SensorTriggerRecord) {
        self.ts_hi.store((record.timestamp_us >> 32) as u32, Ordering::Relaxed);
        self.ts_lo.store(record.timestamp_us as u32, Ordering::Relaxed);
        let tag = (record.level as u8) | ((record.sensor as u8) << 1);
        self.tag.store(tag, Ordering::Relaxed);
    }

    fn load(&self) -> SensorTriggerRecord {
        let hi = u64::from(self.ts_hi.load(Ordering::Relaxed));
        let lo = u64::from(self.ts_lo.load(Ordering::Relaxed));
        let tag = self.tag.load(Ordering::Relaxed);
        SensorTriggerRecord {
            sensor: if tag & 0b10 == 0 { Sensor::Handler } else { Sensor::Box },
            timestamp_us: (hi << 32) | lo,
            level: if tag & 0b01 == 0 { Level::Low } else { Level::High },
        }
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────

/// Single-producer / single-consumer ring of trigger records.
///
/// The producer side ([`push`](Self::push), [`trigger_sensor`](Self::trigger_sensor))
/// is ISR-safe.  The consumer side ([`pop`](Self::pop), [`clear`](Self::clear))
/// belongs to the main loop.
pub struct TriggerQueue {
    slots: [Slot; TRIGGER_QUEUE_CAP],
    write: AtomicUsize,
    read: AtomicUsize,
    /// Cleared while the race is stopped; ISRs drop edges when unset.
    armed: AtomicBool,
    overruns: AtomicU32,
}

/// Queue shared by the GPIO ISRs and the race engine.
pub static TRIGGER_QUEUE: TriggerQueue = TriggerQueue::new();

impl Default for TriggerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerQueue {
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::new() }; TRIGGER_QUEUE_CAP],
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            armed: AtomicBool::new(false),
            overruns: AtomicU32::new(0),
        }
    }

    /// ISR entry point: record an edge unless the race is stopped.
    /// Returns `false` if the edge was dropped because the queue is disarmed.
    pub fn trigger_sensor(&self, sensor: Sensor, level: Level, timestamp_us: u64) -> bool {
        if !self.armed.load(Ordering::Acquire) {
            return false;
        }
        self.push(SensorTriggerRecord::new(sensor, level, timestamp_us));
        true
    }

    /// Append a record.  Never blocks; overwrites on overrun.
    pub fn push(&self, record: SensorTriggerRecord) {
        let write = self.write.load(Ordering::Relaxed);
        self.slots[write].store(record);

        let next = (write + 1) % TRIGGER_QUEUE_CAP;
        if next == self.read.load(Ordering::Acquire) {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        self.write.store(next, Ordering::Release);
    }

    /// Take the oldest record.  `None` when read cursor == write cursor.
    pub fn pop(&self) -> Option<SensorTriggerRecord> {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        if read == write {
            return None;
        }

        let record = self.slots[read].load();
        self.read.store((read + 1) % TRIGGER_QUEUE_CAP, Ordering::Release);
        Some(record)
    }

    /// Drain every pending record in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(SensorTriggerRecord)) {
        while let Some(record) = self.pop() {
            handler(record);
        }
    }

    /// Rewind both cursors.  Only call while disarmed.
    pub fn clear(&self) {
        debug_assert!(!self.is_armed(), "clearing an armed trigger queue");
        self.read.store(0, Ordering::Relaxed);
        self.write.store(0, Ordering::Release);
    }

    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Relaxed);
        (write + TRIGGER_QUEUE_CAP - read) % TRIGGER_QUEUE_CAP
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Times the producer lapped the consumer since boot.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Current `(read, write)` cursor positions.
    pub fn cursors(&self) -> (usize, usize) {
        (self.read.load(Ordering::Relaxed), self.write.load(Ordering::Acquire))
    }
}
