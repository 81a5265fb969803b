//! Software model of an HX711 sitting behind a `GpioPort`.
//!
//! The model reacts to clock edges written through the port and reports the
//! DOUT level on reads, using a shared `Clock` for conversion timing. It is the
//! backend used when no hardware is attached, and by the test suites.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use scale_traits::{Clock, GpioPort, Level, PinId, PinMode, PortResult};
use tracing::trace;

use crate::error::HwError;

/// Clock held HIGH at least this long powers the chip down.
pub const POWER_DOWN_AFTER: Duration = Duration::from_micros(60);

const DATA_BITS: u8 = 24;
const MAGNITUDE_MASK: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimFault {
    #[default]
    None,
    /// No supply: DOUT never goes LOW.
    Unpowered,
    /// DOUT shorted to ground: every bit reads LOW.
    DataShorted,
    /// SCK never reaches the chip. It still signals ready, but releases DOUT
    /// as soon as the host starts clocking, so every sampled bit reads HIGH.
    ClockNotReaching,
    /// DOUT and SCK wires are swapped relative to the configured pins.
    SwappedWiring,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Host pin the chip's DOUT is supposed to be wired to.
    pub dout_pin: PinId,
    /// Host pin the chip's PD_SCK is supposed to be wired to.
    pub sck_pin: PinId,
    pub fault: SimFault,
    /// Raw counts with no load at gain 128.
    pub base_counts: i32,
    /// Peak noise added to each generated conversion.
    pub noise_counts: i32,
    pub counts_per_gram: f64,
    pub load_grams: f64,
    /// Conversion period (100 ms at the chip's 10 Hz output rate).
    pub conversion: Duration,
    /// Level read back from host pins that nothing drives.
    pub floating: Level,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dout_pin: 5,
            sck_pin: 6,
            fault: SimFault::None,
            base_counts: 8_000,
            noise_counts: 40,
            counts_per_gram: 420.0,
            load_grams: 0.0,
            conversion: Duration::from_millis(100),
            floating: Level::High,
            seed: 0x5eed_1234_abcd_0001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scripted {
    Magnitude(u32),
    Stall(Duration),
}

#[derive(Debug, Clone, Copy)]
struct Shift {
    word: u32,
    pulses: u8,
}

/// Clamp signed counts into the chip's range and return the 24-bit wire word.
pub fn counts_to_magnitude(counts: i64) -> u32 {
    let clamped = counts.clamp(-0x80_0000, 0x7F_FFFF);
    (clamped as i32 as u32) & MAGNITUDE_MASK
}

pub struct SimulatedHx711<C: Clock> {
    cfg: SimConfig,
    clock: C,
    // physical wiring after applying `SwappedWiring`
    dout: PinId,
    sck: PinId,
    modes: HashMap<PinId, PinMode>,
    unavailable: Vec<PinId>,
    sck_level: Level,
    sck_high_since: Option<Instant>,
    powered_down: bool,
    ready_at: Instant,
    shift: Option<Shift>,
    /// Extra pulses latched for the next conversion (1 = A128, 2 = B32, 3 = A64).
    next_gain_pulses: u8,
    /// Extra pulses the pending conversion was taken with.
    active_gain_pulses: u8,
    unseen_edges: u32,
    script: VecDeque<Scripted>,
    rng: u64,
    total_pulses: u64,
    completed_reads: u64,
}

impl<C: Clock> SimulatedHx711<C> {
    pub fn new(cfg: SimConfig, clock: C) -> Self {
        let (dout, sck) = if cfg.fault == SimFault::SwappedWiring {
            (cfg.sck_pin, cfg.dout_pin)
        } else {
            (cfg.dout_pin, cfg.sck_pin)
        };
        let ready_at = clock.now() + cfg.conversion;
        let rng = if cfg.seed == 0 { 0x9e37_79b9 } else { cfg.seed };
        Self {
            cfg,
            clock,
            dout,
            sck,
            modes: HashMap::new(),
            unavailable: Vec::new(),
            sck_level: Level::Low,
            sck_high_since: None,
            powered_down: false,
            ready_at,
            shift: None,
            next_gain_pulses: 1,
            active_gain_pulses: 1,
            unseen_edges: 0,
            script: VecDeque::new(),
            rng,
            total_pulses: 0,
            completed_reads: 0,
        }
    }

    /// Make `configure` fail for these pins, as if another process owned them.
    pub fn with_unavailable_pins(mut self, pins: &[PinId]) -> Self {
        self.unavailable.extend_from_slice(pins);
        self
    }

    /// Queue a conversion result in signed counts.
    pub fn push_value(&mut self, counts: i32) {
        self.push_magnitude(counts_to_magnitude(i64::from(counts)));
    }

    /// Queue a raw 24-bit word exactly as it should appear on the wire.
    pub fn push_magnitude(&mut self, magnitude: u32) {
        self.script
            .push_back(Scripted::Magnitude(magnitude & MAGNITUDE_MASK));
    }

    /// Keep DOUT HIGH for `d` once the current conversion would be ready.
    pub fn push_stall(&mut self, d: Duration) {
        self.script.push_back(Scripted::Stall(d));
    }

    pub fn set_load_grams(&mut self, grams: f64) {
        self.cfg.load_grams = grams;
    }

    /// Extra pulses latched by the last complete read.
    pub fn gain_pulses(&self) -> u8 {
        self.next_gain_pulses
    }

    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Rising clock edges seen since construction.
    pub fn total_pulses(&self) -> u64 {
        self.total_pulses
    }

    /// Conversions whose 24 data bits were fully clocked out.
    pub fn completed_reads(&self) -> u64 {
        self.completed_reads
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn tick(&mut self) {
        let now = self.clock.now();
        if self.cfg.fault != SimFault::ClockNotReaching
            && !self.powered_down
            && let Some(since) = self.sck_high_since
            && now.saturating_duration_since(since) >= POWER_DOWN_AFTER
        {
            trace!("sim: clock held high, powering down");
            self.powered_down = true;
            self.shift = None;
        }
        if self.shift.is_some() && now >= self.ready_at {
            self.shift = None;
            self.active_gain_pulses = self.next_gain_pulses;
        }
        if self.unseen_edges > 0 && now >= self.ready_at {
            self.unseen_edges = 0;
        }
        if self.shift.is_none()
            && !self.powered_down
            && now >= self.ready_at
            && let Some(Scripted::Stall(d)) = self.script.front().copied()
        {
            self.script.pop_front();
            self.ready_at = now + d;
        }
    }

    fn on_clock(&mut self, level: Level) {
        self.tick();
        let now = self.clock.now();
        let rising = self.sck_level.is_low() && level.is_high();
        let falling = self.sck_level.is_high() && level.is_low();
        self.sck_level = level;

        if rising {
            self.total_pulses += 1;
        }
        if self.cfg.fault == SimFault::ClockNotReaching {
            if rising && self.shift.is_none() && now >= self.ready_at {
                self.unseen_edges += 1;
                self.ready_at = now + self.cfg.conversion;
            }
            return;
        }

        if rising {
            self.sck_high_since = Some(now);
        }
        if falling {
            self.sck_high_since = None;
            if self.powered_down {
                trace!("sim: clock low, waking up at gain 128");
                self.powered_down = false;
                self.next_gain_pulses = 1;
                self.active_gain_pulses = 1;
                self.ready_at = now + self.cfg.conversion;
            }
        }
        if !rising || self.powered_down {
            return;
        }

        match self.shift.as_mut() {
            None => {
                if now >= self.ready_at {
                    let word = self.next_word();
                    self.shift = Some(Shift { word, pulses: 1 });
                    self.ready_at = now + self.cfg.conversion;
                }
            }
            Some(shift) => {
                shift.pulses = shift.pulses.saturating_add(1);
                if shift.pulses == DATA_BITS {
                    self.completed_reads += 1;
                }
                if (DATA_BITS + 1..=DATA_BITS + 3).contains(&shift.pulses) {
                    self.next_gain_pulses = shift.pulses - DATA_BITS;
                }
            }
        }
    }

    fn dout_level(&mut self) -> Level {
        self.tick();
        match self.cfg.fault {
            SimFault::Unpowered => return Level::High,
            SimFault::DataShorted => return Level::Low,
            _ => {}
        }
        if self.powered_down {
            return Level::High;
        }
        let ready = self.clock.now() >= self.ready_at;
        if self.cfg.fault == SimFault::ClockNotReaching {
            return Level::from(self.unseen_edges > 0 || !ready);
        }
        match self.shift {
            Some(s) if s.pulses <= DATA_BITS => {
                Level::from((s.word >> (DATA_BITS - s.pulses)) & 1 == 1)
            }
            Some(_) => Level::High,
            None => Level::from(!ready),
        }
    }

    fn next_word(&mut self) -> u32 {
        if let Some(Scripted::Magnitude(m)) = self.script.front().copied() {
            self.script.pop_front();
            return m;
        }
        // channel B at 32 sees a quarter of the A128 signal, A64 half
        let divisor = match self.active_gain_pulses {
            2 => 4.0,
            3 => 2.0,
            _ => 1.0,
        };
        let signal =
            (f64::from(self.cfg.base_counts) + self.cfg.load_grams * self.cfg.counts_per_gram)
                / divisor;
        let counts = signal.round() as i64 + self.noise();
        counts_to_magnitude(counts)
    }

    fn noise(&mut self) -> i64 {
        let span = i64::from(self.cfg.noise_counts.max(0));
        if span == 0 {
            return 0;
        }
        // xorshift64
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 7;
        self.rng ^= self.rng << 17;
        (self.rng % (2 * span as u64 + 1)) as i64 - span
    }
}

impl<C: Clock> GpioPort for SimulatedHx711<C> {
    fn configure(&mut self, pin: PinId, mode: PinMode) -> PortResult<()> {
        if self.unavailable.contains(&pin) {
            return Err(HwError::PinUnavailable(pin).into());
        }
        self.modes.insert(pin, mode);
        Ok(())
    }

    fn write(&mut self, pin: PinId, level: Level) -> PortResult<()> {
        if self.modes.get(&pin) != Some(&PinMode::Output) {
            return Err(HwError::PinNotConfigured(pin).into());
        }
        if pin == self.sck {
            self.on_clock(level);
        }
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> PortResult<Level> {
        let Some(mode) = self.modes.get(&pin).copied() else {
            return Err(HwError::PinNotConfigured(pin).into());
        };
        let level = if pin == self.dout {
            self.dout_level()
        } else if pin == self.sck && mode == PinMode::Output {
            self.sck_level
        } else {
            self.cfg.floating
        };
        Ok(level)
    }

    fn sleep(&mut self, d: Duration) {
        self.clock.sleep(d);
    }
}
