//! # Cortex-M4 Reference Clock
//!
//! Optional [`crate::time::Clock`] implementation driven by the Cortex-M4
//! SysTick timer, gated behind the `hw-cortex-m` feature. This is glue, not
//! part of the scheduler core: any other `Clock` implementation works just
//! as well, and nothing in `scheduler.rs` knows this module exists.
//!
//! SysTick is configured to fire at `TICK_HZ`; each firing is expected to
//! call [`SysTickClock::on_tick`] from the firmware's own `SysTick`
//! exception handler, which this crate does not define — wiring interrupt
//! vectors is the firmware's responsibility, not the scheduler's.

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::time::{Clock, TimeUs};

/// Configure SysTick to fire at `TICK_HZ`, sourced from the core clock.
pub fn configure_systick(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

static MICROS: AtomicU32 = AtomicU32::new(0);

/// A monotonic microsecond counter advanced one tick period at a time by
/// the firmware's SysTick handler.
pub struct SysTickClock;

impl SysTickClock {
    pub const fn new() -> Self {
        Self
    }

    /// Call from the firmware's `SysTick` exception handler.
    pub fn on_tick() {
        MICROS.fetch_add(1_000_000 / TICK_HZ, Ordering::Relaxed);
    }
}

impl Clock for SysTickClock {
    fn now_us(&mut self) -> TimeUs {
        MICROS.load(Ordering::Relaxed) as TimeUs
    }
}
