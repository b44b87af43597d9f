/// Q32.32 fixed-point time duration in microseconds.
///
/// Storage: `u64` with 32 integer bits + 32 fractional bits.
/// Base unit: microseconds (1 second = 1,000,000 us).
/// Range: 0 to ~4294 seconds with sub-microsecond precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Micros(u64);

impl Micros {
    const FRAC_BITS: u32 = 32;
    const MICROS_PER_SEC: u64 = 1_000_000;
    const RAW_PER_SEC: f64 = (Self::MICROS_PER_SEC as f64) * ((1u64 << Self::FRAC_BITS) as f64);

    pub const ZERO: Self = Self(0);

    /// Create from whole seconds.
    pub const fn from_secs(secs: u32) -> Self {
        Self((secs as u64 * Self::MICROS_PER_SEC) << Self::FRAC_BITS)
    }

    /// Create from whole milliseconds.
    pub const fn from_millis(millis: u32) -> Self {
        Self((millis as u64 * 1_000) << Self::FRAC_BITS)
    }

    /// Create from whole microseconds.
    pub const fn from_micros(micros: u32) -> Self {
        Self((micros as u64) << Self::FRAC_BITS)
    }

    /// Create from authored seconds. Negative and NaN inputs become zero.
    pub fn from_secs_f32(secs: f32) -> Self {
        if !(secs > 0.0) {
            return Self::ZERO;
        }
        // `as` saturates, so oversized durations clamp to the top of the range.
        Self((secs as f64 * Self::RAW_PER_SEC) as u64)
    }

    /// Duration of one tick at the given tick rate.
    pub const fn tick_period(tick_hz: u32) -> Self {
        if tick_hz == 0 {
            return Self::ZERO;
        }
        Self((Self::MICROS_PER_SEC << Self::FRAC_BITS) / tick_hz as u64)
    }

    /// Convert to tick count at the given tick rate.
    ///
    /// Formula: ticks = (micros * tick_hz) / MICROS_PER_SEC
    /// This uses 128-bit intermediate to avoid overflow.
    pub const fn to_ticks(self, tick_hz: u32) -> u64 {
        let numer = self.0 as u128 * tick_hz as u128;
        let denom = Self::MICROS_PER_SEC << Self::FRAC_BITS;
        (numer / denom as u128) as u64
    }

    pub fn as_secs_f32(self) -> f32 {
        (self.0 as f64 / Self::RAW_PER_SEC) as f32
    }

    /// Fraction `self / total`, clamped to `[0, 1]`. A zero total counts as done.
    pub fn fraction_of(self, total: Self) -> f32 {
        if total.0 == 0 {
            return 1.0;
        }
        ((self.0 as f64 / total.0 as f64) as f32).clamp(0.0, 1.0)
    }

    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw Q32.32 value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl core::ops::Add for Micros {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::Sub for Micros {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl core::ops::Mul<u32> for Micros {
    type Output = Self;
    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * rhs as u64)
    }
}

impl core::ops::Div<u32> for Micros {
    type Output = Self;
    fn div(self, rhs: u32) -> Self {
        Self(self.0 / rhs as u64)
    }
}
