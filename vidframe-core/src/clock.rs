//! Clock timestamps in 27 MHz units.
//!
//! Timestamps travel on six independent channels alongside each chunk and
//! each framed picture: the program timestamps as declared by the upstream
//! carrier (`orig`), after drift correction (`prog`), and mapped to the
//! local system clock (`sys`), for both PTS and DTS.

use std::fmt;
use std::ops::Add;

/// The canonical clock frequency of the framing layer, in Hz.
pub const UCLOCK_FREQ: u64 = 27_000_000;

/// A 27 MHz clock timestamp, with a sentinel for "unknown".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockTime(u64);

impl ClockTime {
    /// The "unknown" sentinel.
    pub const UNSET: ClockTime = ClockTime(u64::MAX);

    /// Create a timestamp from a raw 27 MHz tick count.
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Check whether this timestamp carries a value.
    pub fn is_set(&self) -> bool {
        self.0 != u64::MAX
    }

    /// Get the tick count, or `None` when unset.
    pub fn value(&self) -> Option<u64> {
        if self.is_set() {
            Some(self.0)
        } else {
            None
        }
    }
}

impl Default for ClockTime {
    fn default() -> Self {
        Self::UNSET
    }
}

impl From<u64> for ClockTime {
    fn from(ticks: u64) -> Self {
        Self::new(ticks)
    }
}

impl From<Option<u64>> for ClockTime {
    fn from(ticks: Option<u64>) -> Self {
        match ticks {
            Some(t) => Self::new(t),
            None => Self::UNSET,
        }
    }
}

impl Add<u64> for ClockTime {
    type Output = ClockTime;

    /// Advance a timestamp by a duration; an unset timestamp stays unset.
    fn add(self, rhs: u64) -> Self::Output {
        if self.is_set() {
            ClockTime(self.0 + rhs)
        } else {
            self
        }
    }
}

impl fmt::Debug for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(t) => write!(f, "ClockTime({t})"),
            None => write!(f, "ClockTime(unset)"),
        }
    }
}

/// The six timestamp channels carried alongside a chunk or picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockTimes {
    /// PTS as declared by the carrier.
    pub pts_orig: ClockTime,
    /// PTS after drift correction.
    pub pts: ClockTime,
    /// PTS mapped to the system clock.
    pub pts_sys: ClockTime,
    /// DTS as declared by the carrier.
    pub dts_orig: ClockTime,
    /// DTS after drift correction.
    pub dts: ClockTime,
    /// DTS mapped to the system clock.
    pub dts_sys: ClockTime,
}

impl ClockTimes {
    /// All six channels unset.
    pub const UNSET: ClockTimes = ClockTimes {
        pts_orig: ClockTime::UNSET,
        pts: ClockTime::UNSET,
        pts_sys: ClockTime::UNSET,
        dts_orig: ClockTime::UNSET,
        dts: ClockTime::UNSET,
        dts_sys: ClockTime::UNSET,
    };

    /// Overwrite every channel that `other` carries; channels `other`
    /// leaves unset keep their current value.
    pub fn merge(&mut self, other: &ClockTimes) {
        macro_rules! merge_channel {
            ($name:ident) => {
                if other.$name.is_set() {
                    self.$name = other.$name;
                }
            };
        }
        merge_channel!(pts_orig);
        merge_channel!(pts);
        merge_channel!(pts_sys);
        merge_channel!(dts_orig);
        merge_channel!(dts);
        merge_channel!(dts_sys);
    }

    /// Reset the three PTS channels to unset.
    pub fn clear_pts(&mut self) {
        self.pts_orig = ClockTime::UNSET;
        self.pts = ClockTime::UNSET;
        self.pts_sys = ClockTime::UNSET;
    }

    /// Reset the three DTS channels to unset.
    pub fn clear_dts(&mut self) {
        self.dts_orig = ClockTime::UNSET;
        self.dts = ClockTime::UNSET;
        self.dts_sys = ClockTime::UNSET;
    }

    /// Check whether any channel carries a value.
    pub fn any_set(&self) -> bool {
        self.pts_orig.is_set()
            || self.pts.is_set()
            || self.pts_sys.is_set()
            || self.dts_orig.is_set()
            || self.dts.is_set()
            || self.dts_sys.is_set()
    }
}
