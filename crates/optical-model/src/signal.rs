//! DWDM grid signals and frequency-ID conversion.
//!
//! Signals sit on the ITU grid anchored at 193.1 THz. Operators address
//! wavelengths by a 1-based frequency ID counted upward from a configured
//! lowest frequency, so the converter only has to carry the offset between
//! the grid anchor and that lowest frequency.

use serde::{Deserialize, Serialize};

/// ITU grid anchor frequency [THz].
pub const CENTER_FREQUENCY_THZ: f64 = 193.1;

/// Fixed-grid channel spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelSpacing {
    Chl50Ghz,
    Chl25Ghz,
    Chl12P5Ghz,
}

impl ChannelSpacing {
    pub fn ghz(&self) -> f64 {
        match self {
            ChannelSpacing::Chl50Ghz => 50.0,
            ChannelSpacing::Chl25Ghz => 25.0,
            ChannelSpacing::Chl12P5Ghz => 12.5,
        }
    }

    pub fn hz(&self) -> f64 {
        self.ghz() * 1e9
    }
}

/// Signal grid category matched by switching rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    FixedGrid,
    FlexGrid,
}

/// One wavelength slot on the DWDM grid.
///
/// The center frequency is `193.1 THz + multiplier * spacing`; the
/// multiplier may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OchSignal {
    pub spacing: ChannelSpacing,
    pub multiplier: i32,
}

impl PartialOrd for ChannelSpacing {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChannelSpacing {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ghz()
            .partial_cmp(&other.ghz())
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl OchSignal {
    pub fn new(spacing: ChannelSpacing, multiplier: i32) -> Self {
        OchSignal {
            spacing,
            multiplier,
        }
    }

    /// 50 GHz grid slot.
    pub fn dwdm_50ghz(multiplier: i32) -> Self {
        OchSignal::new(ChannelSpacing::Chl50Ghz, multiplier)
    }

    pub fn center_frequency_thz(&self) -> f64 {
        CENTER_FREQUENCY_THZ + self.multiplier as f64 * self.spacing.ghz() * 1e-3
    }

    pub fn center_frequency_hz(&self) -> f64 {
        self.center_frequency_thz() * 1e12
    }
}

impl std::fmt::Display for OchSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}THz", self.center_frequency_thz())
    }
}

/// Converter between grid signals and operator-facing frequency IDs.
///
/// The configured lowest frequency maps to ID 1; IDs grow with frequency in
/// 50 GHz steps. IDs at or below zero address frequencies under the floor
/// and are never offered to callers.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyConverter {
    id_delta: i32,
}

impl FrequencyConverter {
    pub fn new(lowest_frequency_thz: f64) -> Self {
        let spacing_thz = ChannelSpacing::Chl50Ghz.ghz() * 1e-3;
        let start_multiplier =
            ((lowest_frequency_thz - CENTER_FREQUENCY_THZ) / spacing_thz).round() as i32;
        FrequencyConverter {
            id_delta: -start_multiplier + 1,
        }
    }

    /// Frequency ID of a 50 GHz grid signal.
    pub fn channel_id(&self, signal: &OchSignal) -> i32 {
        debug_assert_eq!(signal.spacing, ChannelSpacing::Chl50Ghz);
        signal.multiplier + self.id_delta
    }

    /// Grid signal addressed by the given frequency ID.
    pub fn signal(&self, channel_id: i32) -> OchSignal {
        OchSignal::dwdm_50ghz(channel_id - self.id_delta)
    }
}
