//! Frequency-ratio series for resonator taps.
//!
//! Each [`PitchType`] names a sequence of partial ratios relative to the
//! fundamental. Tap `i` of a resonator uses ratio `i` of the series; the
//! short fixed tables repeat cyclically.

use core::fmt;
use core::str::FromStr;

use clangor_core::math::{CIRCULAR_MEMBRANE_MODES, next_prime};

const HARMONIC_PLUS_12: [f64; 16] = [
    1.0, 4.0, 5.0, 12.0, 13.0, 15.0, 16.0, 24.0, 25.0, 31.0, 32.0, 33.0, 48.0, 49.0, 63.0, 64.0,
];

const HARMONIC_TIMES_5: [f64; 17] = [
    1.0, 5.0, 8.0, 10.0, 15.0, 16.0, 20.0, 24.0, 25.0, 30.0, 32.0, 35.0, 40.0, 45.0, 50.0, 55.0,
    60.0,
];

const HARMONIC_CYCLE_1_5: [f64; 2] = [1.0, 5.0];

const SEMITONE_1_2_7_9: [f64; 4] = [1.0, 8.0 / 7.0, 3.0 / 2.0, 5.0 / 3.0];

/// Partial series used to tune resonator taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitchType {
    /// `1, 2, 3, …`
    #[default]
    Harmonic,
    /// Harmonics clustered around octaves (`1, 4, 5, 12, 13, …`).
    HarmonicPlus12,
    /// Harmonics favouring multiples of 5 and 8.
    HarmonicTimes5,
    /// Alternates `1, 5`.
    HarmonicCycle15,
    /// Odd harmonics `1, 3, 5, …`
    HarmonicOdd,
    /// Just ratios of unison, major second, fifth, and major sixth.
    Semitone1279,
    /// Modes of an ideal circular membrane.
    CircularMembraneMode,
    /// Successive primes from 2, halved.
    Prime,
    /// Octaves `1, 2, 4, …`
    Octave,
}

impl PitchType {
    /// Every series, in menu order.
    pub const ALL: [PitchType; 9] = [
        Self::Harmonic,
        Self::HarmonicPlus12,
        Self::HarmonicTimes5,
        Self::HarmonicCycle15,
        Self::HarmonicOdd,
        Self::Semitone1279,
        Self::CircularMembraneMode,
        Self::Prime,
        Self::Octave,
    ];

    /// Name used in presets and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Harmonic => "harmonic",
            Self::HarmonicPlus12 => "harmonic-plus-12",
            Self::HarmonicTimes5 => "harmonic-times-5",
            Self::HarmonicCycle15 => "harmonic-cycle-1-5",
            Self::HarmonicOdd => "harmonic-odd",
            Self::Semitone1279 => "semitone-1-2-7-9",
            Self::CircularMembraneMode => "circular-membrane-mode",
            Self::Prime => "prime",
            Self::Octave => "octave",
        }
    }

    /// Looks up a series by menu index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for PitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown pitch series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPitchType;

impl fmt::Display for UnknownPitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown pitch type")
    }
}

impl std::error::Error for UnknownPitchType {}

impl FromStr for PitchType {
    type Err = UnknownPitchType;

    /// Accepts a series name or its menu index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Self::from_index(index).ok_or(UnknownPitchType);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownPitchType)
    }
}

/// Ratios `2, 3, 5, 7, …` divided by 2, so the series starts at 1.
pub fn prime_ratios(len: usize) -> Vec<f64> {
    let mut prime = 2;
    let mut ratios = Vec::with_capacity(len);
    for _ in 0..len {
        ratios.push(prime as f64 / 2.0);
        prime = next_prime(prime);
    }
    ratios
}

/// The first `len` ratios of a [`PitchType`].
#[derive(Debug, Clone)]
pub struct PitchSeries {
    ratios: Vec<f64>,
}

impl PitchSeries {
    /// Materializes `len` ratios of `kind`.
    pub fn new(kind: PitchType, len: usize) -> Self {
        let ratios = match kind {
            PitchType::Prime => prime_ratios(len),
            _ => (0..len).map(|i| Self::ratio_at(kind, i)).collect(),
        };
        Self { ratios }
    }

    fn ratio_at(kind: PitchType, i: usize) -> f64 {
        let n = i as f64;
        match kind {
            PitchType::Harmonic => n + 1.0,
            PitchType::HarmonicPlus12 => HARMONIC_PLUS_12[i % HARMONIC_PLUS_12.len()],
            PitchType::HarmonicTimes5 => HARMONIC_TIMES_5[i % HARMONIC_TIMES_5.len()],
            PitchType::HarmonicCycle15 => HARMONIC_CYCLE_1_5[i % HARMONIC_CYCLE_1_5.len()],
            PitchType::HarmonicOdd => 2.0 * n + 1.0,
            PitchType::Semitone1279 => SEMITONE_1_2_7_9[i % SEMITONE_1_2_7_9.len()],
            PitchType::CircularMembraneMode => {
                CIRCULAR_MEMBRANE_MODES[i % CIRCULAR_MEMBRANE_MODES.len()]
            }
            PitchType::Prime => prime_ratios(i + 1)[i],
            PitchType::Octave => libm::exp2(n),
        }
    }

    /// Ratio for tap `index`; 1 past the end.
    pub fn ratio(&self, index: usize) -> f64 {
        self.ratios.get(index).copied().unwrap_or(1.0)
    }

    /// Number of ratios.
    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}
