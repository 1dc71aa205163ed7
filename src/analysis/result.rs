//! Analysis result types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::orchestrator::AnalysisStage;
use crate::error::AnalysisError;
use crate::features::period::TempoSource;

/// Root names in pitch-class order
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Circle of fifths from C: C, G, D, A, E, B, F#, C#, G#, D#, A#, F
const CIRCLE_OF_FIFTHS_MAJOR: [usize; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

/// Relative minors in the same order: Am, Em, Bm, F#m, C#m, G#m, D#m, A#m, Fm, Cm, Gm, Dm
const CIRCLE_OF_FIFTHS_MINOR: [usize; 12] = [9, 4, 11, 6, 1, 8, 3, 10, 5, 0, 7, 2];

/// One of the 12 pitch classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    /// C
    C,
    /// C♯ / D♭
    CSharp,
    /// D
    D,
    /// D♯ / E♭
    DSharp,
    /// E
    E,
    /// F
    F,
    /// F♯ / G♭
    FSharp,
    /// G
    G,
    /// G♯ / A♭
    GSharp,
    /// A
    A,
    /// A♯ / B♭
    ASharp,
    /// B
    B,
}

impl PitchClass {
    /// All pitch classes, C first
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Index 0 (C) through 11 (B)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class for `index`, wrapping modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Sharp-spelled name, e.g. `"F#"`
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }

    /// Parse a sharp-spelled name (case-insensitive), e.g. `"c#"`
    pub fn from_name(name: &str) -> Option<Self> {
        NOTE_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(Self::from_index)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Major or minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Major mode
    Major,
    /// Minor mode
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => f.write_str("Major"),
            Mode::Minor => f.write_str("Minor"),
        }
    }
}

/// Musical key: root pitch class plus mode
///
/// Displays and serializes as `"<Root> <Major|Minor>"`, e.g. `"F# Minor"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Key {
    /// Tonic
    pub root: PitchClass,
    /// Major or minor
    pub mode: Mode,
}

impl Key {
    /// Create a key
    pub const fn new(root: PitchClass, mode: Mode) -> Self {
        Self { root, mode }
    }

    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use tempo_key_dsp::analysis::result::{Key, Mode, PitchClass};
    ///
    /// assert_eq!(Key::new(PitchClass::C, Mode::Major).name(), "C");
    /// assert_eq!(Key::new(PitchClass::A, Mode::Minor).name(), "Am");
    /// ```
    pub fn name(&self) -> String {
        match self.mode {
            Mode::Major => self.root.name().to_string(),
            Mode::Minor => format!("{}m", self.root.name()),
        }
    }

    /// Get key in DJ numerical notation along the circle of fifths
    ///
    /// Major keys are `1A`–`12A` (1A = C, 2A = G, ...), minor keys are
    /// `1B`–`12B` (1B = Am, 2B = Em, ...), so relative keys share a number.
    ///
    /// # Example
    ///
    /// ```
    /// use tempo_key_dsp::analysis::result::{Key, Mode, PitchClass};
    ///
    /// assert_eq!(Key::new(PitchClass::G, Mode::Major).numerical(), "2A");
    /// assert_eq!(Key::new(PitchClass::E, Mode::Minor).numerical(), "2B");
    /// ```
    pub fn numerical(&self) -> String {
        let (circle, suffix) = match self.mode {
            Mode::Major => (&CIRCLE_OF_FIFTHS_MAJOR, 'A'),
            Mode::Minor => (&CIRCLE_OF_FIFTHS_MINOR, 'B'),
        };
        // Every pitch class occurs exactly once in each circle
        let position = circle
            .iter()
            .position(|&x| x == self.root.index())
            .unwrap_or(0);
        format!("{}{}", position + 1, suffix)
    }

    /// Parse DJ numerical notation (`"1A"`..`"12B"`)
    ///
    /// Returns `None` for anything else.
    pub fn from_numerical(notation: &str) -> Option<Self> {
        if notation.len() < 2 || !notation.is_ascii() {
            return None;
        }

        let (num_str, suffix) = notation.split_at(notation.len() - 1);
        let num: usize = num_str.parse().ok()?;
        if !(1..=12).contains(&num) {
            return None;
        }

        match suffix {
            "A" => Some(Key::new(
                PitchClass::from_index(CIRCLE_OF_FIFTHS_MAJOR[num - 1]),
                Mode::Major,
            )),
            "B" => Some(Key::new(
                PitchClass::from_index(CIRCLE_OF_FIFTHS_MINOR[num - 1]),
                Mode::Minor,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.mode)
    }
}

impl FromStr for Key {
    type Err = AnalysisError;

    /// Accepts `"C Major"`, `"a# minor"`, short names (`"C"`, `"Am"`) and
    /// numerical notation (`"8A"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AnalysisError::InvalidInput(format!("Unrecognized key: {:?}", s));

        let mut parts = s.split_whitespace();
        let (Some(first), second, None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        if let Some(mode) = second {
            let root = PitchClass::from_name(first).ok_or_else(invalid)?;
            let mode = if mode.eq_ignore_ascii_case("major") {
                Mode::Major
            } else if mode.eq_ignore_ascii_case("minor") {
                Mode::Minor
            } else {
                return Err(invalid());
            };
            return Ok(Key::new(root, mode));
        }

        if let Some(root) = PitchClass::from_name(first) {
            return Ok(Key::new(root, Mode::Major));
        }
        if let Some(root) = first.strip_suffix('m').and_then(PitchClass::from_name) {
            return Ok(Key::new(root, Mode::Minor));
        }
        Key::from_numerical(first).ok_or_else(invalid)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tempo in BPM, within `[60, 200]`
    pub tempo_bpm: u32,

    /// Detected key
    pub key: Key,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Path that produced the tempo
    pub tempo_source: TempoSource,

    /// Onset strategy used by the tempo path
    pub onset_method: String,

    /// Stages visited, in order
    pub stages: Vec<AnalysisStage>,

    /// Peaks accepted by the picker, when the onset path ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_count: Option<usize>,

    /// Valid inter-onset intervals, when the onset path got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_count: Option<usize>,

    /// Why the autocorrelation fallback ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,

    /// Correlation score of the detected key
    pub key_score: f32,

    /// Degenerate-input notes (short input, silent chroma, ...)
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name() {
        assert_eq!(Key::new(PitchClass::CSharp, Mode::Major).name(), "C#");
        assert_eq!(Key::new(PitchClass::B, Mode::Minor).name(), "Bm");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::new(PitchClass::C, Mode::Major).to_string(), "C Major");
        assert_eq!(Key::new(PitchClass::FSharp, Mode::Minor).to_string(), "F# Minor");
    }

    #[test]
    fn test_key_numerical_major() {
        assert_eq!(Key::new(PitchClass::C, Mode::Major).numerical(), "1A");
        assert_eq!(Key::new(PitchClass::FSharp, Mode::Major).numerical(), "7A");
        assert_eq!(Key::new(PitchClass::F, Mode::Major).numerical(), "12A");
    }

    #[test]
    fn test_key_numerical_minor() {
        assert_eq!(Key::new(PitchClass::A, Mode::Minor).numerical(), "1B");
        assert_eq!(Key::new(PitchClass::C, Mode::Minor).numerical(), "10B");
        assert_eq!(Key::new(PitchClass::D, Mode::Minor).numerical(), "12B");
    }

    #[test]
    fn test_key_from_numerical() {
        assert_eq!(
            Key::from_numerical("2A"),
            Some(Key::new(PitchClass::G, Mode::Major))
        );
        assert_eq!(
            Key::from_numerical("2B"),
            Some(Key::new(PitchClass::E, Mode::Minor))
        );
        assert_eq!(Key::from_numerical("0A"), None);
        assert_eq!(Key::from_numerical("13A"), None);
        assert_eq!(Key::from_numerical("1C"), None);
        assert_eq!(Key::from_numerical(""), None);
        assert_eq!(Key::from_numerical("A"), None);
    }

    #[test]
    fn test_key_numerical_roundtrip() {
        for root in PitchClass::ALL {
            for mode in [Mode::Major, Mode::Minor] {
                let key = Key::new(root, mode);
                assert_eq!(Key::from_numerical(&key.numerical()), Some(key));
            }
        }
    }

    #[test]
    fn test_key_from_str() {
        let a_minor = Key::new(PitchClass::A, Mode::Minor);
        assert_eq!("A Minor".parse::<Key>().unwrap(), a_minor);
        assert_eq!("a minor".parse::<Key>().unwrap(), a_minor);
        assert_eq!("Am".parse::<Key>().unwrap(), a_minor);
        assert_eq!("1B".parse::<Key>().unwrap(), a_minor);
        assert_eq!(
            "D#".parse::<Key>().unwrap(),
            Key::new(PitchClass::DSharp, Mode::Major)
        );
        assert!("H Major".parse::<Key>().is_err());
        assert!("C Dorian".parse::<Key>().is_err());
        assert!("C Major extra".parse::<Key>().is_err());
        assert!("".parse::<Key>().is_err());
    }

    #[test]
    fn test_key_serde_as_string() {
        let key = Key::new(PitchClass::GSharp, Mode::Minor);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"G# Minor\"");
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<Key>("\"Q Major\"").is_err());
    }

    #[test]
    fn test_pitch_class_index_roundtrip() {
        for (i, pc) in PitchClass::ALL.iter().enumerate() {
            assert_eq!(pc.index(), i);
            assert_eq!(PitchClass::from_index(i), *pc);
            assert_eq!(PitchClass::from_name(pc.name()), Some(*pc));
        }
        assert_eq!(PitchClass::from_index(14), PitchClass::D);
    }
}
