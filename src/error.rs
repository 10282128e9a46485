use std::fmt;

#[derive(Debug)]
pub enum SynthError {
    InvalidDelayTime { delay_time: f64 },
    InvalidChannelCount { channels: usize },
    InvalidFilterLength { length: usize },
    InvalidCornerFrequency { corner: f64 },
    DegenerateKernel { sum: f64 },
    InvalidRegion(RegionError),
    MissingSample { index: usize, pool_size: usize },
    InvalidNoteEvent { note: u8, velocity: u8, channel: u8 },
    InvalidChannel { channel: u8 },
    BufferShape { expected: usize, found: usize },
    InvalidSampleRate { sample_rate: u32 },
    InvalidMasterGain { gain: f64 },
    InvalidDuration { seconds: f64 },
    Config(serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionError {
    InvertedRange { field: &'static str, lo: u8, hi: u8 },
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },
    InvalidLoop { start: u64, end: u64 },
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidDelayTime { delay_time } => {
                write!(f, "Delay time must be positive and at least one sample, got {delay_time}")
            }
            SynthError::InvalidChannelCount { channels } => {
                write!(f, "Invalid channel count {channels}")
            }
            SynthError::InvalidFilterLength { length } => {
                write!(f, "Invalid filter length {length}")
            }
            SynthError::InvalidCornerFrequency { corner } => {
                write!(f, "Corner frequency {corner} outside normalized range [0, 0.5]")
            }
            SynthError::DegenerateKernel { sum } => {
                write!(f, "Filter kernel cannot be normalized, coefficient sum is {sum}")
            }
            SynthError::InvalidRegion(e) => write!(f, "Region error: {e}"),
            SynthError::MissingSample { index, pool_size } => {
                write!(f, "Region references sample {index} but the pool holds {pool_size}")
            }
            SynthError::InvalidNoteEvent { note, velocity, channel } => write!(
                f,
                "Invalid note event (note {note}, velocity {velocity}, channel {channel})"
            ),
            SynthError::InvalidChannel { channel } => {
                write!(f, "MIDI channel {channel} out of range 0..=15")
            }
            SynthError::BufferShape { expected, found } => {
                write!(f, "Buffer shape mismatch: expected {expected}, found {found}")
            }
            SynthError::InvalidSampleRate { sample_rate } => {
                write!(f, "Sample rate must be positive, got {sample_rate}")
            }
            SynthError::InvalidMasterGain { gain } => {
                write!(f, "Master gain must be finite and non-negative, got {gain}")
            }
            SynthError::InvalidDuration { seconds } => {
                write!(f, "Render duration of {seconds} s is too long")
            }
            SynthError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthError::Config(e) => Some(e),
            SynthError::InvalidRegion(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::InvertedRange { field, lo, hi } => {
                write!(f, "{field} range is inverted ({lo} > {hi})")
            }
            RegionError::OutOfRange { field, value, min, max } => {
                write!(f, "{field} = {value} outside [{min}, {max}]")
            }
            RegionError::InvalidLoop { start, end } => {
                write!(f, "Loop start {start} is past loop end {end}")
            }
        }
    }
}

impl std::error::Error for RegionError {}

impl From<RegionError> for SynthError {
    fn from(e: RegionError) -> Self {
        SynthError::InvalidRegion(e)
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(e: serde_json::Error) -> Self {
        SynthError::Config(e)
    }
}
