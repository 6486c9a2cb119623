use std::fmt;

/// Errors raised by clock operations on well-typed but invalid trees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// `Id::split` was handed a tree outside the normal-form shapes it
    /// accepts (a node whose children are both `0`).
    #[error("cannot split identity {id}: tree is not in normal form")]
    InvalidSplit { id: String },

    /// An effective event count would exceed `u32::MAX`.
    #[error("event counter exceeds u32::MAX")]
    CounterOverflow,
}

impl ClockError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSplit { .. } => ErrorCode::InvalidSplit,
            Self::CounterOverflow => ErrorCode::CounterOverflow,
        }
    }
}

/// Errors returned while decoding the compact wire format or its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// More bits were required than the input holds.
    #[error("unexpected end of input: needed {needed} bits, {remaining} remaining")]
    UnexpectedEof { needed: u32, remaining: usize },

    /// A single read asked for more than 32 bits.
    #[error("bit read width {0} exceeds 32")]
    WidthTooLarge(u32),

    /// A universal-coded natural does not fit in a `u32` counter.
    #[error("encoded natural number overflows a 32-bit counter")]
    NaturalOverflow,

    /// A tag bit disagrees with the structure it announces.
    #[error("inconsistent tag at bit {position}: {detail}")]
    InconsistentTag { position: usize, detail: &'static str },

    /// Tree nesting exceeded the configured maximum depth.
    #[error("tree depth exceeds configured maximum of {0}")]
    DepthExceeded(usize),

    /// Input is larger than the configured maximum.
    #[error("input of {actual} bytes exceeds configured maximum of {max}")]
    InputTooLarge { actual: usize, max: usize },

    /// Non-padding data remained after a complete stamp was parsed.
    #[error("{0} unparsed bits after stamp are not zero padding")]
    TrailingData(usize),

    /// The text form is missing its prefix or is not valid hex.
    #[error("invalid stamp text: {0}")]
    InvalidText(String),
}

impl DecodeError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnexpectedEof { .. } => ErrorCode::TruncatedInput,
            Self::WidthTooLarge(_) | Self::NaturalOverflow => ErrorCode::ValueOutOfRange,
            Self::InconsistentTag { .. } | Self::TrailingData(_) => ErrorCode::MalformedStamp,
            Self::DepthExceeded(_) | Self::InputTooLarge { .. } => ErrorCode::LimitExceeded,
            Self::InvalidText(_) => ErrorCode::InvalidText,
        }
    }
}

/// Machine-readable error codes for tooling built on top of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidSplit,
    CounterOverflow,
    TruncatedInput,
    ValueOutOfRange,
    MalformedStamp,
    LimitExceeded,
    InvalidText,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidSplit => "E2001",
            Self::CounterOverflow => "E2002",
            Self::TruncatedInput => "E3001",
            Self::ValueOutOfRange => "E3002",
            Self::MalformedStamp => "E3003",
            Self::LimitExceeded => "E3004",
            Self::InvalidText => "E3005",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidSplit => "Identity tree cannot be split",
            Self::CounterOverflow => "Event counter is saturated",
            Self::TruncatedInput => "Stamp bytes are truncated",
            Self::ValueOutOfRange => "Encoded value out of range",
            Self::MalformedStamp => "Malformed stamp encoding",
            Self::LimitExceeded => "Decoder limit exceeded",
            Self::InvalidText => "Invalid stamp text",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix the TOML syntax in the config file and retry."),
            Self::InvalidSplit => {
                Some("Normalize the identity tree before forking; this usually means a bug upstream.")
            }
            Self::CounterOverflow => {
                Some("The stamp's owned counters are at u32::MAX; no further events can be recorded.")
            }
            Self::TruncatedInput => Some("Make sure the full stamp was received before decoding."),
            Self::ValueOutOfRange | Self::MalformedStamp => None,
            Self::LimitExceeded => Some("Raise codec.max_depth or codec.max_input_bytes if the input is trusted."),
            Self::InvalidText => Some("Stamp text looks like `itc:v1:` followed by hex digits."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
