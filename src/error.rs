use std::fmt;

/// Precondition violations surfaced to the host. Empty paths and missing
/// history are not errors; they are ordinary results.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    EmptyGrid,
    RaggedRow { row: usize, expected: usize, found: usize },
    UnknownTile { ch: char, x: usize, y: usize },
    OpenBorder { x: usize, y: usize },
    OutOfBounds { x: f32, y: f32 },
    Config(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid has no cells"),
            Self::RaggedRow {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} cells, expected {}",
                row, found, expected
            ),
            Self::UnknownTile { ch, x, y } => {
                write!(f, "unknown tile character '{}' at ({}, {})", ch, x, y)
            }
            Self::OpenBorder { x, y } => write!(f, "border cell ({}, {}) is not a wall", x, y),
            Self::OutOfBounds { x, y } => {
                write!(f, "position ({:.1}, {:.1}) is outside the grid", x, y)
            }
            Self::Config(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
