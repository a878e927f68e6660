//! Map loading errors

use thiserror::Error;

/// A map byte stream that cannot be turned into a grid (or a grid that
/// cannot be written as one).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The stream ended in the middle of a record.
    #[error("map data truncated at byte {offset} while reading {what}")]
    Truncated {
        /// Byte offset where the read started.
        offset: usize,
        /// The field being read.
        what: &'static str,
    },

    /// A string length prefix ran past five groups or the bytes were not UTF-8.
    #[error("malformed string at byte {offset}")]
    InvalidString {
        /// Byte offset of the length prefix.
        offset: usize,
    },

    /// A row declared a code width other than 1 or 2 bytes.
    #[error("invalid code width flag {flag} in layer {layer}, row {row}")]
    InvalidCodeWidth {
        /// Layer index.
        layer: usize,
        /// Row index.
        row: u16,
        /// The flag byte found.
        flag: u8,
    },

    /// A row record addressed a row past the grid height.
    #[error("row {row} out of range in layer {layer} (height {height})")]
    RowOutOfRange {
        /// Layer index.
        layer: usize,
        /// Row index read.
        row: u16,
        /// Grid height.
        height: u16,
    },

    /// A run length of zero, or a run running past the end of the row.
    #[error("invalid run of {run} at column {column} in layer {layer}, row {row}")]
    InvalidRun {
        /// Layer index.
        layer: usize,
        /// Row index.
        row: u16,
        /// Column where the sentinel was read.
        column: usize,
        /// Run length read.
        run: u16,
    },

    /// The main or phantom layer index does not name a stored layer.
    #[error("{which} layer {index} out of range ({count} layers)")]
    LayerOutOfRange {
        /// `"main"` or `"phantom"`.
        which: &'static str,
        /// Index found.
        index: u8,
        /// Number of layers.
        count: usize,
    },

    /// The header describes more cells than a map may hold.
    #[error("grid of {width}x{height}x{layers} cells is too large")]
    GridTooLarge {
        /// Width in cells.
        width: u16,
        /// Height in cells.
        height: u16,
        /// Layer count.
        layers: usize,
    },

    /// Animation kind byte outside the known range.
    #[error("unknown animation kind {0}")]
    UnknownAnimationKind(u8),

    /// A code that collides with the run sentinel in every width.
    #[error("tile code {code:#06x} at layer {layer} ({x}, {y}) cannot be encoded")]
    UnencodableCode {
        /// Layer index.
        layer: usize,
        /// Column.
        x: usize,
        /// Row.
        y: usize,
        /// Offending code.
        code: u16,
    },

    /// A field too long for its length prefix (strings) or count (layers).
    #[error("{what} does not fit the map format")]
    Oversized {
        /// The field being written.
        what: &'static str,
    },
}

/// Errors loading a map from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    /// The file was read but is not a valid map.
    #[error("invalid map file: {0}")]
    Format(#[from] FormatError),
}
