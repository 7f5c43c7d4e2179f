/// Error handling for the parser core.
///
/// Parsing is total by construction: every prefix is eventually absorbed by
/// a catch-all production, so the only error surfaces are internal ones.
use crate::ast::NodeKind;
use std::fmt;

/// Fatal conditions a parse can surface.
#[derive(Debug)]
pub enum MarkdownError {
    /// The structural label matcher met a node kind it cannot compare.
    Structural { kind: NodeKind },

    /// The grammar failed to consume at the top level. This indicates a bug
    /// in the engine or grammar, never bad input.
    Parse { position: usize, message: String },
}

impl fmt::Display for MarkdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkdownError::Structural { kind } => {
                write!(f, "structural match error: unexpected node kind {:?}", kind)
            }
            MarkdownError::Parse { position, message } => {
                write!(f, "parse error at byte {}: {}", position, message)
            }
        }
    }
}

impl std::error::Error for MarkdownError {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarkdownError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_kind() {
        let err = MarkdownError::Structural {
            kind: NodeKind::Link,
        };
        assert!(format!("{}", err).contains("Link"));
    }

    #[test]
    fn display_names_the_cursor_position() {
        let err = MarkdownError::Parse {
            position: 42,
            message: "top-level rule failed".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("42"));
        assert!(msg.contains("top-level"));
    }
}
