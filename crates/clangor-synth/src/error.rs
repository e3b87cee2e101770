//! Error types for rendering.

use thiserror::Error;

/// Reasons a render produced no output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The cancel flag was raised before the render finished.
    #[error("render cancelled")]
    Cancelled,

    /// The worker rendering a channel panicked.
    #[error("render of channel {0} panicked")]
    ChannelPanicked(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(RenderError::Cancelled.to_string(), "render cancelled");
        assert_eq!(
            RenderError::ChannelPanicked(1).to_string(),
            "render of channel 1 panicked"
        );
    }
}
