/// Controller state.
///
/// ```text
/// idle ⇄ buffering
/// ```
///
/// Exports do not change state; they can run in either.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferState {
    Idle,
    Buffering { buffered_secs: f64 },
}

impl BufferState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_buffering(&self) -> bool {
        matches!(self, Self::Buffering { .. })
    }

    /// Seconds of real audio currently held, if buffering.
    pub fn buffered_secs(&self) -> Option<f64> {
        match self {
            Self::Buffering { buffered_secs } => Some(*buffered_secs),
            Self::Idle => None,
        }
    }
}
