use crate::error::{Error, Result};

/// Lifecycle of an archive.
///
/// Output archives move `Open -> Writing -> Closing -> Closed`, input archives
/// move `Open -> Reading -> Closed`. An error returned by any operation also
/// moves the archive to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveState {
    /// Created, nothing processed yet.
    Open,
    Writing,
    Reading,
    /// The format is flushing its output.
    Closing,
    /// Every further operation fails with [`Error::Closed`].
    Closed,
}

impl ArchiveState {
    /// Moves into `active` for an operation, or rejects it.
    pub(crate) fn enter(&mut self, active: ArchiveState) -> Result<()> {
        match *self {
            Self::Open => {
                *self = active;
                Ok(())
            }
            Self::Closing | Self::Closed => Err(Error::Closed),
            _ => Ok(()),
        }
    }

    #[inline]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::ArchiveState;

    #[test]
    fn open_becomes_active_once() {
        let mut state = ArchiveState::Open;
        state.enter(ArchiveState::Writing).unwrap();
        assert_eq!(state, ArchiveState::Writing);
        state.enter(ArchiveState::Writing).unwrap();
        assert_eq!(state, ArchiveState::Writing);
    }

    #[test]
    fn closed_rejects() {
        let mut state = ArchiveState::Closed;
        assert!(state.enter(ArchiveState::Reading).is_err());
        assert!(state.is_closed());
    }
}
