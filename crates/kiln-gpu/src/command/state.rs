use crate::device::{GpuError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum PassKind {
    Compute,
    Render,
}

impl PassKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            PassKind::Compute => "compute",
            PassKind::Render => "render",
        }
    }
}

/// Lifecycle of a command session.
///
/// `Recording -> InPass -> Recording -> ... -> Finished`. Nothing leaves
/// `Finished`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum EncoderState {
    Recording,
    InPass(PassKind),
    Finished,
}

impl EncoderState {
    /// Succeeds only while recording outside of any pass.
    pub(crate) fn ensure_recording(&self) -> Result<()> {
        match self {
            EncoderState::Recording => Ok(()),
            EncoderState::InPass(kind) => Err(GpuError::PassOpen(kind.name())),
            EncoderState::Finished => Err(GpuError::AlreadyFinished),
        }
    }

    pub(crate) fn begin_pass(&mut self, kind: PassKind) -> Result<()> {
        self.ensure_recording()?;
        *self = EncoderState::InPass(kind);
        Ok(())
    }

    pub(crate) fn end_pass(&mut self, kind: PassKind) {
        debug_assert_eq!(*self, EncoderState::InPass(kind));
        *self = EncoderState::Recording;
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        self.ensure_recording()?;
        *self = EncoderState::Finished;
        Ok(())
    }
}
