//! Stage/progress rules applied to an `IngestFile`.
//!
//! These are the only functions that change a file's `status` or
//! `progress`. They enforce forward-only transitions and non-decreasing
//! progress within a stage.

use ragdesk_types::file::{FileStatus, IngestFile, PROGRESS_COMPLETE};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal file transition {from} -> {to}")]
pub struct TransitionError {
    pub from: FileStatus,
    pub to: FileStatus,
}

/// Move `file` into `next`, returning the previous status.
///
/// Entering `Uploading` or `Processing` resets progress to 0, entering
/// `Completed` pins it at 100, and entering `Error` freezes it.
pub fn transition(file: &mut IngestFile, next: FileStatus) -> Result<FileStatus, TransitionError> {
    let from = file.status;
    if !from.can_transition_to(next) {
        return Err(TransitionError { from, to: next });
    }

    file.status = next;
    match next {
        FileStatus::Uploading | FileStatus::Processing => file.progress = 0,
        FileStatus::Completed => file.progress = PROGRESS_COMPLETE,
        FileStatus::Queued | FileStatus::Error => {}
    }
    Ok(from)
}

/// Advance progress by `step`, never past `ceiling` (or 100).
///
/// Returns `true` if progress changed. Has no effect outside an active stage.
pub fn advance(file: &mut IngestFile, step: u8, ceiling: u8) -> bool {
    if !file.status.is_active_stage() {
        return false;
    }
    let ceiling = ceiling.min(PROGRESS_COMPLETE);
    if file.progress >= ceiling {
        return false;
    }
    file.progress = file.progress.saturating_add(step).min(ceiling);
    true
}

/// Ceiling for progress while the stage's backend call is still in flight.
///
/// Holds one step short of 100 so a stage never looks finished before the
/// backend has answered.
pub fn pending_ceiling(step: u8) -> u8 {
    PROGRESS_COMPLETE.saturating_sub(step).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_types::file::FileDescriptor;

    fn queued() -> IngestFile {
        IngestFile::queued(&FileDescriptor::new(
            "report.pdf",
            "application/pdf",
            vec![0; 16],
        ))
    }

    #[test]
    fn test_full_lifecycle_resets_progress_per_stage() {
        let mut file = queued();

        assert_eq!(transition(&mut file, FileStatus::Uploading).unwrap(), FileStatus::Queued);
        assert_eq!(file.progress, 0);
        while advance(&mut file, 10, 100) {}
        assert_eq!(file.progress, 100);

        transition(&mut file, FileStatus::Processing).unwrap();
        assert_eq!(file.progress, 0);
        while advance(&mut file, 30, 100) {}
        assert_eq!(file.progress, 100);

        transition(&mut file, FileStatus::Completed).unwrap();
        assert_eq!(file.progress, 100);
        assert!(!advance(&mut file, 10, 100));
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let mut file = queued();
        transition(&mut file, FileStatus::Uploading).unwrap();
        transition(&mut file, FileStatus::Processing).unwrap();

        let err = transition(&mut file, FileStatus::Uploading).unwrap_err();
        assert_eq!(err.from, FileStatus::Processing);
        assert_eq!(file.status, FileStatus::Processing);
    }

    #[test]
    fn test_error_freezes_progress() {
        let mut file = queued();
        transition(&mut file, FileStatus::Uploading).unwrap();
        advance(&mut file, 10, 100);
        advance(&mut file, 10, 100);

        transition(&mut file, FileStatus::Error).unwrap();
        assert_eq!(file.progress, 20);
        assert!(!advance(&mut file, 10, 100));
        assert!(transition(&mut file, FileStatus::Processing).is_err());
    }

    #[test]
    fn test_queued_cannot_fail_directly() {
        let mut file = queued();
        assert!(transition(&mut file, FileStatus::Error).is_err());
    }

    #[test]
    fn test_advance_respects_ceiling_and_is_monotonic() {
        let mut file = queued();
        transition(&mut file, FileStatus::Uploading).unwrap();

        let mut last = file.progress;
        while advance(&mut file, 15, pending_ceiling(15)) {
            assert!(file.progress > last);
            last = file.progress;
        }
        assert_eq!(file.progress, 85);

        assert!(advance(&mut file, 15, 100));
        assert_eq!(file.progress, 100);
    }

    #[test]
    fn test_pending_ceiling_never_zero() {
        assert_eq!(pending_ceiling(10), 90);
        assert_eq!(pending_ceiling(100), 1);
    }
}
