use crate::models::error::{BufferError, ExportError};
use crate::models::recording_result::ExportedRecording;
use crate::models::state::BufferState;

/// Event delegate for controller notifications.
///
/// Export events arrive on whichever thread ran the export (the worker for
/// background saves). Implementations marshal to a UI thread if needed.
pub trait BufferDelegate: Send + Sync {
    /// Called when buffering starts or stops.
    fn on_state_changed(&self, state: &BufferState);

    /// Called when a save finished and the file is complete on disk.
    fn on_export_finished(&self, recording: &ExportedRecording);

    /// Called when a save failed. Buffering is unaffected.
    fn on_export_failed(&self, error: &ExportError);

    /// Called when starting or stopping the capture source fails.
    fn on_error(&self, error: &BufferError);
}
