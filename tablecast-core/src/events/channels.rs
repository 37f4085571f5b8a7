//! Event channel factories and handles.

use super::types::ChangeEvent;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// The listener never waits on a full channel: events that do not fit are
/// dropped and logged.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for ChangeEvent events.
pub type ChangeEventSender = mpsc::Sender<ChangeEvent>;
/// Receiver handle for ChangeEvent events.
pub type ChangeEventReceiver = mpsc::Receiver<ChangeEvent>;

/// Create a new ChangeEvent channel.
///
/// Returns a (sender, receiver) pair connecting the listener to the
/// forwarder.
pub fn change_event_channel() -> (ChangeEventSender, ChangeEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
