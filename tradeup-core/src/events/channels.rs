//! Event channel factories and handles.

use super::types::WinningEvent;
use tokio::sync::broadcast;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for WinningEvent events.
pub type WinnerSender = broadcast::Sender<WinningEvent>;
/// Receiver handle for WinningEvent events.
pub type WinnerReceiver = broadcast::Receiver<WinningEvent>;

/// Create a new WinningEvent channel.
///
/// Sending succeeds only while at least one receiver is alive; further
/// receivers come from [`broadcast::Sender::subscribe`].
pub fn winner_channel() -> (WinnerSender, WinnerReceiver) {
    broadcast::channel(DEFAULT_CHANNEL_BUFFER)
}
