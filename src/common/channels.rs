//! Channel type definitions for inter-task communication

use tokio::sync::watch;

/// Sender half of the shutdown signal
pub type ShutdownSender = watch::Sender<bool>;

/// Receiver half of the shutdown signal
pub type ShutdownReceiver = watch::Receiver<bool>;

/// Create a new shutdown channel, initially not signalled
pub fn create_shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

/// Check whether shutdown has been requested without waiting
pub fn is_shutdown(receiver: &ShutdownReceiver) -> bool {
    *receiver.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_signal() {
        let (tx, rx) = create_shutdown_channel();
        assert!(!is_shutdown(&rx));
        tx.send(true).unwrap();
        assert!(is_shutdown(&rx));
    }
}
