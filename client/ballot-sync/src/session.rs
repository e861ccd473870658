use ballot_interface::services::wallet::Wallet;
use ballot_interface::Address;
use tokio::sync::watch;
use tracing::info;

/// An address connected on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Connected account.
    pub address: Address,
    /// Chain the account is connected on.
    pub chain_id: u64,
}

impl Connection {
    /// The connection a wallet represents.
    pub fn of<W: Wallet + ?Sized>(wallet: &W) -> Self {
        Self {
            address: wallet.address(),
            chain_id: wallet.chain_id(),
        }
    }
}

/// The wallet connection state, observable by the synchronizer.
///
/// The session owns the channel: once it is dropped, subscribers see the channel close and the
/// synchronizer stops.
#[derive(Debug)]
pub struct WalletSession {
    sender: watch::Sender<Option<Connection>>,
}

impl WalletSession {
    /// Creates a disconnected session.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Connects, replacing any previous connection.
    pub fn connect(&self, connection: Connection) {
        info!(address = ?connection.address, chain_id = connection.chain_id, "Wallet connected");
        self.sender.send_replace(Some(connection));
    }

    /// Disconnects. Does nothing if already disconnected.
    pub fn disconnect(&self) {
        let was_connected = self.sender.send_if_modified(|current| current.take().is_some());
        if was_connected {
            info!("Wallet disconnected");
        }
    }

    /// The current connection, if any.
    pub fn current(&self) -> Option<Connection> {
        *self.sender.borrow()
    }

    /// Subscribes to connection changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Connection>> {
        self.sender.subscribe()
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_disconnect() {
        let session = WalletSession::new();
        let mut receiver = session.subscribe();
        assert_eq!(None, session.current());

        let connection = Connection {
            address: Address::repeat_byte(1),
            chain_id: 31_337,
        };
        session.connect(connection);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(Some(connection), *receiver.borrow_and_update());

        session.disconnect();
        assert_eq!(None, *receiver.borrow_and_update());

        // A second disconnect is not a change.
        session.disconnect();
        assert!(!receiver.has_changed().unwrap());
    }
}
