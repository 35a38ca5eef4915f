use crate::provider::{client::Client, ProviderError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::{
    mpsc::{channel, Receiver, Sender},
    Mutex,
};
use std::thread;

type TransportReceiver = Receiver<Result<Value, ProviderError>>;

#[derive(Debug)]
pub struct WalletClient {
    transport: Mutex<(Sender<Value>, TransportReceiver)>,
}

impl Client for WalletClient {
    type Error = ProviderError;
    fn request<S: Serialize + Debug, D: DeserializeOwned + Debug>(
        &self,
        method: &str,
        params: Option<S>,
    ) -> Result<D, Self::Error> {
        let req = json!({"method": method, "params": params});
        let connection = self.transport.lock().expect("Failed to unlock");
        connection
            .0
            .send(req)
            .expect("Mock client failed to send request");
        connection
            .1
            .recv()
            .expect("Mock client failed to receive response")
            .map(|value| serde_json::from_value(value).unwrap())
    }
}

/// A scripted wallet provider process. Requests must arrive in the given
/// order; a `Some` body is asserted against the incoming request.
pub struct Wallet {
    requests: Vec<(Option<Value>, Result<Value, ProviderError>)>,
}

impl Wallet {
    pub fn new(requests: Vec<(Option<Value>, Result<Value, ProviderError>)>) -> Self {
        Self { requests }
    }

    pub fn run(self) -> WalletClient {
        let (client_sender, wallet_receiver) = channel();
        let (wallet_sender, client_receiver) = channel();

        thread::spawn(move || {
            let mut requests = self.requests.into_iter();
            while let Ok(msg) = wallet_receiver.recv() {
                let request = requests
                    .next()
                    .expect("Mock wallet must have all requests mocked in the right order");
                if let Some(body) = request.0 {
                    assert_eq!(body, msg);
                }
                wallet_sender
                    .send(request.1)
                    .expect("Mock wallet failed to send response")
            }
            // close the wallet -> client channel after
            // the client -> wallet channel is closed.
            // (client -> wallet channel is closed when WalletClient is dropped)
            drop(wallet_sender);
        });

        WalletClient {
            transport: Mutex::new((client_sender, client_receiver)),
        }
    }
}
