use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;

/// Serializes requests and holds each one for a fixed delay after it completes,
/// so no two requests through the same gate finish closer than `delay`.
pub struct RequestGate {
    delay: Duration,
    lock: Mutex<()>,
}

impl RequestGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            lock: Mutex::new(()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn run<F, T>(&self, request: F) -> T
    where
        F: Future<Output = T>,
    {
        let _turn = self.lock.lock().await;
        let output = request.await;
        tokio::time::sleep(self.delay).await;
        output
    }
}
