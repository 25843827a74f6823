//! Bounded, stoppable sample delivery from a device sensor to a consumer.
//!
//! The consumer holds a [`SampleStream`]; stopping or dropping it closes the
//! channel, which the producing adapter observes through
//! [`SampleFeed::closed`] and uses to release the underlying sensor.

use tokio::sync::mpsc;

/// Create a connected feed/stream pair.
pub fn sample_channel<T>(buffer: usize) -> (SampleFeed<T>, SampleStream<T>) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    (SampleFeed { sender }, SampleStream { receiver })
}

/// Producer half, owned by the sensor adapter.
#[derive(Debug)]
pub struct SampleFeed<T> {
    sender: mpsc::Sender<T>,
}

impl<T> SampleFeed<T> {
    /// Deliver a sample. Returns false once the consumer has stopped.
    pub async fn send(&self, sample: T) -> bool {
        self.sender.send(sample).await.is_ok()
    }

    /// Deliver without waiting; drops the sample if the buffer is full.
    pub fn try_send(&self, sample: T) -> bool {
        match self.sender.try_send(sample) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves when the consumer stops or drops the stream.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct SampleStream<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> SampleStream<T> {
    /// Next sample, or `None` once the producer is gone or the stream stopped
    /// and drained.
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Stop the producer. Samples already buffered can still be drained.
    pub fn stop(&mut self) {
        self.receiver.close();
    }
}
