//! Lifecycle notifications
//!
//! Subscribers get their own unbounded crossbeam receiver. Publishing never
//! blocks; senders whose receiver has been dropped are pruned on the next
//! publish.

use super::AnalysisStage;
use crate::types::AnalysisResult;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

/// Something that happened to one file
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    /// Analysis of the file has begun
    Started { file_path: String },
    /// A fresh result was computed and stored
    Completed { result: Box<AnalysisResult> },
    /// A stored result was still fresh and was returned as-is
    Cached { file_path: String },
    /// Analysis stopped at `stage`
    Error {
        file_path: String,
        stage: AnalysisStage,
        message: String,
    },
}

impl AnalysisEvent {
    pub fn file_path(&self) -> &str {
        match self {
            AnalysisEvent::Started { file_path }
            | AnalysisEvent::Cached { file_path }
            | AnalysisEvent::Error { file_path, .. } => file_path,
            AnalysisEvent::Completed { result } => &result.file_path,
        }
    }
}

/// Fan-out of [`AnalysisEvent`]s to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<AnalysisEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber; events published from now on are delivered to it
    pub fn subscribe(&self) -> Receiver<AnalysisEvent> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber
    pub fn publish(&self, event: AnalysisEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last publish
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives_events() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(AnalysisEvent::Started {
            file_path: "/x.wav".into(),
        });

        assert_eq!(a.try_recv().unwrap().file_path(), "/x.wav");
        assert_eq!(b.try_recv().unwrap().file_path(), "/x.wav");
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(AnalysisEvent::Cached {
            file_path: "/y.wav".into(),
        });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(matches!(keep.try_recv(), Ok(AnalysisEvent::Cached { .. })));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(AnalysisEvent::Error {
            file_path: "/z.wav".into(),
            stage: AnalysisStage::Decoding,
            message: "gone".into(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
