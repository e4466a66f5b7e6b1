use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    Envelope, FromMessage, Message, MessageConsumer, MessageError, MessageProducer,
};
use crate::blocks::{AnyBlock, Block};

type Decoder = fn(Message) -> Result<Box<dyn AnyBlock>, MessageError>;

fn decode<B: Block + FromMessage>(message: Message) -> Result<Box<dyn AnyBlock>, MessageError> {
    Ok(Box::new(B::from_message(message)?))
}

/// In-process transport backed by a bounded tokio channel
///
/// Every producer built from the returned sender publishes into the same
/// consumer, whatever its topic. The consumer ends once all senders and
/// producers are dropped.
pub fn channel(buffer: usize) -> (ChannelSender, ChannelConsumer) {
    let (tx, rx) = mpsc::channel(buffer);
    (
        ChannelSender { tx },
        ChannelConsumer {
            rx,
            decoders: HashMap::new(),
        },
    )
}

#[derive(Clone, Debug)]
pub struct ChannelSender {
    tx: mpsc::Sender<Envelope>,
}

impl ChannelSender {
    /// Producer publishing to `topic`
    pub fn producer(&self, topic: impl Into<String>) -> ChannelProducer {
        ChannelProducer {
            topic: topic.into(),
            tx: self.tx.clone(),
        }
    }

    pub async fn send(&self, envelope: Envelope) -> Result<(), MessageError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| MessageError::ChannelClosed)
    }
}

#[derive(Clone, Debug)]
pub struct ChannelProducer {
    topic: String,
    tx: mpsc::Sender<Envelope>,
}

#[async_trait]
impl MessageProducer for ChannelProducer {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, envelope: Envelope) -> Result<(), MessageError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| MessageError::ChannelClosed)
    }
}

pub struct ChannelConsumer {
    rx: mpsc::Receiver<Envelope>,
    decoders: HashMap<String, HashMap<&'static str, Decoder>>,
}

impl std::fmt::Debug for ChannelConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let watched: HashMap<&str, Vec<&str>> = self
            .decoders
            .iter()
            .map(|(topic, decoders)| (topic.as_str(), decoders.keys().copied().collect()))
            .collect();
        f.debug_struct("ChannelConsumer")
            .field("watched", &watched)
            .finish()
    }
}

impl ChannelConsumer {
    /// Accept blocks of type `B` arriving on `topic`
    pub fn watch<B: Block + FromMessage>(&mut self, topic: impl Into<String>) -> &mut Self {
        self.decoders
            .entry(topic.into())
            .or_default()
            .insert(B::type_name(), decode::<B>);
        self
    }

    /// Reconstruct the block carried by an envelope
    pub fn decode(&self, envelope: Envelope) -> Result<Box<dyn AnyBlock>, MessageError> {
        let Some(type_name) = envelope.block_type().map(str::to_string) else {
            return Err(MessageError::MissingTypeHeader {
                topic: envelope.topic,
            });
        };

        let decoder = self
            .decoders
            .get(&envelope.topic)
            .and_then(|decoders| decoders.get(type_name.as_str()))
            .ok_or_else(|| MessageError::UnknownBlockType {
                topic: envelope.topic.clone(),
                type_name,
            })?;

        decoder(envelope.message)
    }
}

#[async_trait]
impl MessageConsumer for ChannelConsumer {
    async fn next(&mut self) -> Option<Result<Box<dyn AnyBlock>, MessageError>> {
        while let Some(envelope) = self.rx.recv().await {
            match self.decode(envelope) {
                Err(e @ MessageError::MissingTypeHeader { .. })
                | Err(e @ MessageError::UnknownBlockType { .. }) => {
                    tracing::trace!("Skipping envelope: {e}");
                }
                result => return Some(result),
            }
        }
        None
    }
}
