//! Message codec and transport boundary
//!
//! Blocks sourced from (or published to) a message broker travel as a
//! [`Message`] inside an [`Envelope`]. The envelope's `type` header names the
//! block type so a consumer can pick the right decoder; see
//! [`ChannelConsumer::watch`].
//!
//! Only the boundary traits and an in-process [`channel`] transport live
//! here. Broker clients implement [`MessageProducer`] and
//! [`MessageConsumer`] on their side.

mod channel;
mod json;
mod serve;

pub use channel::{channel, ChannelConsumer, ChannelProducer, ChannelSender};
pub use json::{block_to_json, json_to_block, JsonMessage};
pub use serve::{serve, ServeSummary};

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blocks::{AnyBlock, Block, BoxError};

/// Header carrying the block type name of an envelope
pub const TYPE_HEADER: &str = "type";

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to decode message: {0}")]
    Decode(#[source] BoxError),

    #[error("no block type {type_name} is watched on topic {topic}")]
    UnknownBlockType { topic: String, type_name: String },

    #[error("envelope on topic {topic} has no type header")]
    MissingTypeHeader { topic: String },

    #[error("message channel is closed")]
    ChannelClosed,
}

/// Milliseconds since the Unix epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Utc::now().into()
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime.timestamp_millis())
    }
}

/// A keyed payload as it travels over a broker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub key: String,
    pub value: String,
    pub timestamp_ms: i64,
}

impl Message {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            timestamp_ms: timestamp.into().0,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

/// Serialize a value into a [`Message`]
pub trait ToMessage {
    fn to_message(&self) -> Result<Message, MessageError>;
}

/// Reconstruct a value from a [`Message`]
pub trait FromMessage: Sized {
    fn from_message(message: Message) -> Result<Self, MessageError>;
}

/// A message addressed to a topic, with string headers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub headers: HashMap<String, String>,
    pub message: Message,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, message: Message) -> Self {
        Self {
            topic: topic.into(),
            headers: HashMap::new(),
            message,
        }
    }

    /// Envelope for a block, tagged with its type name
    pub fn for_block<B: Block + ToMessage>(
        topic: impl Into<String>,
        block: &B,
    ) -> Result<Self, MessageError> {
        Ok(Self::new(topic, block.to_message()?).with_header(TYPE_HEADER, B::type_name()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn block_type(&self) -> Option<&str> {
        self.headers.get(TYPE_HEADER).map(String::as_str)
    }
}

/// Sink publishing serialized blocks to one topic
#[async_trait]
pub trait MessageProducer: Send + Sync {
    fn topic(&self) -> &str;

    /// Publish an already built envelope
    ///
    /// # Errors
    /// Returns an error if the transport cannot accept the envelope
    async fn send(&self, envelope: Envelope) -> Result<(), MessageError>;

    /// Serialize a block and publish it tagged with its type name
    async fn produce<B>(&self, block: &B) -> Result<(), MessageError>
    where
        B: Block + ToMessage,
        Self: Sized,
    {
        let envelope = Envelope::for_block(self.topic(), block)?;
        self.send(envelope).await
    }
}

/// Source of reconstructed blocks
#[async_trait]
pub trait MessageConsumer: Send {
    /// Wait for the next block
    ///
    /// Returns `None` once the source is exhausted.
    async fn next(&mut self) -> Option<Result<Box<dyn AnyBlock>, MessageError>>;
}
