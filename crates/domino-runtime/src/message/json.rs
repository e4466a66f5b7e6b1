use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{FromMessage, Message, MessageError, Timestamp, ToMessage};

pub fn block_to_json<T: Serialize>(block: &T) -> Result<String, MessageError> {
    serde_json::to_string(block).map_err(|e| MessageError::Encode(e.into()))
}

pub fn json_to_block<T: DeserializeOwned>(json: &str) -> Result<T, MessageError> {
    serde_json::from_str(json).map_err(|e| MessageError::Decode(e.into()))
}

/// Blocks carried as JSON message values
///
/// Implementing this gives [`ToMessage`] and [`FromMessage`] for free; the
/// message value is the block serialized with `serde_json`.
pub trait JsonMessage: Serialize + DeserializeOwned {
    /// Broker key for this block, usually used for partitioning
    fn message_key(&self) -> String;

    fn message_timestamp(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<T: JsonMessage> ToMessage for T {
    fn to_message(&self) -> Result<Message, MessageError> {
        Ok(Message::new(
            self.message_key(),
            block_to_json(self)?,
            self.message_timestamp(),
        ))
    }
}

impl<T: JsonMessage> FromMessage for T {
    fn from_message(message: Message) -> Result<Self, MessageError> {
        json_to_block(&message.value)
    }
}
