//! Payload marshalling.

use crate::command::RemoteCommand;
use crate::error::Result;

/// Turns remote commands into bytes and back.
pub trait Marshaller: Send + Sync {
    fn marshal(&self, command: &RemoteCommand) -> Result<Vec<u8>>;

    fn unmarshal(&self, bytes: &[u8]) -> Result<RemoteCommand>;
}

/// Compact binary encoding via `bincode`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeMarshaller;

impl Marshaller for BincodeMarshaller {
    fn marshal(&self, command: &RemoteCommand) -> Result<Vec<u8>> {
        Ok(bincode::serialize(command)?)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<RemoteCommand> {
        Ok(bincode::deserialize(bytes)?)
    }
}
