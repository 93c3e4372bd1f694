use chrono::{DateTime, Utc};
use log::trace;
use prost_types::Timestamp;
use solana_sdk::signature::Signature;
use yellowstone_grpc_proto::geyser::{subscribe_update::UpdateOneof, SubscribeUpdate};

/// One transaction confirmation seen on a provider stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    /// Provider-assigned creation time of the update, UTC, nanosecond precision
    pub created_at: DateTime<Utc>,
    /// Base58 first signature of the transaction
    pub key: String,
}

impl ObservedEvent {
    pub fn new(created_at: DateTime<Utc>, key: impl Into<String>) -> Self {
        Self { created_at, key: key.into() }
    }

    /// Decode a gRPC update. Anything other than a transaction with a
    /// provider timestamp and at least one well-formed signature yields `None`.
    pub fn from_update(update: SubscribeUpdate) -> Option<Self> {
        let Some(UpdateOneof::Transaction(tx_update)) = update.update_oneof else {
            trace!("Dropping non-transaction update");
            return None;
        };
        let Some(created_at) = update.created_at.as_ref().and_then(timestamp_to_utc) else {
            trace!("Dropping transaction without a valid created_at");
            return None;
        };

        let first = tx_update.transaction?.transaction?.signatures.into_iter().next()?;
        let signature = match Signature::try_from(first.as_slice()) {
            Ok(signature) => signature,
            Err(_) => {
                trace!("Dropping transaction with malformed signature ({} bytes)", first.len());
                return None;
            }
        };

        Some(Self { created_at, key: signature.to_string() })
    }
}

/// Convert a protobuf timestamp into a UTC datetime
pub fn timestamp_to_utc(ts: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}
