use thiserror::Error;

use crate::relay_platform::PlatformError;
use crate::relay_types::{ChannelId, MessageId};

/// Failure of a single pin relay, inspected once by the classifier.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The destination (or its parent container) cannot host relay endpoints.
    #[error("channel {destination} does not support relay endpoints")]
    NoRelaySupport { destination: ChannelId },
    #[error("pin notice {notice} carries no reference to the pinned message")]
    MissingReference { notice: MessageId },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
