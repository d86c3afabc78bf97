//! Pin relay pipeline: moves pinned messages into a pin log channel.
//!
//! A pin notice in a configured source channel triggers the pipeline. It
//! fetches the pinned message and rebuilds it as one or more relay posts that
//! respect platform limits. The posts go out through a relay endpoint
//! (webhook) on the destination channel under the original author's identity,
//! strictly in order. On success the source channel gets a confirmation, the
//! system notice is deleted, and the original message is unpinned.
//!
//! The platform and the settings store are injected through
//! [`RelayPlatform`] and [`pinrelay_store::SettingsStore`], so the whole
//! pipeline runs against scripted collaborators in tests.

pub mod relay_classifier;
pub mod relay_endpoint;
pub mod relay_error;
pub mod relay_identity;
pub mod relay_pipeline;
pub mod relay_platform;
pub mod relay_reconstruct;
pub mod relay_types;

#[cfg(test)]
mod test_support;

pub use relay_classifier::{
    classify, no_relay_support_notice, rejected_identity_notice, RecoveryAction,
    GENERIC_FAILURE_NOTICE,
};
pub use relay_endpoint::{resolve_endpoint, route_to_thread};
pub use relay_error::RelayError;
pub use relay_identity::resolve_identity;
pub use relay_pipeline::{ChannelCleanup, PinRelayOutcome, PinRelayPipeline};
pub use relay_platform::{PlatformError, PlatformResult, RelayPlatform};
pub use relay_reconstruct::{
    group_attachments, materialize, reconstruct, should_reupload, split_text, RelayPlan,
    RelayPostPlan,
};
pub use relay_types::*;
