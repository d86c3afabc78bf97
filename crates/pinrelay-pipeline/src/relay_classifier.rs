//! Maps relay failures to the corrective message shown in the source channel.

use pinrelay_store::SettingsStore;

use crate::relay_error::RelayError;
use crate::relay_identity::resolve_identity;
use crate::relay_platform::{PlatformError, RelayPlatform};
use crate::relay_types::{ChannelId, OutgoingMessage, SourceMessage};

pub const GENERIC_FAILURE_NOTICE: &str = "An error occurred while pinning this message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// The destination cannot host relay endpoints; its mapping is already gone.
    ReportNoRelaySupport { destination: ChannelId },
    /// The platform refused the impersonated username.
    ReportRejectedIdentity,
    ReportGenericFailure,
}

/// Classifies a pipeline failure. Evaluated in order, first match wins.
pub fn classify(error: &RelayError) -> RecoveryAction {
    match error {
        RelayError::NoRelaySupport { destination } => RecoveryAction::ReportNoRelaySupport {
            destination: *destination,
        },
        RelayError::Platform(PlatformError::InvalidFormBody(_)) => {
            RecoveryAction::ReportRejectedIdentity
        }
        _ => RecoveryAction::ReportGenericFailure,
    }
}

pub fn no_relay_support_notice(destination: ChannelId) -> String {
    format!("{} doesn't support relaying.", destination.mention())
}

pub fn rejected_identity_notice(display_name: &str) -> String {
    format!("Failed to pin message as the username `{display_name}` is not allowed!")
}

/// Posts the corrective message for `action` in `source_channel`.
///
/// A rejected identity needs the fetched source message to re-resolve the
/// name; without it the generic notice is posted instead. Returns the action
/// that was actually reported.
pub(crate) async fn recover(
    platform: &dyn RelayPlatform,
    store: &dyn SettingsStore,
    action: RecoveryAction,
    source_channel: ChannelId,
    source_message: Option<&SourceMessage>,
) -> RecoveryAction {
    let (action, notice) = match (action, source_message) {
        (RecoveryAction::ReportNoRelaySupport { destination }, _) => {
            (action, no_relay_support_notice(destination))
        }
        (RecoveryAction::ReportRejectedIdentity, Some(message)) => {
            let identity =
                resolve_identity(platform, store, &message.author, message.guild_id).await;
            (action, rejected_identity_notice(&identity.display_name))
        }
        _ => (
            RecoveryAction::ReportGenericFailure,
            GENERIC_FAILURE_NOTICE.to_string(),
        ),
    };

    if let Err(error) = platform
        .send_message(source_channel, OutgoingMessage::text(notice))
        .await
    {
        tracing::error!(
            source_channel_id = %source_channel,
            error = %error,
            "failed to post relay failure notice"
        );
    }
    action
}
