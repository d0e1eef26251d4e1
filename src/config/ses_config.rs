use aws_config::{BehaviorVersion, Region};
use aws_sdk_sesv2::Client as SesClient;

use crate::{
    config::EmailConfig,
    error::{AppError, Result},
};

/// SES client for order confirmations, in the region from [`EmailConfig`].
///
/// Credentials resolve through the standard AWS chain (env vars, shared
/// profile, instance role).
pub async fn load_ses_client(email: &EmailConfig) -> Result<SesClient> {
    let Some(sender) = email.sender.as_deref() else {
        return Err(AppError::ConfigError(
            "SES_SENDER_EMAIL must be set to enable order emails".to_string(),
        ));
    };

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(email.region.clone()))
        .load()
        .await;

    if sdk_config.credentials_provider().is_none() {
        return Err(AppError::ConfigError(
            "No AWS credentials available for SES".to_string(),
        ));
    }

    tracing::info!(region = %email.region, sender, "Order confirmation email enabled");

    Ok(SesClient::new(&sdk_config))
}
