//! Technology profile sync against the profile KV store.

use tracing::info;

use oltsync_core::model::TechnologyProfile;
use oltsync_core::{EngineError, Progress, Result};

use crate::context::EngineContext;

/// Write a technology profile to the KV store.
///
/// Profiles are immutable once synchronized: a content change on an
/// already-enacted profile is a validation error, never an overwrite.
pub async fn sync_tech_profile(ctx: &EngineContext, profile_id: u32) -> Result<Progress> {
    let profile = ctx.store.get_profile(profile_id)?;

    serde_json::from_str::<serde_json::Value>(&profile.profile_value).map_err(|e| {
        EngineError::validation(format!(
            "technology profile {} is not valid JSON: {e}",
            profile.kv_key()
        ))
    })?;

    if let Some(synced) = profile.synced_value.as_deref() {
        if synced != profile.profile_value {
            return Err(EngineError::validation(format!(
                "technology profile {} is immutable once synchronized, delete and recreate it instead",
                profile.kv_key()
            )));
        }
        // Content unchanged, nothing to push again.
        return Ok(Progress::Complete);
    }

    ctx.profile_kv
        .put(&profile.kv_key(), &profile.profile_value)
        .await?;
    info!(key = %profile.kv_key(), "technology profile written");

    let mut profile = ctx.store.get_profile(profile_id)?;
    profile.synced_value = Some(profile.profile_value.clone());
    ctx.store.save_profile_quiet(profile);
    Ok(Progress::Complete)
}

/// Delete a profile from the KV store. An already-absent key counts as
/// success.
pub async fn delete_tech_profile(ctx: &EngineContext, profile: &TechnologyProfile) -> Result<()> {
    ctx.profile_kv.delete(&profile.kv_key()).await?;
    info!(key = %profile.kv_key(), "technology profile deleted");
    Ok(())
}
