//! URL and openflow datapath-id formatting helpers.

use crate::error::{EngineError, Result};

/// Prepend `http://` when the configured endpoint carries no scheme.
#[must_use]
pub fn format_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Convert a datapath id (decimal integer or numeric string) to the
/// 16-hex-digit lowercase form used by the SDN controller.
pub fn datapath_id_to_hex(id: &str) -> Result<String> {
    let id: u64 = id
        .trim()
        .parse()
        .map_err(|_| EngineError::validation(format!("datapath id is not numeric: {id}")))?;
    Ok(format!("{id:016x}"))
}

/// Datapath id in the `of:`-prefixed form used as a controller device id.
pub fn datapath_id_to_of_id(id: &str) -> Result<String> {
    Ok(format!("of:{}", datapath_id_to_hex(id)?))
}
