use std::collections::BTreeMap;

use consigno_engine::Tracking;

use crate::dispatch::GroupSource;
use crate::error::SourceError;
use crate::retry::{with_retry, RetryError, UPLOAD_ATTEMPTS};

/// Registers tracking numbers with a group's site. The crate does not
/// ship an implementation for portal groups (that path is a browser
/// flow outside this system); API-backed groups can wire
/// [`crate::api::DealsApiClient::upload`] through this.
pub trait Uploader {
    fn upload(&self, group: &str, numbers: &[String]) -> Result<(), SourceError>;
}

/// Upload trackings to their groups, one retried call per group.
///
/// A group with no configured source is a configuration error and is
/// not retried.
pub fn upload_all(
    trackings: &[Tracking],
    sources: &BTreeMap<String, GroupSource>,
    uploader: &dyn Uploader,
) -> Result<(), RetryError> {
    let mut by_group: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for tracking in trackings {
        by_group
            .entry(tracking.group.as_str())
            .or_default()
            .push(tracking.tracking_number.clone());
    }

    for (group, numbers) in by_group {
        eprintln!("uploading {} trackings to {group}", numbers.len());
        with_retry(&format!("upload to {group}"), UPLOAD_ATTEMPTS, || {
            if !sources.contains_key(group) {
                return Err(SourceError::UnknownGroup(group.to_string()));
            }
            uploader.upload(group, &numbers)
        })?;
    }
    Ok(())
}
