//! One fetch cycle: views and clones in, merged [`TrafficTable`] out.

use crate::api::{Fetch, get_clones, get_views};
use crate::error::ApiError;
use crate::record::TrafficRecord;
use crate::table::TrafficTable;

/// Fetches the traffic of `org/repo` and folds it into `old_data`.
///
/// The most recent day is dropped because GitHub reports it while it is
/// still in progress. On overlap with `old_data` the older row is kept.
///
/// A 403 from GitHub is logged and `old_data` is returned as is; every other
/// error is returned to the caller.
pub async fn build_table<F: Fetch>(
    api: &F,
    org: &str,
    repo: &str,
    old_data: Option<TrafficTable>,
) -> Result<Option<TrafficTable>, ApiError> {
    let (views, clones) = match fetch_records(api, org, repo).await {
        Ok(records) => records,
        Err(e @ ApiError::Auth) => {
            tracing::warn!(owner = org, repo, "{e}");
            return Ok(old_data);
        }
        Err(e) => return Err(e),
    };

    let mut table = TrafficTable::outer_join(&views, &clones);
    table.sort_by_timestamp();
    if let Some(partial) = table.drop_last() {
        tracing::debug!(owner = org, repo, timestamp = %partial.timestamp, "skipping current day");
    }

    Ok(Some(match old_data {
        Some(old) => old.merge(table),
        None => table,
    }))
}

async fn fetch_records<F: Fetch>(
    api: &F,
    org: &str,
    repo: &str,
) -> Result<(Vec<TrafficRecord>, Vec<TrafficRecord>), ApiError> {
    let views = get_views(api, org, repo).await?;
    let clones = get_clones(api, org, repo).await?;
    Ok((views, clones))
}
