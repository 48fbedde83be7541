//! Compact the data tables

use anyhow::Result;

use crate::Site;

/// Rewrite every table log, returning the bytes reclaimed
pub fn run(site: &Site) -> Result<u64> {
    let data = site.open_data()?;
    let reclaimed = data.compact_all()?;
    for (name, stats) in data.stats()? {
        tracing::debug!(table = %name, live = stats.live, bytes = stats.bytes, "Table compacted");
    }
    Ok(reclaimed)
}
