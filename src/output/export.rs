//! CSV export of stored records
//!
//! Writes one `{owner_id}.csv` per owner. The header row holds the record
//! field labels, followed by the note's local directory.

use crate::item::{clean_text, RECORD_FIELDS};
use crate::output::DigestResult;
use crate::storage::Storage;
use std::path::{Path, PathBuf};
use tracing::info;

const LOCAL_PATH_LABEL: &str = "Local path";

/// Exports every owner's records to `dir`
///
/// # Returns
///
/// The paths of the written files, one per owner
pub fn export_csv(storage: &dyn Storage, dir: &Path) -> DigestResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for owner_id in storage.list_owners()? {
        let items = storage.get_items_for_owner(&owner_id)?;
        let path = dir.join(format!("{}.csv", owner_id));

        let mut wtr = csv::WriterBuilder::new().from_path(&path)?;
        let header = RECORD_FIELDS
            .iter()
            .map(|field| field.label())
            .chain(std::iter::once(LOCAL_PATH_LABEL));
        wtr.write_record(header)?;

        for item in &items {
            let row = RECORD_FIELDS
                .iter()
                .map(|field| clean_text(&item.record.field_value(*field)))
                .chain(std::iter::once(
                    item.local_path
                        .as_ref()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                ));
            wtr.write_record(row)?;
        }
        wtr.flush()?;

        info!("Exported {} notes of {} to {}", items.len(), owner_id, path.display());
        written.push(path);
    }

    Ok(written)
}
