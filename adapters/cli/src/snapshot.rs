use std::fs;
use std::path::Path;

use anyhow::Context as _;
use spawn_warden_core::SpawnRecord;
use spawn_warden_world::SpawnWorld;

/// Loads a world from a JSON snapshot file, or starts empty when the file
/// does not exist yet.
pub(crate) fn load_world(path: &Path) -> anyhow::Result<SpawnWorld> {
    if !path.exists() {
        return Ok(SpawnWorld::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    let records: Vec<SpawnRecord> =
        serde_json::from_str(&text).with_context(|| format!("parsing snapshot {}", path.display()))?;
    Ok(SpawnWorld::from_records(records))
}

/// Writes the whole world back as a JSON snapshot.
pub(crate) fn save_world(path: &Path, world: &SpawnWorld) -> anyhow::Result<()> {
    let records = world.all_records();
    let text = serde_json::to_string_pretty(&records).context("encoding snapshot")?;
    fs::write(path, text).with_context(|| format!("writing snapshot {}", path.display()))?;
    Ok(())
}
