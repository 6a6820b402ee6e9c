//! On-disk format for a [`super::Nap`]: a 4-byte little-endian length prefix
//! followed by that many bytes of MessagePack-encoded [`Snapshot`].

use crate::nurl::Nurl;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

/// One exact- or similarity-content dedup bucket: the master's urlhash plus
/// every follower that matched it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bucket {
    pub master: String,
    pub followers: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub dict: HashMap<String, Nurl>,
    pub exdict: HashMap<String, Bucket>,
    pub smdict: HashMap<u32, Bucket>,
}

/// Loads a snapshot from `path`, returning `Ok(None)` if the file does not
/// exist yet (a fresh Nap).
pub fn load(path: &Path) -> Result<Option<Snapshot>, super::NapError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut file = std::fs::File::open(path)?;
    let mut len_buf = [0u8; 4];
    if file.read_exact(&mut len_buf).is_err() {
        // Empty or truncated file: treat like "no snapshot yet".
        return Ok(None);
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    file.read_exact(&mut payload)?;
    let snapshot: Snapshot = rmp_serde::from_slice(&payload)?;
    Ok(Some(snapshot))
}

/// Serializes `dict`/`exdict`/`smdict` and writes them to `<path>.tmp`, then
/// renames that file over `path`. The rename is atomic on the same
/// filesystem, so a crash mid-write never corrupts the previous snapshot.
pub fn save(
    path: &Path,
    dict: &HashMap<String, Nurl>,
    exdict: &HashMap<String, Bucket>,
    smdict: &HashMap<u32, Bucket>,
) -> Result<(), super::NapError> {
    let snapshot = Snapshot {
        dict: dict.clone(),
        exdict: exdict.clone(),
        smdict: smdict.clone(),
    };
    let payload = rmp_serde::to_vec(&snapshot)?;

    let tmp_path = tmp_path_for(path);
    let mut tmp = std::fs::File::create(&tmp_path)?;
    tmp.write_all(&(payload.len() as u32).to_le_bytes())?;
    tmp.write_all(&payload)?;
    tmp.sync_all()?;
    drop(tmp);

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    os.into()
}
