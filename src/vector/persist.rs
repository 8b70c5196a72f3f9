use crate::vector::StoredDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct CollectionLayout {
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub bin_path: PathBuf,
}

impl CollectionLayout {
    pub fn new(base: &Path, collection: &str) -> Self {
        let dir = base.join(collection);
        Self {
            manifest_path: dir.join("manifest.json"),
            bin_path: dir.join("vectors.bin"),
            dir,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub dim: usize,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub live_count: usize,
    #[serde(default)]
    pub file_len: u64,
}

impl Manifest {
    pub fn new(dim: usize) -> Self {
        Self {
            version: 1,
            dim,
            total_records: 0,
            live_count: 0,
            file_len: 0,
        }
    }
}

pub struct Record {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: serde_json::Value,
}

// bincode cannot encode a self-describing serde_json::Value
#[derive(Serialize, Deserialize)]
struct DiskRecord {
    id: String,
    vector: Vec<f32>,
    document: String,
    metadata: Vec<u8>,
}

pub fn init_collection(layout: &CollectionLayout, dim: usize) -> io::Result<()> {
    std::fs::create_dir_all(&layout.dir)?;
    if !layout.manifest_path.exists() {
        store_manifest(layout, &Manifest::new(dim))?;
    }
    if !layout.bin_path.exists() {
        let _ = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&layout.bin_path)?;
    }
    Ok(())
}

pub fn load_collection(
    layout: &CollectionLayout,
) -> anyhow::Result<(Manifest, HashMap<String, StoredDocument>)> {
    let mut manifest = read_manifest(layout)?;
    let file_len = std::fs::metadata(&layout.bin_path)?.len();
    let file = File::open(&layout.bin_path)?;
    let mut reader = BufReader::new(file);
    let mut items = HashMap::new();
    let mut total = 0u64;
    let mut good_len = 0u64;

    loop {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        if let Err(err) = reader.read_exact(&mut payload) {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                tracing::warn!(path = %layout.bin_path.display(), "truncated trailing record");
                break;
            }
            return Err(err.into());
        }
        let record: DiskRecord = match bincode::deserialize(&payload) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "stopping at undecodable record");
                break;
            }
        };
        good_len += 4 + len as u64;
        total += 1;
        if record.vector.len() != manifest.dim {
            continue;
        }
        let metadata =
            serde_json::from_slice(&record.metadata).unwrap_or(serde_json::Value::Null);
        items.insert(
            record.id,
            StoredDocument {
                vector: record.vector,
                document: record.document,
                metadata,
            },
        );
    }

    if good_len < file_len {
        tracing::warn!(
            path = %layout.bin_path.display(),
            dropped_bytes = file_len - good_len,
            "cutting record log back to its last complete record"
        );
        truncate_log(layout, good_len)?;
    }

    manifest.total_records = total;
    manifest.live_count = items.len();
    manifest.file_len = good_len;
    let _ = store_manifest(layout, &manifest);
    Ok((manifest, items))
}

/// Appends one record after `committed_len` bytes of log. A failed write is
/// cut back off so the log never ends in a partial record.
pub fn append_record(
    layout: &CollectionLayout,
    record: &Record,
    committed_len: u64,
) -> io::Result<u64> {
    let disk = DiskRecord {
        id: record.id.clone(),
        vector: record.vector.clone(),
        document: record.document.clone(),
        metadata: serde_json::to_vec(&record.metadata)?,
    };
    let payload = bincode::serialize(&disk)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bincode serialize"))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "record too large"))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&layout.bin_path)?;
    let written = file
        .write_all(&len.to_le_bytes())
        .and_then(|()| file.write_all(&payload))
        .and_then(|()| file.flush())
        .and_then(|()| file.sync_data());
    if let Err(err) = written {
        if let Err(cut) = file.set_len(committed_len) {
            tracing::error!(error = %cut, "could not cut back a failed append");
        }
        return Err(err);
    }
    Ok((4 + payload.len()) as u64)
}

pub fn truncate_log(layout: &CollectionLayout, len: u64) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(&layout.bin_path)?;
    file.set_len(len)?;
    file.sync_data()
}

pub fn truncate_collection(layout: &CollectionLayout, manifest: &Manifest) -> io::Result<()> {
    std::fs::create_dir_all(&layout.dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&layout.bin_path)?;
    file.sync_data()?;
    store_manifest(layout, manifest)
}

pub fn store_manifest(layout: &CollectionLayout, manifest: &Manifest) -> io::Result<()> {
    let tmp = layout.dir.join("manifest.json.tmp");
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    serde_json::to_writer_pretty(&mut f, manifest)?;
    f.flush()?;
    f.sync_data()?;
    std::fs::rename(tmp, &layout.manifest_path)?;
    Ok(())
}

fn read_manifest(layout: &CollectionLayout) -> io::Result<Manifest> {
    let bytes = std::fs::read(&layout.manifest_path)?;
    let manifest: Manifest = serde_json::from_slice(&bytes)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            vector: vec![1.0, 0.0, 0.0],
            document: format!("doc {id}"),
            metadata: json!({ "id": id }),
        }
    }

    #[test]
    fn torn_tail_is_cut_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CollectionLayout::new(dir.path(), "c");
        init_collection(&layout, 3).unwrap();
        let mut len = 0;
        len += append_record(&layout, &record("a"), len).unwrap();
        len += append_record(&layout, &record("b"), len).unwrap();

        let mut f = OpenOptions::new().append(true).open(&layout.bin_path).unwrap();
        f.write_all(&500u32.to_le_bytes()).unwrap();
        f.write_all(b"partial").unwrap();
        drop(f);

        let (manifest, items) = load_collection(&layout).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(manifest.file_len, len);
        assert_eq!(std::fs::metadata(&layout.bin_path).unwrap().len(), len);

        append_record(&layout, &record("c"), len).unwrap();
        let (_, items) = load_collection(&layout).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.contains_key("c"));
    }
}
