//! Feature extraction for one artifact.
//!
//! A thin, deterministic mapping over the `object` parser plus a few
//! raw-byte features. This is a leaf: all the interesting batch
//! behavior (isolation, timeouts, quarantine, resume) lives in the
//! driver and supervisor. Runs inside the worker process, never in
//! the driver.

use crate::error::Result;
use crate::layout::FEATURES_FILE;
use chrono::Utc;
use object::{Object, ObjectSection, ObjectSymbol};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// What the worker learned about one artifact.
pub struct Extraction {
    /// True when the artifact did not parse; the document still holds
    /// the raw features.
    pub error: bool,
    /// Flattened keys of the dumped document, in document order.
    pub keys: Vec<String>,
}

/// Extract features from `artifact`, write `features.json` into
/// `dest_dir`, and return the error flag plus the flattened key list.
pub fn extract(
    artifact: &Path,
    dest_dir: &Path,
    hardcode: &Map<String, Value>,
    timeout: Option<u64>,
    static_only: bool,
) -> Result<Extraction> {
    let data = fs::read(artifact)?;
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut doc = Map::new();
    doc.insert("name".into(), json!(name));
    doc.insert("size".into(), json!(data.len()));
    doc.insert("md5".into(), json!(format!("{:x}", md5::compute(&data))));
    doc.insert("sha256".into(), json!(sha256_digest(&data)));
    doc.insert("entropy".into(), json!(shannon_entropy(&data)));
    doc.insert("analyzed_at".into(), json!(Utc::now().to_rfc3339()));
    if let Some(budget) = timeout {
        doc.insert("timeout".into(), json!(budget));
    }

    let mut error = false;
    match object::File::parse(&*data) {
        Ok(file) => {
            doc.insert("static".into(), Value::Object(static_features(&file)));
            if !static_only {
                let symbols: Vec<String> = file
                    .symbols()
                    .filter_map(|s| s.name().ok().map(str::to_owned))
                    .collect();
                debug!(count = symbols.len(), "symbols enumerated");
                doc.insert("symbols".into(), json!(symbols));
            }
        }
        Err(e) => {
            warn!(artifact = %name, error = %e, "artifact did not parse; dumping raw features only");
            error = true;
        }
    }

    for (key, value) in hardcode {
        doc.insert(key.clone(), value.clone());
    }

    let doc = Value::Object(doc);
    fs::create_dir_all(dest_dir)?;
    fs::write(
        dest_dir.join(FEATURES_FILE),
        serde_json::to_vec_pretty(&doc)?,
    )?;

    let mut keys = Vec::new();
    collect_keys(&doc, "", &mut keys);
    Ok(Extraction { error, keys })
}

fn static_features(file: &object::File) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("format".into(), json!(format!("{:?}", file.format())));
    out.insert(
        "architecture".into(),
        json!(format!("{:?}", file.architecture())),
    );
    out.insert(
        "endianness".into(),
        json!(if file.is_little_endian() {
            "little"
        } else {
            "big"
        }),
    );
    out.insert("entry".into(), json!(file.entry()));

    let sections: Vec<Value> = file
        .sections()
        .map(|s| {
            json!({
                "name": s.name().unwrap_or(""),
                "size": s.size(),
                "entropy": shannon_entropy(s.data().unwrap_or(&[])),
            })
        })
        .collect();
    out.insert("sections".into(), Value::Array(sections));
    out
}

/// Shannon entropy of a byte slice, 0.0 (constant) to 8.0 (uniform).
fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut histogram = [0usize; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }
    let len = data.len() as f64;
    let mut entropy = 0.0;
    for &count in &histogram {
        if count == 0 {
            continue;
        }
        let p = (count as f64) / len;
        entropy -= p * p.log2();
    }
    entropy
}

fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Depth-first flattening of object keys, dotted at each level.
fn collect_keys(value: &Value, prefix: &str, out: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, child) in map {
            let flat = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            out.push(flat.clone());
            collect_keys(child, &flat, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn entropy_bounds() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(shannon_entropy(&[0u8; 1024]), 0.0);

        let uniform: Vec<u8> = (0..=255u8).collect();
        assert!((shannon_entropy(&uniform) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn unparseable_artifact_sets_the_error_flag_but_still_dumps() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("notes.txt");
        fs::write(&artifact, b"just some text, not a binary").unwrap();
        let dest = dir.path().join("out");

        let extraction = extract(&artifact, &dest, &Map::new(), Some(5), false).unwrap();
        assert!(extraction.error);
        assert!(dest.join(FEATURES_FILE).is_file());
        assert!(extraction.keys.iter().any(|k| k == "sha256"));
        assert!(extraction.keys.iter().any(|k| k == "entropy"));
        assert!(extraction.keys.iter().any(|k| k == "timeout"));
        assert!(!extraction.keys.iter().any(|k| k.starts_with("static")));
    }

    #[test]
    fn real_binary_parses_with_static_features() {
        // The test executable itself is a convenient real binary.
        let me = std::env::current_exe().unwrap();
        let dir = tempdir().unwrap();

        let extraction = extract(&me, dir.path(), &Map::new(), None, true).unwrap();
        assert!(!extraction.error);
        assert!(extraction.keys.iter().any(|k| k == "static.format"));
        assert!(extraction.keys.iter().any(|k| k == "static.sections"));
        // static_only skips the symbol pass.
        assert!(!extraction.keys.iter().any(|k| k == "symbols"));
    }

    #[test]
    fn hardcode_is_merged_verbatim() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("blob");
        fs::write(&artifact, b"\x00\x01\x02").unwrap();
        let dest = dir.path().join("out");

        let mut hardcode = Map::new();
        hardcode.insert("family".into(), json!("emotet"));

        let extraction = extract(&artifact, &dest, &hardcode, None, true).unwrap();
        assert!(extraction.keys.iter().any(|k| k == "family"));

        let doc: Value =
            serde_json::from_slice(&fs::read(dest.join(FEATURES_FILE)).unwrap()).unwrap();
        assert_eq!(doc["family"], "emotet");
    }

    #[test]
    fn keys_flatten_nested_objects() {
        let doc = json!({"a": {"b": 1, "c": {"d": 2}}, "e": 3});
        let mut keys = Vec::new();
        collect_keys(&doc, "", &mut keys);
        assert_eq!(keys, vec!["a", "a.b", "a.c", "a.c.d", "e"]);
    }
}
