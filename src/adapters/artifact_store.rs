//! Artifact store: loads the trained model and fitted state from disk.
//!
//! Layout of an artifact directory:
//!
//! - `fitted_state.json`: imputer, scaler, column order, threshold
//! - `model.json`: exported logistic regression
//! - `manifest.json` (optional): SHA-256 digests binding both files
//!
//! When a manifest is present every file it lists must match its digest.
//! Whether a manifest is mandatory is a deployment choice
//! (`STROKEWATCH_REQUIRE_MANIFEST`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::logistic::{ExportedLogisticModel, LogisticModel};
use crate::domain::{ArtifactError, FittedState};

pub const FITTED_STATE_FILE: &str = "fitted_state.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// Digest manifest written next to the artifacts by the training export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Relative file name -> lowercase SHA-256 hex
    pub files: BTreeMap<String, String>,
}

/// Everything needed to serve predictions, freshly loaded and validated.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub state: FittedState,
    pub model: LogisticModel,
    /// Short SHA-256 over both artifact files
    pub fingerprint: String,
    /// Whether a manifest was present and verified
    pub verified: bool,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn is_plain_file_name(rel: &str) -> bool {
    let mut components = Path::new(rel).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    path: &Path,
    bytes: &[u8],
) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads artifact bundles from one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    require_manifest: bool,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, require_manifest: bool) -> Self {
        Self {
            dir: dir.into(),
            require_manifest,
        }
    }

    /// Load, verify and validate the bundle.
    ///
    /// # Errors
    /// Returns `ArtifactError` if a file is missing or unparseable, the
    /// manifest does not match, or either artifact fails validation.
    pub fn load(&self) -> Result<ArtifactBundle, ArtifactError> {
        let state_path = self.dir.join(FITTED_STATE_FILE);
        let model_path = self.dir.join(MODEL_FILE);

        let state_bytes = read_file(&state_path)?;
        let model_bytes = read_file(&model_path)?;

        let verified = self.verify_manifest(&[
            (FITTED_STATE_FILE, state_bytes.as_slice()),
            (MODEL_FILE, model_bytes.as_slice()),
        ])?;

        let state: FittedState = parse_json(&state_path, &state_bytes)?;
        state.validate()?;

        let exported: ExportedLogisticModel = parse_json(&model_path, &model_bytes)?;
        let model = LogisticModel::from_exported(exported)?;

        let mut combined = state_bytes;
        combined.extend_from_slice(&model_bytes);
        let fingerprint = sha256_hex(&combined)[..16].to_string();

        tracing::info!(
            "Loaded artifacts from {:?} (n_features={}, threshold={}, verified={}, fingerprint={})",
            self.dir,
            state.feature_columns.len(),
            state.threshold(),
            verified,
            fingerprint
        );

        Ok(ArtifactBundle {
            state,
            model,
            fingerprint,
            verified,
        })
    }

    /// Hash both artifact files and write `manifest.json` next to them.
    ///
    /// # Errors
    /// Returns `ArtifactError::Io` if an artifact cannot be read or the
    /// manifest cannot be written.
    pub fn write_manifest(&self) -> Result<ArtifactManifest, ArtifactError> {
        let mut files = BTreeMap::new();
        for name in [FITTED_STATE_FILE, MODEL_FILE] {
            let bytes = read_file(&self.dir.join(name))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        let manifest = ArtifactManifest {
            version: MANIFEST_VERSION,
            files,
        };

        let path = self.dir.join(MANIFEST_FILE);
        let mut json = serde_json::to_vec_pretty(&manifest).map_err(|source| {
            ArtifactError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        json.push(b'\n');
        fs::write(&path, json).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Wrote artifact manifest to {:?}", path);
        Ok(manifest)
    }

    /// Check `manifest.json` digests. Returns whether a manifest was verified.
    ///
    /// Files in `loaded` are hashed from the given bytes, so what is verified
    /// is exactly what gets parsed. Other listed files are read from disk.
    fn verify_manifest(&self, loaded: &[(&str, &[u8])]) -> Result<bool, ArtifactError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            if self.require_manifest {
                tracing::error!("Artifact manifest not found at {:?}", manifest_path);
                return Err(ArtifactError::Integrity(format!(
                    "{MANIFEST_FILE} is required but missing"
                )));
            }
            tracing::warn!("Loading artifacts without a manifest; file digests are not checked");
            return Ok(false);
        }

        let manifest_bytes = read_file(&manifest_path)?;
        let manifest: ArtifactManifest = parse_json(&manifest_path, &manifest_bytes)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::Integrity(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }

        for required in [FITTED_STATE_FILE, MODEL_FILE] {
            if !manifest.files.contains_key(required) {
                return Err(ArtifactError::Integrity(format!(
                    "{MANIFEST_FILE} must include {required}"
                )));
            }
        }

        for (rel, expected_hex) in &manifest.files {
            if !is_plain_file_name(rel) {
                return Err(ArtifactError::Integrity(format!(
                    "Manifest entry must be a file in the artifact directory: {rel}"
                )));
            }
            let actual_hex = match loaded.iter().find(|(name, _)| *name == rel.as_str()) {
                Some((_, bytes)) => sha256_hex(bytes),
                None => sha256_hex(&read_file(&self.dir.join(rel))?),
            };
            if !constant_time_eq_str(&actual_hex, &expected_hex.to_ascii_lowercase()) {
                return Err(ArtifactError::Integrity(format!(
                    "File hash mismatch for {rel}"
                )));
            }
        }

        tracing::info!("Artifact manifest verified ({} files)", manifest.files.len());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SmokingStatus;
    use crate::ports::ProbabilityModel;
    use crate::test_support::{fitted_state, logistic_export};
    use tempfile::tempdir;

    fn write_bundle(dir: &Path) -> (Vec<u8>, Vec<u8>) {
        let state = serde_json::to_vec_pretty(&fitted_state()).expect("serialize state");
        let model = serde_json::to_vec_pretty(&logistic_export()).expect("serialize model");
        fs::write(dir.join(FITTED_STATE_FILE), &state).expect("write state");
        fs::write(dir.join(MODEL_FILE), &model).expect("write model");
        (state, model)
    }

    fn write_manifest(dir: &Path, files: &[(&str, &[u8])]) {
        let manifest = ArtifactManifest {
            version: 1,
            files: files
                .iter()
                .map(|(name, bytes)| ((*name).to_string(), sha256_hex(bytes)))
                .collect(),
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).expect("serialize manifest"),
        )
        .expect("write manifest");
    }

    #[test]
    fn test_load_without_manifest() {
        let dir = tempdir().expect("tempdir");
        write_bundle(dir.path());

        let bundle = ArtifactStore::new(dir.path(), false).load().expect("load");
        assert!(!bundle.verified);
        assert_eq!(bundle.fingerprint.len(), 16);
        assert_eq!(bundle.state.imputer_cat.smoking_status, SmokingStatus::NeverSmoked);
        assert_eq!(bundle.model.n_features(), bundle.state.feature_columns.len());
    }

    #[test]
    fn test_manifest_required() {
        let dir = tempdir().expect("tempdir");
        write_bundle(dir.path());

        let err = ArtifactStore::new(dir.path(), true).load().unwrap_err();
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_manifest_verified() {
        let dir = tempdir().expect("tempdir");
        let (state, model) = write_bundle(dir.path());
        write_manifest(
            dir.path(),
            &[(FITTED_STATE_FILE, &state), (MODEL_FILE, &model)],
        );

        let bundle = ArtifactStore::new(dir.path(), true).load().expect("load");
        assert!(bundle.verified);
    }

    #[test]
    fn test_tampered_file_rejected() {
        let dir = tempdir().expect("tempdir");
        let (state, model) = write_bundle(dir.path());
        write_manifest(
            dir.path(),
            &[(FITTED_STATE_FILE, &state), (MODEL_FILE, &model)],
        );

        let mut tampered = logistic_export();
        tampered.intercept += 1.0;
        fs::write(
            dir.path().join(MODEL_FILE),
            serde_json::to_vec(&tampered).expect("serialize"),
        )
        .expect("write");

        let err = ArtifactStore::new(dir.path(), false).load().unwrap_err();
        assert!(matches!(err, ArtifactError::Integrity(msg) if msg.contains(MODEL_FILE)));
    }

    #[test]
    fn test_manifest_must_bind_both_files() {
        let dir = tempdir().expect("tempdir");
        let (state, _) = write_bundle(dir.path());
        write_manifest(dir.path(), &[(FITTED_STATE_FILE, &state)]);

        assert!(ArtifactStore::new(dir.path(), false).load().is_err());
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempdir().expect("tempdir");
        let err = ArtifactStore::new(dir.path(), false).load().unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));

        write_bundle(dir.path());
        fs::write(dir.path().join(FITTED_STATE_FILE), b"{not json").expect("write");
        let err = ArtifactStore::new(dir.path(), false).load().unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_written_manifest_verifies() {
        let dir = tempdir().expect("tempdir");
        write_bundle(dir.path());

        let store = ArtifactStore::new(dir.path(), true);
        let manifest = store.write_manifest().expect("write manifest");
        assert_eq!(manifest.files.len(), 2);
        assert!(store.load().expect("load").verified);
    }

    #[test]
    fn test_manifest_entry_outside_dir_rejected() {
        let dir = tempdir().expect("tempdir");
        let (state, model) = write_bundle(dir.path());
        write_manifest(
            dir.path(),
            &[
                (FITTED_STATE_FILE, &state),
                (MODEL_FILE, &model),
                ("../outside.json", b"{}"),
            ],
        );

        let err = ArtifactStore::new(dir.path(), false).load().unwrap_err();
        assert!(matches!(err, ArtifactError::Integrity(msg) if msg.contains("outside")));
    }

    #[test]
    fn test_manifest_hashes_the_loaded_bytes() {
        let dir = tempdir().expect("tempdir");
        let (state, model) = write_bundle(dir.path());
        write_manifest(
            dir.path(),
            &[(FITTED_STATE_FILE, &state), (MODEL_FILE, &model)],
        );
        let store = ArtifactStore::new(dir.path(), true);

        let verified = store
            .verify_manifest(&[
                (FITTED_STATE_FILE, state.as_slice()),
                (MODEL_FILE, model.as_slice()),
            ])
            .expect("matching bytes verify");
        assert!(verified);

        // Files on disk still match; the in-memory copy does not.
        let mut swapped = model.clone();
        swapped.extend_from_slice(b" ");
        let err = store
            .verify_manifest(&[
                (FITTED_STATE_FILE, state.as_slice()),
                (MODEL_FILE, swapped.as_slice()),
            ])
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Integrity(msg) if msg.contains(MODEL_FILE)));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq_str("abc", "abc"));
        assert!(!constant_time_eq_str("abc", "abd"));
        assert!(!constant_time_eq_str("abc", "ab"));
    }
}
