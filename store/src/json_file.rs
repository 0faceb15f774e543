//! JSON snapshot file store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use coupon_common::{Coupon, CouponId, CouponStatus};

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;
use crate::store::CouponStore;

/// Coupon store backed by a single JSON document `{ "coupons": [...] }`.
///
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the target, so a reader sees either the previous or the
/// next snapshot and never a truncated one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, creating the directory and an empty snapshot if needed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self { path: path.into() };

        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::io(format!("creating data directory {}", parent.display()), e)
            })?;
        }

        if !store.path.exists() {
            store.write_snapshot(&Snapshot::default())?;
            debug!(path = %store.path.display(), "Initialized empty coupon snapshot");
        }

        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, failing on unreadable or corrupt data.
    fn read_snapshot(&self) -> StoreResult<Snapshot> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => {
                return Err(StoreError::io(
                    format!("reading {}", self.path.display()),
                    e,
                ))
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Read the snapshot, treating any failure as an empty collection.
    fn read_lenient(&self) -> Snapshot {
        self.read_snapshot().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring unreadable coupon snapshot");
            Snapshot::default()
        })
    }

    /// Atomic write: temp file in the target directory, sync, rename.
    fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
            StoreError::io(format!("creating temp file in {}", parent.display()), e)
        })?;

        let mut file = temp.as_file();
        file.write_all(&bytes).map_err(|e| {
            StoreError::io(format!("writing temp file for {}", self.path.display()), e)
        })?;
        file.sync_all().map_err(|e| {
            StoreError::io(format!("syncing temp file for {}", self.path.display()), e)
        })?;

        temp.persist(&self.path).map_err(|e| {
            StoreError::io(format!("renaming temp file to {}", self.path.display()), e.error)
        })?;

        Ok(())
    }

    /// Strict read, apply, replace.
    ///
    /// A corrupt file fails the mutation rather than being overwritten with
    /// a snapshot that silently drops its records.
    fn mutate<T>(&self, apply: impl FnOnce(&mut Snapshot) -> StoreResult<T>) -> StoreResult<T> {
        let mut snapshot = self.read_snapshot()?;
        let out = apply(&mut snapshot)?;
        self.write_snapshot(&snapshot)?;
        Ok(out)
    }
}

impl CouponStore for JsonFileStore {
    fn list(&self, status: Option<CouponStatus>) -> Vec<Coupon> {
        self.read_lenient().filtered(status)
    }

    fn get(&self, id: &CouponId) -> StoreResult<Coupon> {
        self.read_lenient().find(id).cloned()
    }

    fn insert(&self, coupons: Vec<Coupon>) -> StoreResult<()> {
        let count = coupons.len();
        self.mutate(|snapshot| snapshot.append(coupons))?;
        debug!(path = %self.path.display(), count, "Coupons appended");
        Ok(())
    }

    fn update(&self, id: &CouponId, coupon: Coupon) -> StoreResult<()> {
        self.mutate(|snapshot| snapshot.replace(id, coupon))
    }

    fn delete(&self, id: &CouponId) -> StoreResult<Coupon> {
        self.mutate(|snapshot| snapshot.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupon_common::{now, CouponCode, TokenAmount, TxHash};
    use rust_decimal_macros::dec;

    fn coupon(index: usize) -> Coupon {
        let at = now();
        Coupon::new_pending(
            CouponCode::derive(at, index),
            TokenAmount::from_decimal(dec!(0.123456789012345678)).unwrap(),
            None,
            Some(format!("coupon {index}")),
            at,
        )
    }

    fn open_temp() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonFileStore::open(dir.path().join("data").join("coupons.json"))
            .expect("open store");
        (dir, store)
    }

    #[test]
    fn test_open_creates_empty_snapshot() {
        let (_dir, store) = open_temp();
        let contents = fs::read_to_string(store.path()).expect("read");
        let json: serde_json::Value = serde_json::from_str(&contents).expect("json");
        assert_eq!(json["coupons"], serde_json::json!([]));
        assert!(store.list(None).is_empty());
    }

    #[test]
    fn test_records_survive_reopen_with_full_precision() {
        let (_dir, store) = open_temp();
        let batch: Vec<Coupon> = (0..3).map(coupon).collect();
        store.insert(batch.clone()).unwrap();

        let reopened = JsonFileStore::open(store.path()).unwrap();
        let listed = reopened.list(None);
        assert_eq!(listed, batch);
        assert_eq!(listed[0].value.to_string(), "0.123456789012345678");
    }

    #[test]
    fn test_update_replaces_only_target() {
        let (_dir, store) = open_temp();
        let batch: Vec<Coupon> = (0..3).map(coupon).collect();
        store.insert(batch.clone()).unwrap();

        let mut target = batch[1].clone();
        target
            .redeem(
                "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".into(),
                TxHash::new("0xfeed"),
                now(),
            )
            .unwrap();
        store.update(&target.id, target.clone()).unwrap();

        let listed = store.list(None);
        assert_eq!(listed[0], batch[0]);
        assert_eq!(listed[1], target);
        assert_eq!(listed[2], batch[2]);
        assert_eq!(store.list(Some(CouponStatus::Redeemed)), vec![target]);
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = open_temp();
        let batch: Vec<Coupon> = (0..2).map(coupon).collect();
        store.insert(batch.clone()).unwrap();

        let removed = store.delete(&batch[0].id).unwrap();
        assert_eq!(removed.id, batch[0].id);
        assert_eq!(store.list(None), vec![batch[1].clone()]);
        assert!(matches!(store.get(&batch[0].id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file_reads_empty_but_refuses_writes() {
        let (_dir, store) = open_temp();
        store.insert(vec![coupon(0)]).unwrap();
        fs::write(store.path(), b"{\"coupons\": [").unwrap();

        assert!(store.list(None).is_empty());
        assert!(matches!(
            store.insert(vec![coupon(1)]),
            Err(StoreError::Corrupt { .. })
        ));
        assert_eq!(fs::read(store.path()).unwrap(), b"{\"coupons\": [");
    }

    #[test]
    fn test_reads_original_record_shape() {
        let (_dir, store) = open_temp();
        let raw = r#"{
  "coupons": [
    {
      "id": "6f1c2b1e-4a6d-4f7e-9c1a-2b3c4d5e6f70",
      "code": "LUXAE-1700000000000-1",
      "value": 10,
      "recipientAddress": null,
      "description": "",
      "status": "pending",
      "createdAt": "2024-01-01T00:00:00.000Z",
      "redeemedAt": null,
      "redeemedBy": null
    },
    {
      "id": "0b6e8f4c-93a1-4c5e-8d2f-7a9b1c3d5e7f",
      "code": "LUXAE-1700000000000-2",
      "value": 0.25,
      "recipientAddress": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
      "description": "legacy",
      "status": "redeemed",
      "createdAt": "2024-01-01T00:00:00.000Z",
      "redeemedAt": "2024-01-03T12:00:00.000Z",
      "redeemedBy": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
      "transactionHash": "0xabc"
    }
  ]
}"#;
        fs::write(store.path(), raw).unwrap();

        let listed = store.list(None);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code.as_str(), "LUXAE-1700000000000-1");
        assert_eq!(listed[0].value.to_string(), "10.000000000000000000");
        assert_eq!(listed[0].updated_at, listed[0].created_at);
        assert!(listed[0].transaction_hash.is_none());
        assert_eq!(listed[1].value.to_string(), "0.250000000000000000");
        assert_eq!(listed[1].transaction_hash, Some(TxHash::new("0xabc")));

        store.insert(vec![coupon(0)]).unwrap();
        let listed = store.list(None);
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].code.as_str(), "LUXAE-1700000000000-1");
    }
}
