//! Keystore adapters.
//!
//! This module provides the storage seam of the key lifecycle:
//! - A trait-based interface, [`Keystore`], with add/find/delete semantics
//!   keyed by class and label
//! - [`MemoryKeystore`], a mutex-guarded in-process map
//! - [`FileKeystore`], one JSON file per entry in a private directory
//!
//! # Entry semantics
//!
//! - A class/label slot holds at most one entry; `add` on an occupied slot
//!   fails with [`KeystoreError::Duplicate`].
//! - Queries may additionally filter by key type and access-control policy.
//!   An entry that does not match the filters is reported as
//!   [`KeystoreError::NotFound`].
//! - Private entries are non-extractable: requesting their data fails with
//!   `KeystoreError::Status(Status::PARAM)`. They can only be returned as
//!   opaque [`ItemReference`]s.
//!
//! # Example
//!
//! ```rust
//! use enclavekey_core::{CurveId, KeyClass, KeyLabel};
//! use enclavekey_crypto::keystore::{ItemQuery, Keystore, MemoryKeystore, NewItem};
//!
//! let keystore = MemoryKeystore::new();
//! let label = KeyLabel::new("app.public").expect("valid label");
//!
//! keystore
//!     .add(&NewItem::public(label.clone(), CurveId::EcSecPrimeRandom, vec![4u8; 65]))
//!     .expect("add failed");
//!
//! let item = keystore
//!     .find(&ItemQuery::new(KeyClass::Public, label).returning_data())
//!     .expect("lookup failed");
//! assert_eq!(item.data.map(|d| d.len()), Some(65));
//! ```

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fs2::FileExt;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use enclavekey_core::error::KeystoreResult;
use enclavekey_core::{AccessControlPolicy, CurveId, KeyClass, KeyLabel, KeystoreError, Status};
use serde::{Deserialize, Serialize};

// ============================================================================
// Queries and items
// ============================================================================

/// Which fields a lookup should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReturnFields {
    /// Return an opaque [`ItemReference`].
    pub reference: bool,
    /// Return the exported key bytes.
    pub data: bool,
}

/// A keystore lookup or delete query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Entry class.
    pub class: KeyClass,
    /// Entry label.
    pub label: KeyLabel,
    /// Only match entries of this key type.
    pub key_type: Option<CurveId>,
    /// Only match entries carrying this access-control policy.
    pub access_control: Option<AccessControlPolicy>,
    /// Fields to return.
    pub return_fields: ReturnFields,
}

impl ItemQuery {
    /// A query matching any entry in the class/label slot, returning nothing.
    #[must_use]
    pub fn new(class: KeyClass, label: KeyLabel) -> Self {
        Self {
            class,
            label,
            key_type: None,
            access_control: None,
            return_fields: ReturnFields::default(),
        }
    }

    /// Restrict to a key type.
    #[must_use]
    pub fn with_key_type(mut self, key_type: CurveId) -> Self {
        self.key_type = Some(key_type);
        self
    }

    /// Restrict to an access-control policy.
    #[must_use]
    pub fn with_access_control(mut self, policy: AccessControlPolicy) -> Self {
        self.access_control = Some(policy);
        self
    }

    /// Request an opaque reference.
    #[must_use]
    pub fn returning_reference(mut self) -> Self {
        self.return_fields.reference = true;
        self
    }

    /// Request the exported bytes.
    #[must_use]
    pub fn returning_data(mut self) -> Self {
        self.return_fields.data = true;
        self
    }
}

/// A new keystore entry.
#[derive(Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Entry class.
    pub class: KeyClass,
    /// Entry label.
    pub label: KeyLabel,
    /// Key type identifier.
    pub key_type: CurveId,
    /// Key size in bits.
    pub key_size_bits: u32,
    /// Access-control policy, for private entries.
    pub access_control: Option<AccessControlPolicy>,
    /// Whether `data` may be returned by lookups.
    pub extractable: bool,
    /// Public key bytes, or the sealed token of a private key.
    pub data: Vec<u8>,
}

impl NewItem {
    /// An extractable public key entry.
    #[must_use]
    pub fn public(label: KeyLabel, key_type: CurveId, data: Vec<u8>) -> Self {
        Self {
            class: KeyClass::Public,
            label,
            key_type,
            key_size_bits: CurveId::KEY_SIZE_BITS,
            access_control: None,
            extractable: true,
            data,
        }
    }

    /// A non-extractable private key entry holding a sealed token.
    #[must_use]
    pub fn private(
        label: KeyLabel,
        key_type: CurveId,
        policy: AccessControlPolicy,
        sealed: Vec<u8>,
    ) -> Self {
        Self {
            class: KeyClass::Private,
            label,
            key_type,
            key_size_bits: CurveId::KEY_SIZE_BITS,
            access_control: Some(policy),
            extractable: false,
            data: sealed,
        }
    }

    fn validate(&self) -> KeystoreResult<()> {
        if self.key_size_bits != CurveId::KEY_SIZE_BITS || self.data.is_empty() {
            return Err(KeystoreError::Status(Status::PARAM));
        }
        if self.class == KeyClass::Private && self.extractable {
            return Err(KeystoreError::Status(Status::PARAM));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NewItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewItem")
            .field("class", &self.class)
            .field("label", &self.label)
            .field("key_type", &self.key_type)
            .field("access_control", &self.access_control)
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// An opaque reference to a stored entry.
///
/// References can only be produced by a keystore lookup.
pub struct ItemReference {
    pub(crate) class: KeyClass,
    pub(crate) label: KeyLabel,
    pub(crate) key_type: CurveId,
    pub(crate) access_control: Option<AccessControlPolicy>,
    pub(crate) payload: Vec<u8>,
}

impl ItemReference {
    /// Class of the referenced entry.
    #[must_use]
    pub const fn class(&self) -> KeyClass {
        self.class
    }

    /// Label of the referenced entry.
    #[must_use]
    pub const fn label(&self) -> &KeyLabel {
        &self.label
    }

    /// Key type of the referenced entry.
    #[must_use]
    pub const fn key_type(&self) -> CurveId {
        self.key_type
    }

    /// Access-control policy of the referenced entry.
    #[must_use]
    pub const fn access_control(&self) -> Option<AccessControlPolicy> {
        self.access_control
    }
}

impl std::fmt::Debug for ItemReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemReference")
            .field("class", &self.class)
            .field("label", &self.label)
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

/// The result of a successful lookup. Only requested fields are populated.
#[derive(Debug, Default)]
pub struct KeystoreItem {
    /// Opaque reference, if requested.
    pub reference: Option<ItemReference>,
    /// Exported bytes, if requested.
    pub data: Option<Vec<u8>>,
}

/// Exclusive hold on a keystore's keypair lifecycle, released on drop.
///
/// Generation and deletion run under this lock so that two managers on the
/// same storage never interleave their writes.
#[derive(Debug)]
pub struct LifecycleLock<'a> {
    held: Held<'a>,
}

#[derive(Debug)]
enum Held<'a> {
    Nothing,
    Process { _guard: MutexGuard<'a, ()> },
    File { _file: File },
}

impl LifecycleLock<'_> {
    /// A lock that holds nothing, for backends with no shared state.
    #[must_use]
    pub const fn unlocked() -> Self {
        Self {
            held: Held::Nothing,
        }
    }

    /// Whether this lock actually excludes other holders.
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        !matches!(self.held, Held::Nothing)
    }
}

// ============================================================================
// Keystore trait
// ============================================================================

/// A store of labeled key entries.
///
/// All operations are synchronous. Implementations must be `Send + Sync`.
pub trait Keystore: Send + Sync {
    /// Look up the entry matching `query`.
    ///
    /// # Errors
    ///
    /// - [`KeystoreError::NotFound`] if no entry matches
    /// - `KeystoreError::Status(Status::PARAM)` if data is requested for a
    ///   non-extractable entry
    /// - [`KeystoreError::Io`] or [`KeystoreError::InvalidFormat`] on backend failures
    fn find(&self, query: &ItemQuery) -> KeystoreResult<KeystoreItem>;

    /// Insert a new entry.
    ///
    /// # Errors
    ///
    /// - [`KeystoreError::Duplicate`] if the class/label slot is occupied
    /// - `KeystoreError::Status(Status::PARAM)` for malformed entries
    fn add(&self, item: &NewItem) -> KeystoreResult<()>;

    /// Delete the entry matching `query`.
    ///
    /// # Errors
    ///
    /// [`KeystoreError::NotFound`] if no entry matches.
    fn delete(&self, query: &ItemQuery) -> KeystoreResult<()>;

    /// Block until no other caller holds the lifecycle lock of this storage.
    ///
    /// The default holds nothing.
    ///
    /// # Errors
    ///
    /// [`KeystoreError::Io`] if a backing lock cannot be taken.
    fn lifecycle_lock(&self) -> KeystoreResult<LifecycleLock<'_>> {
        Ok(LifecycleLock::unlocked())
    }

    /// Insert an entry, replacing whatever occupies its slot.
    ///
    /// On [`KeystoreError::Duplicate`] the stale entry is deleted and the
    /// insert retried exactly once.
    ///
    /// # Errors
    ///
    /// Returns the error of the retried insert, or of the delete if the
    /// stale entry could not be removed.
    fn add_overwriting(&self, item: &NewItem) -> KeystoreResult<()> {
        match self.add(item) {
            Err(KeystoreError::Duplicate) => {
                tracing::warn!(
                    class = %item.class,
                    label = %item.label,
                    "Keystore slot occupied, replacing entry"
                );
                match self.delete(&ItemQuery::new(item.class, item.label.clone())) {
                    Ok(()) | Err(KeystoreError::NotFound) => {}
                    Err(e) => return Err(e),
                }
                self.add(item)
            }
            other => other,
        }
    }
}

// ============================================================================
// Stored entry
// ============================================================================

/// The persisted form of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredItem {
    class: KeyClass,
    label: KeyLabel,
    key_type: CurveId,
    key_size_bits: u32,
    access_control: Option<AccessControlPolicy>,
    extractable: bool,
    #[serde(with = "hex")]
    data: Vec<u8>,
}

impl StoredItem {
    fn from_new(item: &NewItem) -> Self {
        Self {
            class: item.class,
            label: item.label.clone(),
            key_type: item.key_type,
            key_size_bits: item.key_size_bits,
            access_control: item.access_control,
            extractable: item.extractable,
            data: item.data.clone(),
        }
    }

    fn matches(&self, query: &ItemQuery) -> bool {
        self.class == query.class
            && self.label == query.label
            && query.key_type.map_or(true, |t| t == self.key_type)
            && query
                .access_control
                .map_or(true, |p| Some(p) == self.access_control)
    }

    fn to_item(&self, fields: ReturnFields) -> KeystoreResult<KeystoreItem> {
        if fields.data && !self.extractable {
            return Err(KeystoreError::Status(Status::PARAM));
        }

        Ok(KeystoreItem {
            reference: fields.reference.then(|| ItemReference {
                class: self.class,
                label: self.label.clone(),
                key_type: self.key_type,
                access_control: self.access_control,
                payload: self.data.clone(),
            }),
            data: fields.data.then(|| self.data.clone()),
        })
    }
}

// ============================================================================
// MemoryKeystore
// ============================================================================

/// An in-process keystore backed by a mutex-guarded map.
///
/// Contents are lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryKeystore {
    items: Mutex<HashMap<(KeyClass, KeyLabel), StoredItem>>,
    lifecycle: Mutex<()>,
}

impl MemoryKeystore {
    /// Create an empty keystore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the keystore holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Keystore for MemoryKeystore {
    fn find(&self, query: &ItemQuery) -> KeystoreResult<KeystoreItem> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = items
            .get(&(query.class, query.label.clone()))
            .filter(|stored| stored.matches(query))
            .ok_or(KeystoreError::NotFound)?;
        stored.to_item(query.return_fields)
    }

    fn add(&self, item: &NewItem) -> KeystoreResult<()> {
        item.validate()?;
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = (item.class, item.label.clone());
        if items.contains_key(&slot) {
            return Err(KeystoreError::Duplicate);
        }
        items.insert(slot, StoredItem::from_new(item));
        Ok(())
    }

    fn delete(&self, query: &ItemQuery) -> KeystoreResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = (query.class, query.label.clone());
        match items.get(&slot) {
            Some(stored) if stored.matches(query) => {
                items.remove(&slot);
                Ok(())
            }
            _ => Err(KeystoreError::NotFound),
        }
    }

    fn lifecycle_lock(&self) -> KeystoreResult<LifecycleLock<'_>> {
        let guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(LifecycleLock {
            held: Held::Process { _guard: guard },
        })
    }
}

// ============================================================================
// FileKeystore
// ============================================================================

const LOCK_FILE_NAME: &str = ".lock";

/// File-based keystore.
///
/// Each entry is stored as `<class>-<label>.json`.
///
/// - Directory permissions are set to 0700 (owner only)
/// - File permissions are set to 0600 (owner read/write only)
/// - Writes go to a temp file that is linked into place only if the slot
///   is still free, so concurrent `add`s see [`KeystoreError::Duplicate`]
/// - [`Keystore::lifecycle_lock`] takes an advisory lock on `.lock` in the
///   directory, shared by every process using it
///
/// Labels are validated by [`KeyLabel`], so file names cannot escape the
/// directory.
///
/// # Example
///
/// ```no_run
/// use enclavekey_crypto::keystore::FileKeystore;
/// use std::path::PathBuf;
///
/// let keystore = FileKeystore::with_path(PathBuf::from("/tmp/enclavekey-keystore"))
///     .expect("failed to open keystore");
/// ```
#[derive(Debug)]
pub struct FileKeystore {
    dir: PathBuf,
}

impl FileKeystore {
    /// Open (creating if needed) a keystore directory.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Io`] if the directory cannot be created or
    /// its permissions cannot be set.
    pub fn with_path(dir: PathBuf) -> KeystoreResult<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&dir)?.permissions();
            perms.set_mode(0o700);
            fs::set_permissions(&dir, perms)?;
        }

        Ok(Self { dir })
    }

    /// The directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, class: KeyClass, label: &KeyLabel) -> PathBuf {
        self.dir.join(format!("{class}-{label}.json"))
    }

    fn read_entry(&self, class: KeyClass, label: &KeyLabel) -> KeystoreResult<Option<StoredItem>> {
        let contents = match fs::read(self.entry_path(class, label)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredItem =
            serde_json::from_slice(&contents).map_err(|_| KeystoreError::InvalidFormat)?;

        if stored.class != class || &stored.label != label {
            return Err(KeystoreError::InvalidFormat);
        }

        Ok(Some(stored))
    }
}

impl Keystore for FileKeystore {
    fn find(&self, query: &ItemQuery) -> KeystoreResult<KeystoreItem> {
        let stored = self
            .read_entry(query.class, &query.label)?
            .filter(|stored| stored.matches(query))
            .ok_or(KeystoreError::NotFound)?;
        stored.to_item(query.return_fields)
    }

    fn add(&self, item: &NewItem) -> KeystoreResult<()> {
        item.validate()?;

        let path = self.entry_path(item.class, &item.label);
        let bytes = serde_json::to_vec_pretty(&StoredItem::from_new(item))
            .map_err(|_| KeystoreError::InvalidFormat)?;

        let mut staged = tempfile::Builder::new()
            .prefix(&format!(".{}-{}.", item.class, item.label))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;

        #[cfg(unix)]
        fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o600))?;

        match staged.persist_noclobber(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(KeystoreError::Duplicate)
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn delete(&self, query: &ItemQuery) -> KeystoreResult<()> {
        match self.read_entry(query.class, &query.label)? {
            Some(stored) if stored.matches(query) => {
                match fs::remove_file(self.entry_path(query.class, &query.label)) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Err(KeystoreError::NotFound),
                    Err(e) => Err(e.into()),
                }
            }
            _ => Err(KeystoreError::NotFound),
        }
    }

    fn lifecycle_lock(&self) -> KeystoreResult<LifecycleLock<'_>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE_NAME))?;
        file.lock_exclusive()?;
        Ok(LifecycleLock {
            held: Held::File { _file: file },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn label(s: &str) -> KeyLabel {
        KeyLabel::new(s).expect("valid label")
    }

    fn public_item(name: &str, fill: u8) -> NewItem {
        NewItem::public(label(name), CurveId::EcSecPrimeRandom, vec![fill; 65])
    }

    fn private_item(name: &str) -> NewItem {
        NewItem::private(
            label(name),
            CurveId::EcSecPrimeRandom,
            AccessControlPolicy::default(),
            vec![1u8; 61],
        )
    }

    /// Runs the shared contract against a backend.
    fn exercise_contract(keystore: &dyn Keystore) {
        let public_query = ItemQuery::new(KeyClass::Public, label("k.public")).returning_data();

        assert!(matches!(
            keystore.find(&public_query),
            Err(KeystoreError::NotFound)
        ));

        keystore.add(&public_item("k.public", 4)).expect("add");
        assert!(matches!(
            keystore.add(&public_item("k.public", 5)),
            Err(KeystoreError::Duplicate)
        ));

        let item = keystore.find(&public_query).expect("find");
        assert_eq!(item.data, Some(vec![4u8; 65]));
        assert!(item.reference.is_none());

        keystore
            .add_overwriting(&public_item("k.public", 6))
            .expect("overwrite");
        let item = keystore.find(&public_query).expect("find");
        assert_eq!(item.data, Some(vec![6u8; 65]));

        keystore.add(&private_item("k.private")).expect("add private");
        let private_query =
            ItemQuery::new(KeyClass::Private, label("k.private")).returning_reference();
        let item = keystore.find(&private_query).expect("find private");
        let reference = item.reference.expect("reference requested");
        assert_eq!(reference.class(), KeyClass::Private);
        assert_eq!(reference.label().as_str(), "k.private");
        assert_eq!(reference.payload, vec![1u8; 61]);
        assert!(item.data.is_none());

        assert!(matches!(
            keystore.find(&private_query.clone().returning_data()),
            Err(KeystoreError::Status(s)) if s == Status::PARAM
        ));

        assert!(matches!(
            keystore.find(&private_query.clone().with_key_type(CurveId::Ec)),
            Err(KeystoreError::NotFound)
        ));
        assert!(keystore
            .find(&private_query.clone().with_access_control(AccessControlPolicy::default()))
            .is_ok());
        assert!(matches!(
            keystore.find(
                &private_query
                    .clone()
                    .with_access_control(AccessControlPolicy::passcode_required())
            ),
            Err(KeystoreError::NotFound)
        ));

        keystore
            .delete(&ItemQuery::new(KeyClass::Public, label("k.public")))
            .expect("delete");
        assert!(matches!(
            keystore.delete(&ItemQuery::new(KeyClass::Public, label("k.public"))),
            Err(KeystoreError::NotFound)
        ));
        assert!(keystore.find(&private_query).is_ok());
    }

    #[test]
    fn test_memory_keystore_contract() {
        let keystore = MemoryKeystore::new();
        exercise_contract(&keystore);
        assert_eq!(keystore.len(), 1);
    }

    #[test]
    fn test_file_keystore_contract() {
        let temp = TempDir::new().expect("temp dir");
        let keystore = FileKeystore::with_path(temp.path().join("keystore")).expect("open");
        exercise_contract(&keystore);
    }

    #[test]
    fn test_classes_are_separate_slots() {
        let keystore = MemoryKeystore::new();
        keystore.add(&public_item("same", 4)).expect("add public");
        keystore.add(&private_item("same")).expect("add private");
        assert_eq!(keystore.len(), 2);
    }

    #[test]
    fn test_add_rejects_malformed_items() {
        let keystore = MemoryKeystore::new();

        let mut item = public_item("a", 4);
        item.key_size_bits = 384;
        assert!(matches!(
            keystore.add(&item),
            Err(KeystoreError::Status(s)) if s == Status::PARAM
        ));

        let mut item = private_item("b");
        item.extractable = true;
        assert!(keystore.add(&item).is_err());
        assert!(keystore.is_empty());
    }

    #[test]
    fn test_file_keystore_layout_and_permissions() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("keystore");
        let keystore = FileKeystore::with_path(dir.clone()).expect("open");
        keystore.add(&public_item("app.public", 4)).expect("add");

        let path = dir.join("public-app.public.json");
        assert!(path.exists());
        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["public-app.public.json".to_string()]);

        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).expect("json");
        assert_eq!(json["class"], "public");
        assert_eq!(json["key_type"], "ec_sec_prime_random");
        assert_eq!(json["data"], hex::encode([4u8; 65]));

        #[cfg(unix)]
        {
            let dir_mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(dir_mode, 0o700);
            assert_eq!(file_mode, 0o600);
        }
    }

    #[test]
    fn test_file_keystore_persists_across_instances() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("keystore");
        FileKeystore::with_path(dir.clone())
            .expect("open")
            .add(&private_item("p"))
            .expect("add");

        let reopened = FileKeystore::with_path(dir).expect("reopen");
        let item = reopened
            .find(&ItemQuery::new(KeyClass::Private, label("p")).returning_reference())
            .expect("find");
        assert_eq!(
            item.reference.and_then(|r| r.access_control()),
            Some(AccessControlPolicy::default())
        );
    }

    #[test]
    fn test_file_keystore_corrupt_entry() {
        let temp = TempDir::new().expect("temp dir");
        let keystore = FileKeystore::with_path(temp.path().to_path_buf()).expect("open");
        fs::write(temp.path().join("public-x.json"), b"{not json").expect("write");

        assert!(matches!(
            keystore.find(&ItemQuery::new(KeyClass::Public, label("x"))),
            Err(KeystoreError::InvalidFormat)
        ));
    }

    #[test]
    fn test_concurrent_adds_yield_single_winner() {
        let keystore = Arc::new(MemoryKeystore::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let keystore = Arc::clone(&keystore);
                thread::spawn(move || keystore.add(&public_item("race", i)).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(keystore.len(), 1);
    }

    #[test]
    fn test_file_keystore_concurrent_adds_yield_single_winner() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("keystore");
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let keystore = FileKeystore::with_path(dir.clone()).expect("open");
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match keystore.add(&public_item("race", i)) {
                        Ok(()) => Some(i),
                        Err(KeystoreError::Duplicate) => None,
                        Err(e) => panic!("unexpected add failure: {e}"),
                    }
                })
            })
            .collect();

        let winners: Vec<u8> = handles
            .into_iter()
            .filter_map(|h| h.join().expect("thread"))
            .collect();
        assert_eq!(winners.len(), 1);

        let stored = FileKeystore::with_path(dir)
            .expect("reopen")
            .find(&ItemQuery::new(KeyClass::Public, label("race")).returning_data())
            .expect("find");
        assert_eq!(stored.data, Some(vec![winners[0]; 65]));
    }

    #[test]
    fn test_file_lifecycle_lock_excludes_other_instances() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("keystore");
        let first = FileKeystore::with_path(dir.clone()).expect("open");
        let second = FileKeystore::with_path(dir).expect("open");

        let held = first.lifecycle_lock().expect("lock");
        assert!(held.is_exclusive());

        let (tx, rx) = std::sync::mpsc::channel();
        let waiter = thread::spawn(move || {
            let _lock = second.lifecycle_lock().expect("lock");
            tx.send(()).expect("send");
        });

        assert!(rx
            .recv_timeout(std::time::Duration::from_millis(200))
            .is_err());
        drop(held);
        rx.recv_timeout(std::time::Duration::from_secs(5))
            .expect("lock released");
        waiter.join().expect("thread");
    }

    #[test]
    fn test_memory_lifecycle_lock_is_exclusive() {
        let keystore = MemoryKeystore::new();
        let held = keystore.lifecycle_lock().expect("lock");
        assert!(held.is_exclusive());
        assert!(keystore.lifecycle.try_lock().is_err());
        drop(held);
        assert!(keystore.lifecycle.try_lock().is_ok());
        assert!(!LifecycleLock::unlocked().is_exclusive());
    }
}
