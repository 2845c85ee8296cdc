//! SchemaIndex: one-time ingestion of the JOCF schema corpus.
//!
//! Every `*.schema.json` file under the corpus root is parsed and indexed by
//! its discriminator constant (file type or object type) and registered in the
//! [`SchemaRegistry`] under its `$id`. The index is immutable once built and is
//! `Send + Sync`, so one instance can serve concurrent validations.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::SchemaLoadError;
use crate::loader::load_schema;
use crate::registry::{schema_id, RegistryBuilder, SchemaRegistry};
use crate::types::{
    Discriminator, FileType, ObjectType, SchemaId, FILE_TYPE_KEY, OBJECT_TYPE_KEY,
};

/// Default file name suffix identifying schema files.
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// A schema together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct IndexedSchema {
    /// Path relative to the corpus root, `/`-separated.
    pub path: String,
    pub id: Option<SchemaId>,
    pub schema: Arc<Value>,
}

/// Discriminator index plus Reference Registry for one schema corpus.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    root: PathBuf,
    file_schemas: BTreeMap<FileType, IndexedSchema>,
    object_schemas: BTreeMap<ObjectType, IndexedSchema>,
    documents: Vec<IndexedSchema>,
    registry: SchemaRegistry,
}

impl SchemaIndex {
    /// Load every `*.schema.json` file below `root`.
    ///
    /// # Errors
    ///
    /// Fails if the root does not exist, any schema file is unreadable or
    /// malformed, or two schemas claim the same discriminator or `$id`.
    /// An empty directory is not an error.
    pub fn load_all(root: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        Self::load_with_suffix(root, SCHEMA_FILE_SUFFIX)
    }

    /// Like [`load_all`](Self::load_all) with a custom schema file suffix.
    pub fn load_with_suffix(root: impl AsRef<Path>, suffix: &str) -> Result<Self, SchemaLoadError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SchemaLoadError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut builder = IndexBuilder::new(root);
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|source| SchemaLoadError::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            let is_schema = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.ends_with(suffix))
                    .unwrap_or(false);
            if !is_schema {
                continue;
            }

            let schema = load_schema(entry.path())?;
            builder.add(relative_path(root, entry.path()), schema)?;
        }

        let index = builder.finish();
        tracing::info!(
            root = %root.display(),
            schemas = index.schema_count(),
            file_types = index.file_schemas.len(),
            object_types = index.object_schemas.len(),
            "loaded schema corpus"
        );
        Ok(index)
    }

    /// Build an index from in-memory schemas, keyed by relative path.
    ///
    /// # Errors
    ///
    /// Fails on duplicate discriminators or `$id`s, as `load_all` does.
    pub fn from_schemas<I, P>(root: impl AsRef<Path>, schemas: I) -> Result<Self, SchemaLoadError>
    where
        I: IntoIterator<Item = (P, Value)>,
        P: Into<String>,
    {
        let mut builder = IndexBuilder::new(root.as_ref());
        for (path, schema) in schemas {
            builder.add(path.into(), schema)?;
        }
        Ok(builder.finish())
    }

    /// Corpus root this index was loaded from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File schema declaring `file_type`.
    pub fn file_schema(&self, file_type: &FileType) -> Option<&Value> {
        self.file_schemas.get(file_type).map(|s| s.schema.as_ref())
    }

    /// Object schema declaring `object_type`.
    pub fn object_schema(&self, object_type: &ObjectType) -> Option<&Value> {
        self.object_schemas.get(object_type).map(|s| s.schema.as_ref())
    }

    pub fn has_object_schema(&self, object_type: &ObjectType) -> bool {
        self.object_schemas.contains_key(object_type)
    }

    /// The Reference Registry, fully populated.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Schema registered under an absolute `$id`.
    pub fn schema_by_id(&self, id: &str) -> Option<&Value> {
        self.registry.get(id)
    }

    /// All file type discriminators, sorted.
    pub fn file_types(&self) -> Vec<&FileType> {
        self.file_schemas.keys().collect()
    }

    /// All object type discriminators, sorted.
    pub fn object_types(&self) -> Vec<&ObjectType> {
        self.object_schemas.keys().collect()
    }

    /// Object schemas in discriminator order.
    pub fn object_schemas(&self) -> impl Iterator<Item = (&ObjectType, &IndexedSchema)> {
        self.object_schemas.iter()
    }

    /// Every loaded schema, discriminated or not, in load order.
    pub fn documents(&self) -> &[IndexedSchema] {
        &self.documents
    }

    /// Number of schema files loaded.
    pub fn schema_count(&self) -> usize {
        self.documents.len()
    }
}

struct IndexBuilder {
    root: PathBuf,
    file_schemas: BTreeMap<FileType, IndexedSchema>,
    object_schemas: BTreeMap<ObjectType, IndexedSchema>,
    documents: Vec<IndexedSchema>,
    ids: BTreeMap<SchemaId, String>,
    registry: RegistryBuilder,
}

impl IndexBuilder {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            file_schemas: BTreeMap::new(),
            object_schemas: BTreeMap::new(),
            documents: Vec::new(),
            ids: BTreeMap::new(),
            registry: RegistryBuilder::new(),
        }
    }

    fn add(&mut self, path: String, schema: Value) -> Result<(), SchemaLoadError> {
        let schema = Arc::new(schema);

        let id = schema_id(&schema).and_then(SchemaId::new);
        if let Some(id) = &id {
            if let Some(first) = self.ids.get(id) {
                return Err(SchemaLoadError::DuplicateId {
                    id: id.to_string(),
                    first: PathBuf::from(first),
                    second: PathBuf::from(&path),
                });
            }
            self.ids.insert(id.clone(), path.clone());
        }

        let indexed = IndexedSchema {
            path: path.clone(),
            id,
            schema: Arc::clone(&schema),
        };

        match Discriminator::of_schema(&schema) {
            Some(Discriminator::File(file_type)) => {
                tracing::debug!(%file_type, %path, "registered file schema");
                insert_unique(&mut self.file_schemas, file_type, indexed.clone(), FILE_TYPE_KEY)?;
            }
            Some(Discriminator::Object(object_type)) => {
                tracing::debug!(%object_type, %path, "registered object schema");
                insert_unique(
                    &mut self.object_schemas,
                    object_type,
                    indexed.clone(),
                    OBJECT_TYPE_KEY,
                )?;
            }
            None => tracing::debug!(%path, "registered supporting schema"),
        }

        self.registry.insert(&path, schema);
        self.documents.push(indexed);
        Ok(())
    }

    fn finish(self) -> SchemaIndex {
        SchemaIndex {
            root: self.root,
            file_schemas: self.file_schemas,
            object_schemas: self.object_schemas,
            documents: self.documents,
            registry: self.registry.build(),
        }
    }
}

fn insert_unique<K>(
    map: &mut BTreeMap<K, IndexedSchema>,
    key: K,
    schema: IndexedSchema,
    kind: &'static str,
) -> Result<(), SchemaLoadError>
where
    K: Ord + std::fmt::Display,
{
    match map.entry(key) {
        Entry::Occupied(existing) => Err(SchemaLoadError::DuplicateDiscriminator {
            kind,
            value: existing.key().to_string(),
            first: PathBuf::from(&existing.get().path),
            second: PathBuf::from(schema.path),
        }),
        Entry::Vacant(slot) => {
            slot.insert(schema);
            Ok(())
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const BASE: &str = "https://jocf.startupstandard.org/jocf/main/schema";

    fn write(dir: &TempDir, rel: &str, value: &Value) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "files/TransactionsFile.schema.json",
            &json!({
                "$id": format!("{BASE}/files/TransactionsFile.schema.json"),
                "properties": { "file_type": { "const": "JOCF_TRANSACTIONS_FILE" } }
            }),
        );
        write(
            &dir,
            "objects/transactions/issuance/StockIssuance.schema.json",
            &json!({
                "$id": format!("{BASE}/objects/transactions/issuance/StockIssuance.schema.json"),
                "properties": { "object_type": { "const": "TX_STOCK_ISSUANCE" } }
            }),
        );
        write(
            &dir,
            "types/Monetary.schema.json",
            &json!({
                "$id": format!("{BASE}/types/Monetary.schema.json"),
                "type": "object"
            }),
        );
        fs::write(dir.path().join("README.md"), "not a schema").unwrap();
        dir
    }

    #[test]
    fn load_all_indexes_discriminators() {
        let dir = corpus();
        let index = SchemaIndex::load_all(dir.path()).unwrap();

        let file_type = FileType::new("JOCF_TRANSACTIONS_FILE").unwrap();
        let object_type = ObjectType::new("TX_STOCK_ISSUANCE").unwrap();
        assert!(index.file_schema(&file_type).is_some());
        assert!(index.object_schema(&object_type).is_some());
        assert!(index.has_object_schema(&object_type));
        assert_eq!(index.schema_count(), 3);
        assert_eq!(index.registry().len(), 3);
        assert_eq!(index.root(), dir.path());
    }

    #[test]
    fn lookups_miss_for_unknown_tags() {
        let dir = corpus();
        let index = SchemaIndex::load_all(dir.path()).unwrap();

        assert!(index.file_schema(&FileType::new("JOCF_NOPE_FILE").unwrap()).is_none());
        assert!(!index.has_object_schema(&ObjectType::new("TX_NOPE").unwrap()));
        // A file type string never matches an object schema.
        assert!(index
            .object_schema(&ObjectType::new("JOCF_TRANSACTIONS_FILE").unwrap())
            .is_none());
    }

    #[test]
    fn type_listings_are_sorted() {
        let index = SchemaIndex::from_schemas(
            "mem",
            vec![
                ("b.schema.json", json!({ "properties": { "object_type": { "const": "STOCK_CLASS" } } })),
                ("a.schema.json", json!({ "properties": { "object_type": { "const": "SECURITY_HOLDER" } } })),
            ],
        )
        .unwrap();
        let types: Vec<&str> = index.object_types().iter().map(|t| t.as_str()).collect();
        assert_eq!(types, vec!["SECURITY_HOLDER", "STOCK_CLASS"]);
        assert!(index.file_types().is_empty());
    }

    #[test]
    fn schema_by_id_lookup() {
        let dir = corpus();
        let index = SchemaIndex::load_all(dir.path()).unwrap();
        let schema = index
            .schema_by_id(&format!("{BASE}/types/Monetary.schema.json"))
            .unwrap();
        assert_eq!(schema["type"], "object");

        let monetary = index
            .documents()
            .iter()
            .find(|d| d.path == "types/Monetary.schema.json")
            .unwrap();
        assert_eq!(
            monetary.id.as_ref().map(SchemaId::as_str),
            Some(format!("{BASE}/types/Monetary.schema.json").as_str())
        );
    }

    #[test]
    fn empty_directory_yields_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = SchemaIndex::load_all(dir.path()).unwrap();
        assert_eq!(index.schema_count(), 0);
        assert!(index.object_types().is_empty());
        assert!(index.registry().is_empty());
    }

    #[test]
    fn missing_root_is_fatal() {
        let err = SchemaIndex::load_all("/nonexistent/jocf/schema").unwrap_err();
        assert!(matches!(err, SchemaLoadError::RootNotFound { .. }));
    }

    #[test]
    fn malformed_schema_is_fatal() {
        let dir = corpus();
        fs::write(dir.path().join("objects/Broken.schema.json"), "{ nope").unwrap();
        let err = SchemaIndex::load_all(dir.path()).unwrap_err();
        match err {
            SchemaLoadError::InvalidJson { path, .. } => {
                assert!(path.ends_with("objects/Broken.schema.json"));
            }
            other => panic!("expected InvalidJson, got {other}"),
        }
    }

    #[test]
    fn duplicate_object_type_is_fatal() {
        let err = SchemaIndex::from_schemas(
            "mem",
            vec![
                ("a.schema.json", json!({ "properties": { "object_type": { "const": "STOCK_CLASS" } } })),
                ("b.schema.json", json!({ "properties": { "object_type": { "const": "STOCK_CLASS" } } })),
            ],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaLoadError::DuplicateDiscriminator { kind: "object_type", .. }
        ));
    }

    #[test]
    fn duplicate_id_is_fatal() {
        let err = SchemaIndex::from_schemas(
            "mem",
            vec![
                ("a.schema.json", json!({ "$id": "https://example.com/x.schema.json" })),
                ("b.schema.json", json!({ "$id": "https://example.com/x.schema.json#" })),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaLoadError::DuplicateId { .. }));
    }

    #[test]
    fn custom_suffix() {
        let dir = TempDir::new().unwrap();
        write(&dir, "x.json", &json!({ "properties": { "object_type": { "const": "X" } } }));
        write(&dir, "y.schema.json", &json!({ "properties": { "object_type": { "const": "Y" } } }));

        let index = SchemaIndex::load_with_suffix(dir.path(), ".json").unwrap();
        assert_eq!(index.object_types().len(), 2);

        let index = SchemaIndex::load_all(dir.path()).unwrap();
        assert_eq!(index.object_types().len(), 1);
    }
}
