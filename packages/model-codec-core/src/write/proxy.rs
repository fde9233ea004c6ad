use crate::error::WriteError;
use crate::value::ValueMap;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Storage-side executor for collapsed writes.
pub trait WriteProxy {
    /// Handle to a stored document.
    type Ref;

    /// Resolves a write path, optionally under a prefix, to a document handle.
    fn reference(&self, path: &str, prefix: Option<&str>) -> Self::Ref;

    /// Writes unconditionally.
    fn put(&self, key: &Self::Ref, data: &ValueMap) -> Result<(), WriteError>;

    /// Writes only if no document exists.
    fn create(&self, key: &Self::Ref, data: &ValueMap) -> Result<(), WriteError>;

    /// Merges into an existing document.
    fn update(&self, key: &Self::Ref, data: &ValueMap) -> Result<(), WriteError>;
}

/// Document store held in memory, keyed by path.
#[derive(Debug, Default)]
pub struct InMemoryWriteProxy {
    documents: RwLock<BTreeMap<String, ValueMap>>,
}

impl InMemoryWriteProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<ValueMap> {
        self.documents.read().ok()?.get(path).cloned()
    }

    /// Snapshot of every stored document.
    pub fn documents(&self) -> BTreeMap<String, ValueMap> {
        match self.documents.read() {
            Ok(documents) => documents.clone(),
            Err(_) => BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|documents| documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WriteProxy for InMemoryWriteProxy {
    type Ref = String;

    fn reference(&self, path: &str, prefix: Option<&str>) -> String {
        let path = path.trim_matches('/');
        match prefix.map(|prefix| prefix.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, path),
            _ => path.to_string(),
        }
    }

    fn put(&self, key: &String, data: &ValueMap) -> Result<(), WriteError> {
        let mut documents = self.documents.write().map_err(|_| WriteError::LockPoisoned)?;
        documents.insert(key.clone(), data.clone());
        Ok(())
    }

    fn create(&self, key: &String, data: &ValueMap) -> Result<(), WriteError> {
        let mut documents = self.documents.write().map_err(|_| WriteError::LockPoisoned)?;
        if documents.contains_key(key) {
            return Err(WriteError::Conflict { path: key.clone() });
        }
        documents.insert(key.clone(), data.clone());
        Ok(())
    }

    fn update(&self, key: &String, data: &ValueMap) -> Result<(), WriteError> {
        let mut documents = self.documents.write().map_err(|_| WriteError::LockPoisoned)?;
        let existing = documents
            .get_mut(key)
            .ok_or_else(|| WriteError::NotFound { path: key.clone() })?;
        existing.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn doc(key: &str, value: i64) -> ValueMap {
        let mut map = ValueMap::new();
        map.insert(key.to_string(), Value::Integer(value));
        map
    }

    #[test]
    fn references_join_prefix() {
        let proxy = InMemoryWriteProxy::new();
        assert_eq!(proxy.reference("users/u1", None), "users/u1");
        assert_eq!(proxy.reference("/users/u1", Some("tenants/t1/")), "tenants/t1/users/u1");
        assert_eq!(proxy.reference("users/u1", Some("")), "users/u1");
    }

    #[test]
    fn create_conflicts_on_existing_document() {
        let proxy = InMemoryWriteProxy::new();
        let key = proxy.reference("users/u1", None);
        proxy.create(&key, &doc("a", 1)).unwrap();
        assert_eq!(
            proxy.create(&key, &doc("a", 2)),
            Err(WriteError::Conflict { path: "users/u1".into() })
        );
        proxy.put(&key, &doc("b", 3)).unwrap();
        assert_eq!(proxy.get("users/u1"), Some(doc("b", 3)));
    }

    #[test]
    fn update_merges_into_existing() {
        let proxy = InMemoryWriteProxy::new();
        let key = proxy.reference("users/u1", None);
        assert_eq!(
            proxy.update(&key, &doc("a", 1)),
            Err(WriteError::NotFound { path: "users/u1".into() })
        );
        proxy.put(&key, &doc("a", 1)).unwrap();
        proxy.update(&key, &doc("b", 2)).unwrap();
        let stored = proxy.get("users/u1").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["a"], Value::Integer(1));
        assert_eq!(proxy.len(), 1);
    }
}
