//! Key/value application settings

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::{Result, SpectraError};
use crate::store::SharedStore;

#[derive(Clone)]
pub struct SettingsService {
    store: SharedStore,
    catalog: Arc<Catalog>,
}

impl SettingsService {
    pub fn new(store: SharedStore, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    /// All settings; the defaults are written on the first read of an empty table
    pub async fn get_all(&self) -> Result<BTreeMap<String, String>> {
        let mut rows = self.store.list_settings().await?;
        if rows.is_empty() {
            self.seed_defaults().await?;
            rows = self.store.list_settings().await?;
        }
        Ok(rows.into_iter().map(|s| (s.key, s.value)).collect())
    }

    /// Upsert every entry, returning what was written
    ///
    /// Nothing is written unless every key is valid.
    pub async fn put_all(
        &self,
        settings: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        settings.keys().try_for_each(|key| check_key(key))?;

        let mut written = BTreeMap::new();
        for (key, value) in settings {
            let row = self.store.upsert_setting(&key, &value).await?;
            written.insert(row.key, row.value);
        }
        Ok(written)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<BTreeMap<String, String>> {
        check_key(key)?;
        let row = self.store.upsert_setting(key, value).await?;
        Ok(BTreeMap::from([(row.key, row.value)]))
    }

    /// Write any default that is missing; existing values are kept
    pub async fn seed_defaults(&self) -> Result<usize> {
        let mut written = 0;
        for (key, value) in self.catalog.default_settings() {
            if self.store.insert_setting_if_absent(key, value).await? {
                written += 1;
            }
        }
        Ok(written)
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(SpectraError::validation("setting key must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> SettingsService {
        SettingsService::new(MemoryStore::shared(), Arc::new(Catalog::builtin()))
    }

    #[tokio::test]
    async fn test_first_read_seeds_defaults() {
        let service = service();
        let all = service.get_all().await.unwrap();
        assert_eq!(all.get("defaultRegion").map(String::as_str), Some("IE"));
        assert_eq!(all.len(), Catalog::builtin().default_settings().len());
    }

    #[tokio::test]
    async fn test_reseed_does_not_overwrite() {
        let service = service();
        service.set("defaultRegion", "SE").await.unwrap();

        let written = service.seed_defaults().await.unwrap();
        assert_eq!(written, Catalog::builtin().default_settings().len() - 1);
        let all = service.get_all().await.unwrap();
        assert_eq!(all["defaultRegion"], "SE");
    }

    #[tokio::test]
    async fn test_put_all_upserts() {
        let service = service();
        service.get_all().await.unwrap();
        let written = service
            .put_all(BTreeMap::from([
                ("alertChannel".to_string(), "slack".to_string()),
                ("customKey".to_string(), "42".to_string()),
            ]))
            .await
            .unwrap();
        assert_eq!(written.len(), 2);

        let all = service.get_all().await.unwrap();
        assert_eq!(all["alertChannel"], "slack");
        assert_eq!(all["customKey"], "42");
    }

    #[tokio::test]
    async fn test_put_all_with_invalid_key_writes_nothing() {
        let service = service();
        // U+3000 is whitespace and sorts after every ASCII key
        let err = service
            .put_all(BTreeMap::from([
                ("alertChannel".to_string(), "slack".to_string()),
                ("\u{3000}".to_string(), "x".to_string()),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, SpectraError::Validation(_)));

        let all = service.get_all().await.unwrap();
        assert_eq!(all["alertChannel"], "email");
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        assert!(matches!(
            service().set(" ", "x").await,
            Err(SpectraError::Validation(_))
        ));
    }
}
