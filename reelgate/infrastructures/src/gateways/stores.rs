use ::async_trait::async_trait;
use ::use_cases::gateways::KeyValueStore;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::extensions::OptionExt;

type Document = ::serde_json::Map<String, ::serde_json::Value>;

/// Key-value store kept as a single JSON object on disk.
///
/// The document is read once, on first access, and every write replaces the file
/// by renaming a freshly written sibling over it. Writes are serialized.
#[derive(::bon::Builder)]
pub struct JsonFileKeyValueStore {
    #[builder(into)]
    path: MaybeOwnedPath,

    #[builder(skip)]
    document: ::tokio::sync::Mutex<Option<Document>>,
}

impl JsonFileKeyValueStore {
    async fn read(&self) -> Fallible<Document> {
        match ::tokio::fs::read(&self.path).await {
            Ok(bytes) => match ::serde_json::from_slice(&bytes) {
                Ok(document) => Ok(document),
                Err(error) => {
                    ::tracing::warn!(path = %self.path.display(), %error, "discarding unreadable store");
                    Ok(Document::new())
                },
            },

            Err(err) if err.kind() == ::std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, document: &Document) -> Fallible<()> {
        let directory = self.path.parent().ok()?;
        if !directory.as_os_str().is_empty() {
            ::tokio::fs::create_dir_all(directory).await?;
        }

        let file_name = self.path.file_name().ok()?.to_string_lossy();
        let staging_path = directory.join(format!(".{}.tmp", file_name));

        ::tokio::fs::write(&staging_path, ::serde_json::to_vec_pretty(document)?).await?;
        ::tokio::fs::rename(&staging_path, &self.path).await?;

        Ok(())
    }

    async fn loaded<'slot>(&self, slot: &'slot mut Option<Document>) -> Fallible<&'slot mut Document> {
        if slot.is_none() {
            *slot = Some(self.read().await?);
        }

        slot.as_mut().ok()
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKeyValueStore {
    async fn get(self: ::std::sync::Arc<Self>, key: &str) -> Fallible<Option<::serde_json::Value>> {
        let mut slot = self.document.lock().await;
        let document = self.loaded(&mut slot).await?;

        Ok(document.get(key).cloned())
    }

    async fn set(self: ::std::sync::Arc<Self>, key: &str, value: ::serde_json::Value) -> Fallible<()> {
        let mut slot = self.document.lock().await;
        let document = self.loaded(&mut slot).await?;

        document.insert(key.to_owned(), value);
        self.write(document).await
    }

    async fn delete(self: ::std::sync::Arc<Self>, key: &str) -> Fallible<()> {
        let mut slot = self.document.lock().await;
        let document = self.loaded(&mut slot).await?;

        if document.remove(key).is_some() {
            self.write(document).await?;
        }

        Ok(())
    }
}

/// Volatile store for sandbox sessions.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: ::std::sync::Mutex<::std::collections::HashMap<String, ::serde_json::Value>>,
}

impl InMemoryKeyValueStore {
    fn values(&self) -> ::std::sync::MutexGuard<'_, ::std::collections::HashMap<String, ::serde_json::Value>> {
        self.values.lock().unwrap_or_else(::std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(self: ::std::sync::Arc<Self>, key: &str) -> Fallible<Option<::serde_json::Value>> {
        Ok(self.values().get(key).cloned())
    }

    async fn set(self: ::std::sync::Arc<Self>, key: &str, value: ::serde_json::Value) -> Fallible<()> {
        self.values().insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(self: ::std::sync::Arc<Self>, key: &str) -> Fallible<()> {
        self.values().remove(key);
        Ok(())
    }
}
