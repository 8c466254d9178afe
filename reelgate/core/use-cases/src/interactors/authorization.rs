use ::domain::ItemId;

use crate::gateways::AuthorizationService;
use crate::models::descriptors::AccessGrant;
use crate::models::descriptors::Headers;

/// Attaches per-item access grants to outgoing playback requests.
pub struct AuthorizationAttachment {
    service: ::std::sync::Arc<dyn AuthorizationService>,
    grants: ::tokio::sync::Mutex<::std::collections::HashMap<ItemId, AccessGrant>>,
}

impl AuthorizationAttachment {
    pub fn new(service: ::std::sync::Arc<dyn AuthorizationService>) -> Self {
        Self { service, grants: ::tokio::sync::Mutex::new(::std::collections::HashMap::new()) }
    }

    /// Headers carrying the grant of `item_id`.
    ///
    /// A grant is fetched once and reused. When it cannot be obtained after one retry the
    /// request goes out unauthenticated, which the player reports back as `Unauthorized`.
    pub async fn attach(&self, item_id: &ItemId) -> Headers {
        if let Some(grant) = self.grants.lock().await.get(item_id) {
            return grant.headers();
        }

        let mut last_error = None;

        for attempt in 1..=2 {
            match ::std::sync::Arc::clone(&self.service).grant(item_id.clone()).await {
                Ok(grant) => {
                    let headers = grant.headers();
                    self.grants.lock().await.insert(item_id.clone(), grant);

                    return headers;
                },
                Err(error) => {
                    ::tracing::debug!(%item_id, attempt, %error, "access grant request failed");
                    last_error = Some(error);
                },
            }
        }

        if let Some(error) = last_error {
            ::tracing::warn!(%item_id, %error, "playing without access grant");
        }

        Headers::new()
    }

    /// Forgets the grant of `item_id`; the next attachment fetches a fresh one.
    pub async fn invalidate(&self, item_id: &ItemId) {
        self.grants.lock().await.remove(item_id);
    }
}
