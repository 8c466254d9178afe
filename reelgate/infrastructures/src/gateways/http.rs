use ::async_trait::async_trait;
use ::domain::AdKind;
use ::domain::ItemId;
use ::domain::Quality;
use ::use_cases::errors::BackendError;
use ::use_cases::gateways::AuthorizationService;
use ::use_cases::gateways::BalanceBackend;
use ::use_cases::gateways::LikeBackend;
use ::use_cases::gateways::SourceOptimizer;
use ::use_cases::models::descriptors::AccessGrant;
use ::use_cases::models::descriptors::AdContext;
use ::use_cases::models::descriptors::RewardReceipt;
use ::use_cases::models::descriptors::SpendReceipt;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

/// Client of the content backend: access grants, wallet, likes and optimized sources.
///
/// Every endpoint answers with a `{status, data, message}` envelope.
#[derive(::bon::Builder)]
pub struct HttpBackend {
    #[builder(into)]
    base_url: MaybeOwnedString,

    #[builder(into)]
    token: Option<MaybeOwnedString>,

    #[builder(default)]
    client: ::reqwest::Client,
}

#[derive(Debug, ::serde::Deserialize)]
struct Envelope<Data> {
    status: i64,
    #[serde(default = "Option::default")]
    data: Option<Data>,
    #[serde(default)]
    message: String,
}

impl<Data> Envelope<Data> {
    fn into_data(self) -> Result<Option<Data>, BackendError> {
        match self.status {
            200..=299 => Ok(self.data),
            status => Err(BackendError::rejected(status, self.message)),
        }
    }
}

#[derive(Debug, Default, ::serde::Deserialize)]
struct GrantData {
    #[serde(default)]
    cookies: ::std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Default, ::serde::Deserialize)]
struct BalanceData {
    balance: Option<u64>,
}

#[derive(Debug, Default, ::serde::Deserialize)]
struct RewardData {
    #[serde(default)]
    coins: u64,
    balance: Option<u64>,
}

#[derive(Debug, Default, ::serde::Deserialize)]
struct SourceData {
    #[serde(default)]
    url: String,
}

#[derive(Debug, ::serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RewardRequest<'a> {
    kind: AdKind,
    item_id: Option<&'a str>,
    benefit_id: Option<&'a str>,
}

impl HttpBackend {
    fn url(&self, path: ::std::fmt::Arguments<'_>) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn call<Data>(&self, request: ::reqwest::RequestBuilder) -> Result<Option<Data>, BackendError>
    where
        Data: ::serde::de::DeserializeOwned,
    {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(::anyhow::Error::from)?;
        let envelope: Envelope<Data> = response.json().await.map_err(::anyhow::Error::from)?;

        envelope.into_data()
    }
}

#[async_trait]
impl AuthorizationService for HttpBackend {
    async fn grant(self: ::std::sync::Arc<Self>, item_id: ItemId) -> Fallible<AccessGrant> {
        let request = self.client.get(self.url(format_args!("items/{}/grant", item_id)));
        let data: GrantData = self.call(request).await?.unwrap_or_default();

        Ok(AccessGrant { cookies: data.cookies })
    }
}

#[async_trait]
impl BalanceBackend for HttpBackend {
    async fn spend_coins(self: ::std::sync::Arc<Self>, item_id: ItemId, amount: u64) -> Result<SpendReceipt, BackendError> {
        let request = self
            .client
            .post(self.url(format_args!("items/{}/unlock", item_id)))
            .json(&::serde_json::json!({ "amount": amount }));
        let data: BalanceData = self.call(request).await?.unwrap_or_default();

        Ok(SpendReceipt { balance: data.balance })
    }

    async fn record_ad_reward(
        self: ::std::sync::Arc<Self>, kind: AdKind, context: AdContext,
    ) -> Result<RewardReceipt, BackendError> {
        let body = RewardRequest {
            kind,
            item_id: context.item_id.as_deref(),
            benefit_id: context.benefit_id.as_deref(),
        };

        let request = self.client.post(self.url(format_args!("ads/rewards"))).json(&body);
        let data: RewardData = self.call(request).await?.unwrap_or_default();

        Ok(RewardReceipt { coins: data.coins, balance: data.balance })
    }

    async fn balance(self: ::std::sync::Arc<Self>, user_id: MaybeOwnedString) -> Result<u64, BackendError> {
        let request = self.client.get(self.url(format_args!("users/{}/balance", user_id)));
        let data: Option<BalanceData> = self.call(request).await?;

        data.and_then(|data| data.balance)
            .ok_or_else(|| BackendError::Transport(::anyhow::anyhow!("balance missing from response")))
    }
}

#[async_trait]
impl LikeBackend for HttpBackend {
    async fn set_liked(self: ::std::sync::Arc<Self>, item_id: ItemId, liked: bool) -> Result<(), BackendError> {
        let url = self.url(format_args!("items/{}/like", item_id));
        let request = match liked {
            true => self.client.post(url),
            false => self.client.delete(url),
        };

        self.call::<::serde::de::IgnoredAny>(request).await?;

        Ok(())
    }
}

#[async_trait]
impl SourceOptimizer for HttpBackend {
    async fn optimize(
        self: ::std::sync::Arc<Self>, item_id: ItemId, quality: Quality, direct: MaybeOwnedString,
    ) -> Fallible<MaybeOwnedString> {
        let request = self
            .client
            .get(self.url(format_args!("items/{}/best", item_id)))
            .query(&[("quality", quality.label()), ("source", direct.as_ref())]);
        let data: SourceData = self.call(request).await?.unwrap_or_default();

        Ok(data.url.into())
    }
}
