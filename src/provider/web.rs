//! HTTP note source
//!
//! This module implements [`NoteSource`] against the platform's web API:
//! - Building the shared HTTP client from the provider configuration
//! - `GET user_posted` for listing pages
//! - `POST feed` for note details
//! - Mapping the `{success, msg, data}` envelope onto [`ProviderError`]

use crate::config::ProviderConfig;
use crate::item::{ItemReference, OwnerRef};
use crate::provider::{
    ListingPage, NoteSource, ProviderError, ProviderResult, RawNote, RequestSigner, SigningInput,
};
use async_trait::async_trait;
use reqwest::{Client, Proxy, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const LISTING_PATH: &str = "/api/sns/web/v1/user_posted";
const FEED_PATH: &str = "/api/sns/web/v1/feed";
const IMAGE_FORMATS: [&str; 3] = ["jpg", "webp", "avif"];
const DETAIL_XSEC_SOURCE: &str = "pc_search";

/// Builds the HTTP client shared by the API source and media downloads
///
/// # Arguments
///
/// * `config` - The provider configuration (user agent, timeout, proxy)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy or TLS backend failure
pub fn build_http_client(config: &ProviderConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    msg: Option<String>,

    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    notes: Vec<ListedNote>,

    #[serde(default)]
    cursor: Option<String>,

    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListedNote {
    note_id: String,

    #[serde(default)]
    xsec_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct FeedData {
    #[serde(default)]
    items: Vec<RawNote>,
}

/// [`NoteSource`] backed by the platform's JSON web API
pub struct WebApiSource {
    client: Client,
    signer: Arc<dyn RequestSigner>,
    base_url: String,
    page_size: u32,
}

impl WebApiSource {
    /// Creates a source that signs every request with `signer`
    pub fn new(
        client: Client,
        signer: Arc<dyn RequestSigner>,
        base_url: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            signer,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size,
        }
    }

    async fn signed(
        &self,
        builder: RequestBuilder,
        input: SigningInput<'_>,
    ) -> ProviderResult<RequestBuilder> {
        let signed = self.signer.sign(&input).await?;
        Ok(signed
            .headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str())))
    }

    async fn send<T: DeserializeOwned + Default>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Rejected(format!("HTTP {}", status)))
            }
            Err(e) => return Err(ProviderError::Decode(e.to_string())),
        };

        if !envelope.success {
            return Err(ProviderError::Rejected(
                envelope.msg.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl NoteSource for WebApiSource {
    async fn list_notes(&self, owner: &OwnerRef, cursor: &str) -> ProviderResult<ListingPage> {
        let page_size = self.page_size.to_string();
        let image_formats = IMAGE_FORMATS.join(",");
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("num", &page_size)
            .append_pair("cursor", cursor)
            .append_pair("user_id", &owner.owner_id)
            .append_pair("image_formats", &image_formats)
            .append_pair("xsec_token", &owner.xsec_token)
            .append_pair("xsec_source", &owner.xsec_source)
            .finish();
        let api_path = format!("{}?{}", LISTING_PATH, query);

        debug!("Listing {} at cursor '{}'", owner.owner_id, cursor);

        let request = self.client.get(format!("{}{}", self.base_url, api_path));
        let request = self
            .signed(
                request,
                SigningInput {
                    api_path: &api_path,
                    body: None,
                    method: "GET",
                },
            )
            .await?;

        let data: ListingData = self.send(request).await?;

        Ok(ListingPage {
            items: data
                .notes
                .into_iter()
                .map(|note| ItemReference {
                    id: note.note_id,
                    cursor_token: note.xsec_token,
                    owner_id: owner.owner_id.clone(),
                })
                .collect(),
            next_cursor: data.cursor.filter(|c| !c.is_empty()),
            has_more: data.has_more,
        })
    }

    async fn fetch_note(&self, reference: &ItemReference) -> ProviderResult<RawNote> {
        let body = serde_json::json!({
            "source_note_id": reference.id,
            "image_formats": IMAGE_FORMATS,
            "extra": { "need_body_topic": "1" },
            "xsec_source": DETAIL_XSEC_SOURCE,
            "xsec_token": reference.cursor_token,
        })
        .to_string();

        debug!("Fetching note {}", reference.id);

        let request = self
            .client
            .post(format!("{}{}", self.base_url, FEED_PATH))
            .body(body.clone());
        let request = self
            .signed(
                request,
                SigningInput {
                    api_path: FEED_PATH,
                    body: Some(&body),
                    method: "POST",
                },
            )
            .await?;

        let data: FeedData = self.send(request).await?;

        data.items
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyPayload)
    }
}
