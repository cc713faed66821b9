use crate::{Error, Result};
use highstakes_types::{BetOfferId, CustomerId, SessionKey, SESSION_KEY_PARAM};
use reqwest::{header, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Thin HTTP client for the betting service.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone)]
pub struct Client {
    pub base_url: Url,
    pub http_client: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Build a client whose requests give up after `timeout`. `None` leaves
    /// latency bounded only by the server and transport defaults.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }

        // Without a trailing slash `join` would replace the last path segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url,
            http_client: builder.build()?,
        })
    }

    pub(crate) fn session_url(&self, customer: CustomerId) -> Result<Url> {
        Ok(self.base_url.join(&format!("{customer}/session"))?)
    }

    pub(crate) fn stake_url(&self, bet_offer: BetOfferId, session: &SessionKey) -> Result<Url> {
        let mut url = self.base_url.join(&format!("{bet_offer}/stake"))?;
        url.query_pairs_mut()
            .append_pair(SESSION_KEY_PARAM, session.as_str());
        Ok(url)
    }

    pub(crate) fn high_stakes_url(&self, bet_offer: BetOfferId) -> Result<Url> {
        Ok(self.base_url.join(&format!("{bet_offer}/highstakes"))?)
    }

    /// Fetch (or create) the session key for `customer`.
    pub async fn session(&self, customer: CustomerId) -> Result<SessionKey> {
        let response = self
            .http_client
            .get(self.session_url(customer)?)
            .send()
            .await?;
        let status = response.status();
        debug!(%customer, %status, "session response");
        if status != StatusCode::OK {
            return Err(Error::Failed(status));
        }
        let body = response.text().await?;
        Ok(SessionKey::new(body)?)
    }

    /// Place `stake` on `bet_offer`. A 401 surfaces as [Error::Unauthorized] so
    /// callers can refresh the session and try again.
    pub async fn submit_stake(
        &self,
        bet_offer: BetOfferId,
        session: &SessionKey,
        stake: u64,
    ) -> Result<()> {
        let body = serde_json::to_vec(&stake)?;
        let response = self
            .http_client
            .post(self.stake_url(bet_offer, session)?)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        debug!(%bet_offer, stake, %status, "stake response");
        match status {
            StatusCode::OK => Ok(()),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            status => Err(Error::Failed(status)),
        }
    }

    /// Fetch the raw leaderboard body for `bet_offer`.
    pub async fn high_stakes(&self, bet_offer: BetOfferId) -> Result<String> {
        let response = self
            .http_client
            .get(self.high_stakes_url(bet_offer)?)
            .send()
            .await?;
        let status = response.status();
        debug!(%bet_offer, %status, "highstakes response");
        if status != StatusCode::OK {
            return Err(Error::Failed(status));
        }
        Ok(response.text().await?)
    }
}
