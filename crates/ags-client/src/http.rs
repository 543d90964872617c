use ags_proto::escrow::key_query;
use ags_proto::{EscrowRequest, OutgoingMessage};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, Url};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{EscrowError, RelayError};
use crate::escrow::EscrowTransport;
use crate::identity::WorkerId;
use crate::relay::{PollBody, RelayTransport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// reqwest-backed transport for both endpoints.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    relay_url: Url,
    escrow_url: Url,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            relay_url: config.relay_url()?,
            escrow_url: config.escrow_url()?,
            timeout: config.request_timeout,
        })
    }

    fn one_shot(&self, request: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

struct ResponseBody(Response);

#[async_trait]
impl PollBody for ResponseBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>, RelayError> {
        Ok(self.0.chunk().await?)
    }
}

#[async_trait]
impl RelayTransport for HttpTransport {
    async fn open_poll(&self, worker: &WorkerId) -> Result<Box<dyn PollBody>, RelayError> {
        let res = self
            .client
            .get(self.relay_url.clone())
            .query(&[("w", worker.as_str())])
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(RelayError::Status(res.status().as_u16()));
        }
        Ok(Box::new(ResponseBody(res)))
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), RelayError> {
        let body = message.to_form_body()?;
        let res = self
            .one_shot(self.client.post(self.relay_url.clone()))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(RelayError::Status(res.status().as_u16()))
    }

    async fn stats(&self) -> Result<String, RelayError> {
        let res = self
            .one_shot(self.client.get(self.relay_url.clone()))
            .query(&[("i", "1")])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(RelayError::Status(res.status().as_u16()));
        }
        Ok(res.text().await?)
    }
}

#[async_trait]
impl EscrowTransport for HttpTransport {
    async fn fetch_timestamp(&self) -> Result<String, EscrowError> {
        let res = self
            .one_shot(self.client.get(self.escrow_url.clone()))
            .send()
            .await?;
        escrow_text(res).await
    }

    async fn request_escrow(&self, request: &EscrowRequest) -> Result<String, EscrowError> {
        let body = request.to_form_body()?;
        let res = self
            .one_shot(self.client.post(self.escrow_url.clone()))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        escrow_text(res).await
    }

    async fn request_key(&self, time: i64) -> Result<String, EscrowError> {
        let mut url = self.escrow_url.clone();
        url.set_query(Some(&key_query(time)?));
        let res = self.one_shot(self.client.get(url)).send().await?;
        escrow_text(res).await
    }
}

async fn escrow_text(res: Response) -> Result<String, EscrowError> {
    if !res.status().is_success() {
        return Err(EscrowError::Status(res.status().as_u16()));
    }
    Ok(res.text().await?)
}
