//! Google-Drive-style provider with the download confirmation handshake.
//!
//! Large files are not served on the first request: the response sets a
//! `download_warning*` cookie instead. Echoing its value back as the
//! `confirm` parameter (with the cookie) returns the actual file.

use url::Url;

use crate::cancel::CancellationToken;
use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::http::{HeaderList, HttpClient, RemoteResponse};

use super::ContentProvider;

#[derive(Debug, Clone)]
pub struct DriveProvider {
    client: HttpClient,
    endpoint: Url,
    cookie_prefix: String,
}

impl DriveProvider {
    pub fn new(client: HttpClient, cfg: &ProviderConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            endpoint: Url::parse(&cfg.endpoint)?,
            cookie_prefix: cfg.confirm_cookie_prefix.clone(),
        })
    }

    fn download_url(&self, identifier: &str, confirm: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", identifier);
            if let Some(token) = confirm {
                query.append_pair("confirm", token);
            }
        }
        url
    }
}

/// `(name, value)` of the first confirmation cookie in `Set-Cookie` headers.
pub(crate) fn confirm_cookie(headers: &HeaderList, prefix: &str) -> Option<(String, String)> {
    headers.get_all("set-cookie").find_map(|raw| {
        let pair = raw.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let (name, value) = (name.trim(), value.trim());
        (name.starts_with(prefix) && !value.is_empty())
            .then(|| (name.to_string(), value.to_string()))
    })
}

impl ContentProvider for DriveProvider {
    fn resolve(
        &self,
        identifier: &str,
        extra_headers: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, FetchError> {
        let url = self.download_url(identifier, None);
        let first = self.client.get(url.as_str(), extra_headers, cancel)?;

        let Some((name, token)) = confirm_cookie(&first.headers, &self.cookie_prefix) else {
            return Ok(first);
        };
        // Only the confirmed response is streamed.
        drop(first);
        tracing::debug!(identifier, cookie = %name, "provider requires download confirmation");

        let mut headers = extra_headers.to_vec();
        headers.push(("Cookie".to_string(), format!("{name}={token}")));
        let url = self.download_url(identifier, Some(&token));
        self.client.get(url.as_str(), &headers, cancel)
    }
}
