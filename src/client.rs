use std::{marker::PhantomData, sync::Arc, time::Duration};

use anyhow::Context;
use log::{debug, info, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, USER_AGENT},
    Client, RequestBuilder, Response,
};
use url::Url;

use crate::{
    book::{BookInfo, DownloadTask},
    credentials::SessionCredentials,
    error::{LitresError, Result},
    models::{Art, Envelope, FileGroup},
};

/// Marker of the file group holding the plain mp3 release of a book.
const STANDARD_MP3_GROUP: &str = "standard_quality_mp3";
/// Only pages rendered for a logged in user link to the profile.
const PROFILE_MARKER: &str = "/me/profile/";

/// Hosts the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub site: Url,
    pub api: Url,
    pub download: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            site: "https://www.litres.ru/".parse().expect("correct site url"),
            api: "https://api.litres.ru/foundation/api/arts/"
                .parse()
                .expect("correct api url"),
            download: "https://www.litres.ru/download_book_subscr/"
                .parse()
                .expect("correct download url"),
        }
    }
}

impl Endpoints {
    /// All endpoints below a single host, as used by mirrors and local test servers.
    pub fn with_base(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid base url: {}", base))?;
        let join = |path: &str| {
            base.join(path)
                .with_context(|| format!("invalid endpoint: {}", path))
        };
        Ok(Self {
            site: join("/")?,
            api: join("/foundation/api/arts/")?,
            download: join("/download_book_subscr/")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Unchecked;
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

#[derive(Clone)]
pub struct LitresClient<State = Unchecked> {
    client: Client,
    endpoints: Endpoints,
    credentials: Arc<SessionCredentials>,
    state: PhantomData<State>,
}

/// Turn a non-success response into [`LitresError::RemoteApi`], keeping the body for diagnostics.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(LitresError::RemoteApi { url, status, body })
}

impl LitresClient<Unchecked> {
    pub fn new(
        credentials: SessionCredentials,
        endpoints: Endpoints,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json,text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(credentials.user_agent()).context("invalid user agent")?,
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoints,
            credentials: Arc::new(credentials),
            state: PhantomData,
        })
    }

    /// Probe an authenticated page to make sure the cookies still belong to a live session.
    pub async fn check_session(self) -> Result<LitresClient<Authenticated>> {
        info!("Checking session cookies");
        if self.credentials.is_empty() {
            return Err(LitresError::Credentials("no cookies provided".to_string()));
        }

        let response = self.get(self.endpoints.site.clone()).send().await?;
        if !response.status().is_success() {
            return Err(LitresError::Credentials(format!(
                "session probe returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        if !body.contains(PROFILE_MARKER) {
            return Err(LitresError::Credentials(
                "cookies do not belong to a logged in user".to_string(),
            ));
        }

        Ok(LitresClient {
            client: self.client,
            endpoints: self.endpoints,
            credentials: self.credentials,
            state: PhantomData,
        })
    }
}

impl<State> LitresClient<State> {
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn credentials(&self) -> &SessionCredentials {
        &self.credentials
    }

    /// GET request carrying the session cookies.
    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.client
            .get(url)
            .header(COOKIE, self.credentials.cookie_header())
    }

    fn make_api_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self
            .endpoints
            .api
            .join(endpoint)
            .with_context(|| format!("invalid endpoint: {}", endpoint))?)
    }
}

impl LitresClient<Authenticated> {
    pub async fn fetch_book_info(&self, book_id: &str) -> Result<BookInfo> {
        let url = self.make_api_url(book_id)?;
        debug!("GET {}", url);
        let response = ensure_success(self.get(url).send().await?).await?;
        let art = response.json::<Envelope<Art>>().await?.payload.data;
        Ok(BookInfo::from_art(art, &self.endpoints.site))
    }

    /// Audio files of the standard quality mp3 group, in catalog order.
    pub async fn fetch_download_tasks(&self, book_id: &str) -> Result<Vec<DownloadTask>> {
        let url = self.make_api_url(&format!("{}/files/grouped", book_id))?;
        debug!("GET {}", url);
        let response = ensure_success(self.get(url).send().await?).await?;
        let groups = response.json::<Envelope<Vec<FileGroup>>>().await?.payload.data;

        let Some(group) = groups
            .into_iter()
            .find(|group| group.file_type.contains(STANDARD_MP3_GROUP))
        else {
            warn!("Book {} has no {} files", book_id, STANDARD_MP3_GROUP);
            return Ok(Vec::new());
        };

        group
            .files
            .iter()
            .map(|file| DownloadTask::new(&self.endpoints.download, book_id, file))
            .collect()
    }

    pub fn cover_url(&self, book: &BookInfo) -> Result<Url> {
        Ok(self
            .endpoints
            .site
            .join(&book.cover)
            .with_context(|| format!("invalid cover url: {}", book.cover))?)
    }
}
