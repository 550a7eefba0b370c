use std::path::Path;

use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{auth, Credentials, ObjectStore};
use crate::{config::SyncConfig, error::StorageError, models::RemoteObject};

const LIST_FIELDS: &str = "items(name,size),nextPageToken";

/// Client for one bucket of the Cloud Storage JSON API.
#[derive(Debug, Clone)]
pub struct GcsClient {
    http: reqwest::Client,
    endpoint: Url,
    bucket: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
    // The JSON API encodes uint64 fields as strings.
    size: Option<String>,
}

impl From<ObjectResource> for RemoteObject {
    fn from(resource: ObjectResource) -> Self {
        RemoteObject {
            size: resource.size.and_then(|size| size.parse().ok()),
            name: resource.name,
        }
    }
}

impl GcsClient {
    /// Resolve ambient credentials and build a client for the configured bucket.
    pub async fn connect(config: &SyncConfig) -> Result<Self, StorageError> {
        let credentials = auth::discover(config.access_token.as_deref()).await;
        Self::new(&config.storage_endpoint, &config.bucket, credentials)
    }

    /// Build a client against an explicit endpoint.
    pub fn new(
        endpoint: &str,
        bucket: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, StorageError> {
        let endpoint =
            Url::parse(endpoint).map_err(|err| StorageError::Url(format!("{endpoint}: {err}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::Url(endpoint.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("sync_games/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            bucket: bucket.into(),
            credentials,
        })
    }

    /// Bucket this client reads from.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn objects_url(&self, name: Option<&str>) -> Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::Url(self.endpoint.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", self.bucket.as_str(), "o"]);
            if let Some(name) = name {
                // Object names contain `/`; they must travel as one segment.
                segments.push(name);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Anonymous => request,
        }
    }

    async fn list_page(
        &self,
        prefix: &str,
        page_token: Option<&str>,
    ) -> Result<ListPage, StorageError> {
        let mut url = self.objects_url(None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("prefix", prefix);
            query.append_pair("fields", LIST_FIELDS);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self.authorize(self.http.get(url.clone())).send().await?;
        let body = check_status(response).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| StorageError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl ObjectStore for GcsClient {
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StorageError> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_page(prefix, page_token.as_deref()).await?;
            debug!(
                bucket = %self.bucket,
                prefix,
                items = page.items.len(),
                "listed page"
            );
            objects.extend(page.items.into_iter().map(RemoteObject::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(objects)
    }

    async fn download(&self, name: &str, dest: &Path) -> Result<u64, StorageError> {
        let mut url = self.objects_url(Some(name))?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.authorize(self.http.get(url)).send().await?;
        let mut response = check_status(response).await?;

        let io_error = |source| StorageError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(dest).await.map_err(io_error)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)?;
        Ok(written)
    }
}

async fn check_status(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Status {
        status: status.as_u16(),
        url,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::storage::testing::{query, serve};

    #[test]
    fn encodes_object_names_as_one_segment() -> Result<()> {
        let client = GcsClient::new(
            "https://storage.googleapis.com/",
            "adapt2learn-api.firebasestorage.app",
            Credentials::Anonymous,
        )?;
        let url = client.objects_url(Some("games/quiz/versions/1/a b.png"))?;
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/adapt2learn-api.firebasestorage.app/o/games%2Fquiz%2Fversions%2F1%2Fa%20b.png"
        );
        Ok(())
    }

    #[test]
    fn rejects_unusable_endpoints() {
        for endpoint in ["not a url", "mailto:ops@example.com"] {
            assert!(matches!(
                GcsClient::new(endpoint, "bucket", Credentials::Anonymous),
                Err(StorageError::Url(_))
            ));
        }
    }

    #[tokio::test]
    async fn follows_page_tokens() -> Result<()> {
        let endpoint = serve(|url, _| {
            assert_eq!(url.path(), "/storage/v1/b/bucket/o");
            assert_eq!(query(url, "prefix").as_deref(), Some("games/quiz/versions/2/"));
            let body = match query(url, "pageToken").as_deref() {
                None => r#"{"items":[
                    {"name":"games/quiz/versions/2/","size":"0"},
                    {"name":"games/quiz/versions/2/index.html","size":"12"}
                ],"nextPageToken":"page-2"}"#,
                Some("page-2") => r#"{"items":[{"name":"games/quiz/versions/2/js/app.js","size":"7"}]}"#,
                Some(other) => panic!("unexpected page token {other}"),
            };
            (200, body.as_bytes().to_vec())
        })
        .await?;

        let client = GcsClient::new(&endpoint, "bucket", Credentials::Anonymous)?;
        let objects = client.list("games/quiz/versions/2/").await?;
        let names: Vec<_> = objects.iter().map(|object| object.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "games/quiz/versions/2/",
                "games/quiz/versions/2/index.html",
                "games/quiz/versions/2/js/app.js"
            ]
        );
        assert_eq!(objects[1].size, Some(12));
        Ok(())
    }

    #[tokio::test]
    async fn empty_listing_has_no_items_field() -> Result<()> {
        let endpoint = serve(|_, _| (200, b"{}".to_vec())).await?;
        let client = GcsClient::new(&endpoint, "bucket", Credentials::Anonymous)?;
        assert!(client.list("games/none/versions/1/").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn downloads_media_with_bearer_token() -> Result<()> {
        let endpoint = serve(|url, head| {
            assert_eq!(
                url.path(),
                "/storage/v1/b/bucket/o/games%2Fquiz%2Fversions%2F2%2Findex.html"
            );
            assert_eq!(query(url, "alt").as_deref(), Some("media"));
            if !head.to_lowercase().contains("authorization: bearer token-123") {
                return (401, b"missing token".to_vec());
            }
            (200, b"<html>quiz</html>".to_vec())
        })
        .await?;

        let dir = tempdir()?;
        let dest = dir.path().join("index.html");
        std::fs::write(&dest, "stale content that is longer than the new one")?;

        let client = GcsClient::new(
            &endpoint,
            "bucket",
            Credentials::Bearer("token-123".to_string()),
        )?;
        let written = client
            .download("games/quiz/versions/2/index.html", &dest)
            .await?;
        assert_eq!(written, 17);
        assert_eq!(std::fs::read_to_string(&dest)?, "<html>quiz</html>");
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() -> Result<()> {
        let endpoint = serve(|_, _| (403, br#"{"error":{"code":403}}"#.to_vec())).await?;
        let client = GcsClient::new(&endpoint, "bucket", Credentials::Anonymous)?;

        let err = client.list("games/quiz/versions/2/").await.unwrap_err();
        match err {
            StorageError::Status { status, body, .. } => {
                assert_eq!(status, 403);
                assert!(body.contains("403"));
            }
            other => panic!("unexpected error {other}"),
        }

        let dir = tempdir()?;
        let dest = dir.path().join("missing.bin");
        let err = client.download("games/quiz/versions/2/x", &dest).await;
        assert!(matches!(err, Err(StorageError::Status { status: 403, .. })));
        assert!(!dest.exists());
        Ok(())
    }
}
