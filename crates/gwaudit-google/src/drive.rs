//! Drive API: shared drives, their permissions, and report upload

use gwaudit_core::{FetchError, Page, fmt_num};
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;

use crate::ApiFetcher;
use crate::client::{ApiError, GoogleClient, endpoint};
use crate::model::{Drive, DriveFile, DriveList, FileList, Permission, PermissionList};

const BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Page size for drive and permission listings
const PAGE_SIZE: &str = "100";

/// Page size for file searches
const FILES_PAGE_SIZE: &str = "1000";

/// Part separator of multipart uploads
const BOUNDARY: &str = "gwaudit-7d1f0c5e9a2b4e38";

fn upload_metadata(name: &str, parent_folder: &str) -> String {
    let mut meta = serde_json::json!({ "name": name });
    if !parent_folder.is_empty() {
        meta["parents"] = serde_json::json!([parent_folder]);
    }
    meta.to_string()
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn multipart_body(metadata: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[derive(Debug, Clone)]
pub struct DriveApi {
    client: GoogleClient,
    fetcher: ApiFetcher,
}

impl DriveApi {
    pub fn new(client: GoogleClient, fetcher: ApiFetcher) -> Self {
        Self { client, fetcher }
    }

    /// One page of every shared drive in the domain (admin access).
    pub async fn shared_drives_page(&self, cursor: String) -> Result<Page<Drive>, ApiError> {
        let url = endpoint(BASE, &["drives"])?;
        let params = [
            ("pageSize", PAGE_SIZE.to_string()),
            ("useDomainAdminAccess", "true".into()),
            ("fields", "*".into()),
        ];
        self.client
            .list_page::<DriveList>(url, &params, &cursor)
            .await
    }

    pub async fn shared_drives(&self) -> Result<Vec<Drive>, FetchError> {
        self.fetcher
            .labelled("Shared drives")
            .fetch_all("", |cursor| self.shared_drives_page(cursor))
            .await
    }

    /// One page of the permissions on a file or shared drive.
    pub async fn permissions_page(
        &self,
        file_id: &str,
        cursor: String,
    ) -> Result<Page<Permission>, ApiError> {
        let url = endpoint(BASE, &["files", file_id, "permissions"])?;
        let params = [
            ("pageSize", PAGE_SIZE.to_string()),
            ("supportsAllDrives", "true".into()),
            ("useDomainAdminAccess", "true".into()),
            ("fields", "*".into()),
        ];
        self.client
            .list_page::<PermissionList>(url, &params, &cursor)
            .await
    }

    pub async fn permissions(&self, file_id: &str) -> Result<Vec<Permission>, FetchError> {
        let permissions = self
            .fetcher
            .labelled(format!("Permissions of {file_id}"))
            .quiet()
            .fetch_all("", |cursor| self.permissions_page(file_id, cursor))
            .await?;
        log::debug!(
            "Getting permissions for [{file_id}] - {} permissions found",
            permissions.len()
        );
        Ok(permissions)
    }

    /// One page of the files visible to the token's user matching `query`.
    pub async fn files_page(&self, query: &str, cursor: String) -> Result<Page<DriveFile>, ApiError> {
        let url = endpoint(BASE, &["files"])?;
        let params = [
            ("q", query.to_string()),
            ("pageSize", FILES_PAGE_SIZE.to_string()),
            ("fields", "*".into()),
        ];
        self.client
            .list_page::<FileList>(url, &params, &cursor)
            .await
    }

    /// Every file matching `query`; `owner` only labels the progress log.
    pub async fn files(&self, query: &str, owner: &str) -> Result<Vec<DriveFile>, FetchError> {
        self.fetcher
            .labelled(format!("User {owner} files"))
            .fetch_all("", |cursor| self.files_page(query, cursor))
            .await
    }

    /// One multipart `files.create` carrying the metadata and the content,
    /// so a retried upload never leaves a half-created file behind.
    pub(crate) fn upload_request(
        &self,
        data: &[u8],
        name: &str,
        parent_folder: &str,
    ) -> Result<RequestBuilder, ApiError> {
        let url = endpoint(UPLOAD_BASE, &["files"])?;
        let metadata = upload_metadata(name, parent_folder);
        Ok(self
            .client
            .post(url)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id,name,webViewLink,size"),
            ])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(multipart_body(&metadata, "application/zip", data)))
    }

    /// Upload `data` as `name` into `parent_folder` (a folder id or `root`).
    pub async fn upload(
        &self,
        data: Vec<u8>,
        name: &str,
        parent_folder: &str,
    ) -> Result<DriveFile, FetchError> {
        log::info!("Uploading {name} ({} bytes) to Google Drive...", fmt_num(data.len()));
        self.fetcher
            .labelled("Upload")
            .call(move || {
                let req = self.upload_request(&data, name, parent_folder);
                async move { self.client.send_json::<DriveFile>(req?).await }
            })
            .await
    }
}
