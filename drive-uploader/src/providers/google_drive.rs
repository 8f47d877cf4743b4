use crate::core::auth_manager::AuthManager;
use crate::providers::traits::{RemoteObject, RemoteStorage, SearchQuery, FOLDER_MIME, JPEG_MIME};
use crate::utils::error::{Result, UploaderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3";
const MULTIPART_BOUNDARY: &str = "===============image-upload===============";

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileMetadataUpload<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct PermissionRequest<'a> {
    role: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(rename = "emailAddress")]
    email_address: &'a str,
}

pub struct GoogleDriveProvider {
    auth: AuthManager,
    client: reqwest::Client,
}

impl GoogleDriveProvider {
    /// `client` should carry the application name as its user agent.
    pub fn new(auth: AuthManager, client: reqwest::Client) -> Self {
        Self { auth, client }
    }

    pub fn http_client(application_name: &str) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().user_agent(application_name).build()?)
    }

    async fn list_page(&self, query: &SearchQuery, page_token: Option<String>) -> Result<FileList> {
        let token = self.auth.get_valid_token().await?;

        let mut url = format!(
            "{}/files?q={}&spaces=drive&orderBy=createdTime&fields=nextPageToken,files(id,name)",
            DRIVE_API_BASE,
            urlencoding::encode(&build_drive_query(query))
        );

        if let Some(pt) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(&pt)));
        }

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(UploaderError::from_response("Failed to list files", response).await);
        }

        Ok(response.json().await?)
    }
}

/// Escape a string for use in a Google Drive API query parameter.
/// Single quotes must be escaped with a backslash.
fn escape_drive_query(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render a [`SearchQuery`] in the Drive `q` syntax. Trashed objects are always excluded.
pub fn build_drive_query(query: &SearchQuery) -> String {
    let mut clauses = vec![format!("mimeType='{}'", escape_drive_query(&query.mime_type))];

    if let Some(ref name) = query.name {
        clauses.push(format!("name='{}'", escape_drive_query(name)));
    }
    if let Some(ref parent_id) = query.parent_id {
        clauses.push(format!("'{}' in parents", escape_drive_query(parent_id)));
    }
    clauses.push("trashed=false".to_string());

    clauses.join(" and ")
}

/// Body of a `multipart/related` upload: JSON metadata followed by the media part.
fn build_multipart_body(metadata_json: &str, media_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--", MULTIPART_BOUNDARY).as_bytes());
    body
}

/// Append a page of results, skipping ids that were already seen.
fn merge_page(all: &mut Vec<RemoteObject>, seen: &mut HashSet<String>, page: Vec<DriveFile>) {
    for file in page {
        if seen.insert(file.id.clone()) {
            tracing::debug!("Found file: {} ({})", file.name, file.id);
            all.push(RemoteObject {
                id: file.id,
                name: file.name,
            });
        }
    }
}

/// Fetch pages until one comes back without a `nextPageToken`, merging them in order.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<RemoteObject>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<FileList>>,
{
    let mut all_files = Vec::new();
    let mut seen = HashSet::new();
    let mut page_token = None;

    loop {
        let file_list = fetch_page(page_token.take()).await?;
        merge_page(&mut all_files, &mut seen, file_list.files);

        match file_list.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(all_files)
}

#[async_trait]
impl RemoteStorage for GoogleDriveProvider {
    fn name(&self) -> &str {
        "google_drive"
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String> {
        let token = self.auth.get_valid_token().await?;

        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let url = format!("{}/files?fields=id,name", DRIVE_API_BASE);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&metadata)
            .send()
            .await?;

        if !response.status().is_success() {
            let context = format!("Failed to create folder '{}'", name);
            return Err(UploaderError::from_response(&context, response).await);
        }

        let file: DriveFile = response.json().await?;

        tracing::info!("Created folder '{}' (ID: {})", name, file.id);
        Ok(file.id)
    }

    async fn upload_file(&self, source: &Path, parent_id: Option<&str>) -> Result<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploaderError::InvalidConfig(format!("Invalid file path: {}", source.display())))?;

        let content = tokio::fs::read(source).await?;
        let token = self.auth.get_valid_token().await?;

        let metadata = FileMetadataUpload {
            name,
            description: "",
            mime_type: JPEG_MIME,
            parents: parent_id.into_iter().collect(),
        };
        let metadata_json = serde_json::to_string(&metadata)?;
        let body = build_multipart_body(&metadata_json, JPEG_MIME, &content);

        let url = format!("{}/files?uploadType=multipart&fields=id,name", DRIVE_UPLOAD_API);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploaderError::from_response("Failed to upload file", response).await);
        }

        let file: DriveFile = response.json().await?;

        tracing::info!("Uploaded image to Drive: {} (ID: {})", name, file.id);
        Ok(file.id)
    }

    async fn grant_access(&self, object_id: &str, email: &str) -> Result<()> {
        let token = self.auth.get_valid_token().await?;

        tracing::debug!("Creating permission for id {}", object_id);

        let url = format!(
            "{}/files/{}/permissions?sendNotificationEmail=false",
            DRIVE_API_BASE,
            urlencoding::encode(object_id)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&PermissionRequest {
                role: "writer",
                kind: "user",
                email_address: email,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploaderError::from_response("Unable to set permissions", response).await);
        }

        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> Result<()> {
        let token = self.auth.get_valid_token().await?;
        let url = format!("{}/files/{}", DRIVE_API_BASE, urlencoding::encode(object_id));

        let response = self.client.delete(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(UploaderError::from_response("Failed to delete file", response).await);
        }

        tracing::info!("Deleted object {}", object_id);
        Ok(())
    }

    async fn find(&self, query: &SearchQuery) -> Result<Vec<RemoteObject>> {
        collect_pages(move |page_token| self.list_page(query, page_token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn drive_file(id: &str, name: &str) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_build_drive_query_with_all_clauses() {
        let query = SearchQuery::folders().named("2024").in_parent(Some("parent1"));
        assert_eq!(
            build_drive_query(&query),
            "mimeType='application/vnd.google-apps.folder' and name='2024' and 'parent1' in parents and trashed=false"
        );
    }

    #[test]
    fn test_build_drive_query_mime_only() {
        assert_eq!(
            build_drive_query(&SearchQuery::mime(JPEG_MIME)),
            "mimeType='image/jpeg' and trashed=false"
        );
    }

    #[test]
    fn test_escape_drive_query() {
        assert_eq!(escape_drive_query("Bob's photos"), "Bob\\'s photos");
        assert_eq!(escape_drive_query("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_merge_page_drops_repeated_ids() {
        let mut all = Vec::new();
        let mut seen = HashSet::new();

        merge_page(&mut all, &mut seen, vec![drive_file("1", "2024"), drive_file("2", "6")]);
        merge_page(&mut all, &mut seen, vec![drive_file("2", "6"), drive_file("3", "15")]);

        let ids: Vec<&str> = all.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    fn page(files: Vec<DriveFile>, next: Option<&str>) -> FileList {
        FileList {
            files,
            next_page_token: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_collect_pages_follows_tokens() {
        let mut pages = VecDeque::from(vec![
            page(vec![drive_file("1", "2024")], Some("p2")),
            page(vec![drive_file("1", "2024"), drive_file("2", "2024")], Some("p3")),
            page(vec![drive_file("3", "2025")], None),
        ]);
        let mut requested = Vec::new();

        let all = collect_pages(|token| {
            requested.push(token);
            let next = pages.pop_front().unwrap();
            async move { Ok(next) }
        })
        .await
        .unwrap();

        let ids: Vec<&str> = all.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(requested, vec![None, Some("p2".to_string()), Some("p3".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_on_error() {
        let mut calls = 0;

        let result = collect_pages(|_| {
            calls += 1;
            let response = if calls == 1 {
                Ok(page(vec![drive_file("1", "2024")], Some("p2")))
            } else {
                Err(UploaderError::ApiError {
                    status: 500,
                    message: "backend error".to_string(),
                })
            };
            async move { response }
        })
        .await;

        assert!(matches!(result, Err(UploaderError::ApiError { status: 500, .. })));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_file_list_parsing() {
        let body = r#"{"nextPageToken": "next", "files": [{"id": "f1", "name": "2024"}]}"#;
        let list: FileList = serde_json::from_str(body).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("next"));
        assert_eq!(list.files[0].id, "f1");

        let last: FileList = serde_json::from_str(r#"{"files": []}"#).unwrap();
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = build_multipart_body(r#"{"name":"a.jpg"}"#, JPEG_MIME, b"JPEGDATA");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with(&format!("--{}\r\n", MULTIPART_BOUNDARY)));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nJPEGDATA"));
        assert!(text.ends_with(&format!("--{}--", MULTIPART_BOUNDARY)));
    }

    #[test]
    fn test_upload_metadata_omits_empty_parents() {
        let metadata = FileMetadataUpload {
            name: "a.jpg",
            description: "",
            mime_type: JPEG_MIME,
            parents: Vec::new(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.get("parents").is_none());
        assert_eq!(json["mimeType"], "image/jpeg");
    }
}
