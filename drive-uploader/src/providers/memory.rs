//! In-memory [`RemoteStorage`] used by the tests. Records every call and can be
//! told to fail specific operations.

use crate::providers::traits::{RemoteObject, RemoteStorage, SearchQuery, FOLDER_MIME, JPEG_MIME};
use crate::utils::error::{Result, UploaderError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    objects: Vec<StoredObject>,
    grants: Vec<(String, String)>,
    deleted: Vec<String>,
    upload_attempts: Vec<String>,
    create_calls: usize,
    find_calls: usize,
    queries: Vec<SearchQuery>,
    grant_calls: usize,
    fail_find: bool,
    fail_create: bool,
    failing_uploads: HashSet<String>,
    failing_emails: HashSet<String>,
    failing_deletes: HashSet<String>,
}

impl State {
    fn insert(&mut self, name: &str, mime_type: &str, parent_id: Option<&str>) -> String {
        self.next_id += 1;
        let id = format!("id-{}", self.next_id);
        self.objects.push(StoredObject {
            id: id.clone(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parent_id: parent_id.map(str::to_string),
        });
        id
    }
}

fn injected(operation: &str) -> UploaderError {
    UploaderError::ApiError {
        status: 503,
        message: format!("injected {} failure", operation),
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a folder without counting it as a `create_folder` call.
    pub fn insert_folder(&self, name: &str, parent_id: Option<&str>) -> String {
        self.state.lock().unwrap().insert(name, FOLDER_MIME, parent_id)
    }

    pub fn folders(&self) -> Vec<StoredObject> {
        self.objects_of(FOLDER_MIME)
    }

    pub fn files(&self) -> Vec<StoredObject> {
        self.objects_of(JPEG_MIME)
    }

    fn objects_of(&self, mime_type: &str) -> Vec<StoredObject> {
        let state = self.state.lock().unwrap();
        state.objects.iter().filter(|o| o.mime_type == mime_type).cloned().collect()
    }

    pub fn grants(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().grants.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn upload_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().upload_attempts.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    /// Every query passed to `find`, in call order.
    pub fn find_queries(&self) -> Vec<SearchQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn grant_calls(&self) -> usize {
        self.state.lock().unwrap().grant_calls
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.create_calls
            + state.find_calls
            + state.grant_calls
            + state.upload_attempts.len()
            + state.deleted.len()
    }

    pub fn fail_find(&self, fail: bool) {
        self.state.lock().unwrap().fail_find = fail;
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.state.lock().unwrap().failing_uploads.insert(name.to_string());
    }

    pub fn fail_grant_for(&self, email: &str) {
        self.state.lock().unwrap().failing_emails.insert(email.to_string());
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.state.lock().unwrap().failing_deletes.insert(id.to_string());
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_find = false;
        state.fail_create = false;
        state.failing_uploads.clear();
        state.failing_emails.clear();
        state.failing_deletes.clear();
    }
}

#[async_trait]
impl RemoteStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if state.fail_create {
            return Err(injected("create"));
        }
        Ok(state.insert(name, FOLDER_MIME, parent_id))
    }

    async fn upload_file(&self, source: &Path, parent_id: Option<&str>) -> Result<String> {
        let name = source.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();

        let mut state = self.state.lock().unwrap();
        state.upload_attempts.push(name.clone());
        if state.failing_uploads.contains(&name) {
            return Err(injected("upload"));
        }
        Ok(state.insert(&name, JPEG_MIME, parent_id))
    }

    async fn grant_access(&self, object_id: &str, email: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.grant_calls += 1;
        if state.failing_emails.contains(email) {
            return Err(injected("grant"));
        }
        state.grants.push((object_id.to_string(), email.to_string()));
        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(object_id.to_string());
        if state.failing_deletes.contains(object_id) {
            return Err(injected("delete"));
        }
        state.objects.retain(|o| o.id != object_id);
        Ok(())
    }

    async fn find(&self, query: &SearchQuery) -> Result<Vec<RemoteObject>> {
        let mut state = self.state.lock().unwrap();
        state.find_calls += 1;
        state.queries.push(query.clone());
        if state.fail_find {
            return Err(injected("find"));
        }

        Ok(state
            .objects
            .iter()
            .filter(|o| o.mime_type == query.mime_type)
            .filter(|o| query.parent_id.is_none() || o.parent_id == query.parent_id)
            .map(|o| RemoteObject {
                id: o.id.clone(),
                name: o.name.clone(),
            })
            .filter(|o| query.matches_name(o))
            .collect())
    }
}

/// Captures formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route events on this thread into the capture until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let capture = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || capture.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
