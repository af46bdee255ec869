//! Scripted in-memory [`ContentApi`] for controller tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use api::{ApiError, ContentApi, PostQuery};
use store::{
    AccessToken, Category, FileUpload, NewPost, Post, PostPatch, RegisteredUser, Registration,
    UploadedFile,
};
use tokio::sync::oneshot;

pub fn post(id: i64, title: &str, is_published: bool, category_id: Option<i64>) -> Post {
    Post {
        id,
        title: title.to_string(),
        content: format!("Body of {title}"),
        summary: None,
        cover_image: None,
        is_published,
        category_id,
        created_at: "2024-03-05T09:30:00".to_string(),
        updated_at: "2024-03-05T09:30:00".to_string(),
    }
}

pub fn category(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
    }
}

#[derive(Default)]
struct FakeState {
    posts: Vec<Post>,
    categories: Vec<Category>,
    calls: Vec<String>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    gates: HashMap<&'static str, VecDeque<oneshot::Receiver<()>>>,
}

/// Fake content server. Clones share state.
///
/// Results are computed when a call starts. A gated call then waits for its
/// sender to fire (or drop) before returning, which lets tests resolve calls
/// in any order.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Rc<RefCell<FakeState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        let api = Self::new();
        api.state.borrow_mut().posts = posts;
        api
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        self.state.borrow_mut().categories = categories;
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.borrow().posts.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.split('(').next() == Some(op))
            .count()
    }

    /// The next call to `op` fails with `err`.
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.state
            .borrow_mut()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Hold the next call to `op` until the returned sender fires.
    pub fn gate(&self, op: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state
            .borrow_mut()
            .gates
            .entry(op)
            .or_default()
            .push_back(rx);
        tx
    }

    fn enter(&self, op: &'static str, call: String) -> (Option<ApiError>, Option<oneshot::Receiver<()>>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        let failure = state.failures.get_mut(op).and_then(VecDeque::pop_front);
        let gate = state.gates.get_mut(op).and_then(VecDeque::pop_front);
        (failure, gate)
    }

    async fn finish<T>(gate: Option<oneshot::Receiver<()>>, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        result
    }
}

impl ContentApi for FakeApi {
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, ApiError> {
        let label = match query.category_id {
            Some(id) => format!("list_posts({id})"),
            None => "list_posts".to_string(),
        };
        let (failure, gate) = self.enter("list_posts", label);
        let result = match failure {
            Some(e) => Err(e),
            None => Ok(self
                .state
                .borrow()
                .posts
                .iter()
                .filter(|p| query.category_id.is_none() || p.category_id == query.category_id)
                .cloned()
                .collect()),
        };
        Self::finish(gate, result).await
    }

    async fn get_post(&self, id: i64) -> Result<Post, ApiError> {
        let (failure, gate) = self.enter("get_post", format!("get_post({id})"));
        let result = match failure {
            Some(e) => Err(e),
            None => self
                .state
                .borrow()
                .posts
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(ApiError::NotFound),
        };
        Self::finish(gate, result).await
    }

    async fn create_post(&self, new: &NewPost) -> Result<Post, ApiError> {
        let (failure, gate) = self.enter("create_post", format!("create_post({})", new.title));
        let result = match failure {
            Some(e) => Err(e),
            None => {
                let mut state = self.state.borrow_mut();
                let id = state.posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
                let mut created = post(id, &new.title, new.is_published.unwrap_or(false), new.category_id);
                created.content = new.content.clone();
                created.summary = new.summary.clone();
                created.cover_image = new.cover_image.clone();
                state.posts.push(created.clone());
                Ok(created)
            }
        };
        Self::finish(gate, result).await
    }

    async fn update_post(&self, id: i64, patch: &PostPatch) -> Result<Post, ApiError> {
        let (failure, gate) = self.enter("update_post", format!("update_post({id})"));
        let result = match failure {
            Some(e) => Err(e),
            None => {
                let mut state = self.state.borrow_mut();
                match state.posts.iter_mut().find(|p| p.id == id) {
                    Some(existing) => {
                        if let Some(title) = &patch.title {
                            existing.title = title.clone();
                        }
                        if let Some(content) = &patch.content {
                            existing.content = content.clone();
                        }
                        if let Some(published) = patch.is_published {
                            existing.is_published = published;
                        }
                        if patch.summary.is_some() {
                            existing.summary = patch.summary.clone();
                        }
                        if patch.cover_image.is_some() {
                            existing.cover_image = patch.cover_image.clone();
                        }
                        if let Some(category_id) = patch.category_id {
                            existing.category_id = category_id;
                        }
                        existing.updated_at = "2024-04-01T12:00:00".to_string();
                        Ok(existing.clone())
                    }
                    None => Err(ApiError::NotFound),
                }
            }
        };
        Self::finish(gate, result).await
    }

    async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        let (failure, gate) = self.enter("delete_post", format!("delete_post({id})"));
        let result = match failure {
            Some(e) => Err(e),
            None => {
                let mut state = self.state.borrow_mut();
                let before = state.posts.len();
                state.posts.retain(|p| p.id != id);
                if state.posts.len() < before {
                    Ok(())
                } else {
                    Err(ApiError::NotFound)
                }
            }
        };
        Self::finish(gate, result).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let (failure, gate) = self.enter("list_categories", "list_categories".to_string());
        let result = match failure {
            Some(e) => Err(e),
            None => Ok(self.state.borrow().categories.clone()),
        };
        Self::finish(gate, result).await
    }

    async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let (failure, gate) = self.enter("create_category", format!("create_category({name})"));
        let result = match failure {
            Some(e) => Err(e),
            None => {
                let mut state = self.state.borrow_mut();
                let id = state.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1;
                let created = category(id, name);
                state.categories.push(created.clone());
                Ok(created)
            }
        };
        Self::finish(gate, result).await
    }

    async fn login(&self, username: &str, _password: &str) -> Result<AccessToken, ApiError> {
        let (failure, gate) = self.enter("login", format!("login({username})"));
        let result = match failure {
            Some(e) => Err(e),
            None => Ok(AccessToken {
                access_token: format!("token-{username}"),
                token_type: "bearer".to_string(),
            }),
        };
        Self::finish(gate, result).await
    }

    async fn register(&self, registration: &Registration) -> Result<RegisteredUser, ApiError> {
        let (failure, gate) = self.enter("register", format!("register({})", registration.username));
        let result = match failure {
            Some(e) => Err(e),
            None => Ok(RegisteredUser {
                id: Some(1),
                username: registration.username.clone(),
                nickname: registration.nickname.clone(),
                avatar: registration.avatar.clone(),
            }),
        };
        Self::finish(gate, result).await
    }

    async fn upload_file(&self, file: &FileUpload) -> Result<UploadedFile, ApiError> {
        let (failure, gate) = self.enter("upload_file", format!("upload_file({})", file.file_name));
        let result = match failure {
            Some(e) => Err(e),
            None => Ok(UploadedFile {
                url: format!("https://cdn.test/{}", file.file_name),
            }),
        };
        Self::finish(gate, result).await
    }
}
