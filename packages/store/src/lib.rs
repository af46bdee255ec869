pub mod config;
pub mod error;
pub mod models;
pub mod session;

mod memory;
pub use memory::MemoryStorage;

mod file_store;
pub use file_store::FileStorage;

pub use config::ClientConfig;
pub use error::StoreError;
pub use models::{
    AccessToken, Category, FileUpload, Identity, NewCategory, NewPost, Post, PostPatch,
    RegisteredUser, Registration, UploadResponse, UploadedFile,
};
pub use session::{PersistedSession, SessionStorage, Token};
