//! Durable home of the bearer token: the only piece of session state that survives a restart.

use std::{
    cell::RefCell,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// Key the token is stored under in browser `localStorage`.
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("token file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser storage unavailable: {0}")]
    Unavailable(String),
}

pub trait TokenStorage {
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn store(&self, token: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    token: RefCell<Option<String>>,
}

impl MemoryStorage {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RefCell::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token.borrow().clone())
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        *self.token.borrow_mut() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.token.borrow_mut().take();
        Ok(())
    }
}

/// Keeps the token in a single file. A missing or blank file means "logged out".
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, token).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod local {
    use super::{StorageError, TOKEN_KEY, TokenStorage};

    /// The browser's `localStorage`, under [`TOKEN_KEY`].
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorage;

    impl LocalStorage {
        fn storage(&self) -> Result<web_sys::Storage, StorageError> {
            let window = web_sys::window()
                .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
            window
                .local_storage()
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
                .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
        }
    }

    impl TokenStorage for LocalStorage {
        fn load(&self) -> Result<Option<String>, StorageError> {
            self.storage()?
                .get_item(TOKEN_KEY)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }

        fn store(&self, token: &str) -> Result<(), StorageError> {
            self.storage()?
                .set_item(TOKEN_KEY, token)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.storage()?
                .remove_item(TOKEN_KEY)
                .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
        }
    }
}
