//! Persistence boundary for saved pages.

use async_trait::async_trait;

use crate::{domain::Page, Result};

pub mod memory;

/// Store of `(user_name, url)` facts.
///
/// Uniqueness of a pair is the caller's job (check [`exists`] before
/// [`save`]); implementations do not enforce it.
///
/// [`exists`]: PageRepository::exists
/// [`save`]: PageRepository::save
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn save(&self, page: &Page) -> Result<()>;

    async fn exists(&self, page: &Page) -> Result<bool>;

    /// A uniformly random page saved by `user_name`.
    ///
    /// Fails with [`Error::NoSavedPages`](crate::Error::NoSavedPages) when the
    /// user has none.
    async fn pick_random(&self, user_name: &str) -> Result<Page>;

    /// Remove every stored copy of `page`. Removing a missing page is not an error.
    async fn remove(&self, page: &Page) -> Result<()>;
}
