use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{domain::Page, storage::PageRepository, Error, Result};

/// In-process repository. Used by `--memory-store` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    pages: Mutex<Vec<Page>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.pages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.lock().await.is_empty()
    }

    pub async fn pages(&self) -> Vec<Page> {
        self.pages.lock().await.clone()
    }
}

#[async_trait]
impl PageRepository for MemoryRepository {
    async fn save(&self, page: &Page) -> Result<()> {
        self.pages.lock().await.push(page.clone());
        Ok(())
    }

    async fn exists(&self, page: &Page) -> Result<bool> {
        Ok(self.pages.lock().await.iter().any(|p| p == page))
    }

    async fn pick_random(&self, user_name: &str) -> Result<Page> {
        let pages = self.pages.lock().await;
        let owned: Vec<&Page> = pages.iter().filter(|p| p.user_name == user_name).collect();
        if owned.is_empty() {
            return Err(Error::NoSavedPages);
        }
        Ok(owned[fastrand::usize(..owned.len())].clone())
    }

    async fn remove(&self, page: &Page) -> Result<()> {
        self.pages.lock().await.retain(|p| p != page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[tokio::test]
    async fn pick_random_on_empty_store_is_no_saved_pages() {
        let repo = MemoryRepository::new();
        repo.save(&Page::new("bob", "https://bob.example"))
            .await
            .unwrap();

        let err = repo.pick_random("alice").await.unwrap_err();
        assert!(matches!(err, Error::NoSavedPages));
    }

    #[tokio::test]
    async fn pick_random_is_roughly_uniform_over_the_users_pages() {
        let repo = MemoryRepository::new();
        let urls = ["https://a.example", "https://b.example", "https://c.example"];
        for url in urls {
            repo.save(&Page::new("alice", url)).await.unwrap();
        }
        repo.save(&Page::new("bob", "https://bob.example"))
            .await
            .unwrap();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..3000 {
            let page = repo.pick_random("alice").await.unwrap();
            assert_eq!(page.user_name, "alice");
            *counts.entry(page.url).or_default() += 1;
        }

        assert_eq!(counts.len(), urls.len());
        for url in urls {
            let n = counts[url];
            assert!((700..=1300).contains(&n), "{url} picked {n} times");
        }
    }

    #[tokio::test]
    async fn remove_only_touches_the_exact_pair() {
        let repo = MemoryRepository::new();
        let keep = Page::new("bob", "https://x.example");
        let gone = Page::new("alice", "https://x.example");
        repo.save(&keep).await.unwrap();
        repo.save(&gone).await.unwrap();

        repo.remove(&gone).await.unwrap();
        repo.remove(&gone).await.unwrap();

        assert!(!repo.exists(&gone).await.unwrap());
        assert!(repo.exists(&keep).await.unwrap());
        assert_eq!(repo.len().await, 1);
    }
}
