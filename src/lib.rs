pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod listing;
pub mod models;
pub mod storage;
pub mod usecases;
pub mod validation;

use anyhow::Result;
use config::Config;
use std::sync::Arc;

use crate::auth::{SessionManager, TokenStore};
use crate::client::{GraphqlExecutor, HttpExecutor};
use crate::storage::{FileStore, KeyValueStore};
use crate::usecases::{ArticleService, Backend, UserAdminService};

/// Everything a command needs, built once per process
pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub articles: ArticleService,
    pub users: UserAdminService,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage.path()));
        let tokens = TokenStore::new(store);
        let executor: Arc<dyn GraphqlExecutor> =
            Arc::new(HttpExecutor::new(&config.api, tokens.clone())?);
        Ok(Self::with_parts(config, executor, tokens))
    }

    /// Assemble the context around an existing executor and token store
    pub fn with_parts(
        config: Config,
        executor: Arc<dyn GraphqlExecutor>,
        tokens: TokenStore,
    ) -> Self {
        let session = Arc::new(SessionManager::new(executor.clone(), tokens));
        let backend = Backend::new(executor, session.clone());
        Self {
            config,
            session,
            articles: ArticleService::new(backend.clone()),
            users: UserAdminService::new(backend),
        }
    }

    /// Drop listeners and close the state channel
    pub fn shutdown(&self) {
        self.session.shutdown();
    }
}
