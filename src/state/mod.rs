use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::conversations::ConversationStore;
use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::images::{ImageCatalog, RegistryImageCatalog};
use crate::llm::{CompletionProvider, OpenAiCompatibleProvider};
use crate::rag::{ContextBuilder, ContextBuilderConfig, LocationRegistry, PassageRetriever};
use crate::storage::{LocalObjectStore, ObjectStore};
use crate::turn::{PromptTemplate, TurnOrchestrator, TurnSettings};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Nothing here is mutated after startup; turns share the orchestrator without locking. Durable
/// per-conversation state lives in the object store.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<AppConfig>,
    pub catalog: Arc<dyn ImageCatalog>,
    pub locations: Arc<LocationRegistry>,
    pub conversations: Arc<ConversationStore>,
    pub orchestrator: Arc<TurnOrchestrator>,
    pub started_at: Instant,
    pub started_at_utc: DateTime<Utc>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Load, validate and type the configuration
    /// 2. Open the object store under the data directory
    /// 3. Build the completion provider from config
    /// 4. Wire catalog, retriever and provider into the turn orchestrator
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_app_config()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let store: Arc<dyn ObjectStore> = Arc::new(
            LocalObjectStore::new(paths.data_dir.clone())
                .map_err(|e| InitializationError::Storage(e.into()))?,
        );

        let provider: Arc<dyn CompletionProvider> = Arc::new(
            OpenAiCompatibleProvider::from_config(&settings.completion)
                .map_err(|e| InitializationError::Completion(e.into()))?,
        );

        Ok(Self::from_parts(paths, config, settings, store, provider))
    }

    /// Assembles state from already-built collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
        store: Arc<dyn ObjectStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Arc<Self> {
        let catalog: Arc<dyn ImageCatalog> = Arc::new(RegistryImageCatalog::new(store.clone()));
        let locations = Arc::new(LocationRegistry::new(store.clone()));
        let conversations = Arc::new(ConversationStore::new(store.clone()));
        let retriever = Arc::new(PassageRetriever::new(
            store,
            ContextBuilder::new(ContextBuilderConfig::from(&settings.retrieval)),
        ));

        let orchestrator = Arc::new(TurnOrchestrator::new(
            catalog.clone(),
            retriever,
            provider,
            PromptTemplate::from_config(&settings.prompts),
            TurnSettings::from_config(&settings),
        ));

        tracing::info!(
            relevance_threshold = settings.images.relevance_threshold,
            max_images_per_turn = settings.images.max_images_per_turn,
            provider = orchestrator.provider_name(),
            "Application state initialized"
        );

        Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            catalog,
            locations,
            conversations,
            orchestrator,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        })
    }
}
