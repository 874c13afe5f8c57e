// SPDX-License-Identifier: MIT

//! Shared resources, built once at startup and passed explicitly

use std::sync::Arc;

use crate::adk::error::{Result, TutorError};
use crate::adk::loader::{chunk_documents, DocumentLoader, DEFAULT_CHUNK_SIZE};
use crate::adk::model::Model;
use crate::adk::retriever::{KeywordRetriever, Retriever};
use crate::tutor::checkpoint::{CheckpointStore, JsonCheckpointStore, SessionLocks};
use crate::tutor::config::Settings;
use crate::tutor::evaluation::Evaluator;
use crate::tutor::facts::FactStore;
use crate::tutor::intent::{MemoryIntent, TutorIntent};
use crate::tutor::memory::{memory_graph, MemoryAgent};
use crate::tutor::orchestrator::Orchestrator;
use crate::tutor::skills::{LlmTutor, ScriptedTutor, StudyGenerator, Tutor};
use crate::tutor::tutoring::{tutoring_graph, TutoringAgent};

pub struct AppContext {
    pub settings: Settings,
    pub model: Option<Arc<dyn Model>>,
    pub tutor: Arc<dyn Tutor>,
    pub facts: Arc<FactStore>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub locks: Arc<SessionLocks>,
    pub retriever: Option<Arc<dyn Retriever>>,
}

impl AppContext {
    /// Open the stores, pick the tutor and index any configured documents
    pub async fn build(settings: Settings) -> Result<Self> {
        let model = settings.build_model()?;
        let tutor: Arc<dyn Tutor> = match &model {
            Some(model) => Arc::new(LlmTutor::new(Arc::clone(model))),
            None => Arc::new(ScriptedTutor),
        };
        let facts = Arc::new(FactStore::open(&settings.facts_path).await?);
        let checkpoints: Arc<dyn CheckpointStore> =
            Arc::new(JsonCheckpointStore::new(&settings.checkpoint_dir));
        let retriever = index_documents(&settings.documents, settings.top_k).await?;

        Ok(Self {
            settings,
            model,
            tutor,
            facts,
            checkpoints,
            locks: Arc::new(SessionLocks::new()),
            retriever,
        })
    }

    /// Orchestrator for explain, quiz, flashcards and study plan requests
    pub fn tutoring(&self) -> Result<Orchestrator<TutorIntent>> {
        let mut agent = TutoringAgent::new(Arc::clone(&self.tutor));
        if let Some(retriever) = &self.retriever {
            agent = agent.with_retriever(Arc::clone(retriever));
        }
        Ok(Orchestrator::new(tutoring_graph()?, Arc::new(agent)))
    }

    /// Orchestrator for chat and save-memory requests, checkpointed per session
    pub fn memory(&self) -> Result<Orchestrator<MemoryIntent>> {
        let agent = MemoryAgent::new(Arc::clone(&self.tutor), Arc::clone(&self.facts));
        Ok(
            Orchestrator::new(memory_graph()?, Arc::new(agent))
                .with_checkpoints(Arc::clone(&self.checkpoints), Arc::clone(&self.locks)),
        )
    }

    /// Direct access to structured generation; needs a model
    pub fn generator(&self) -> Result<StudyGenerator> {
        Ok(StudyGenerator::new(self.require_model()?))
    }

    pub fn evaluator(&self) -> Result<Evaluator> {
        Ok(Evaluator::new(self.require_model()?))
    }

    fn require_model(&self) -> Result<Arc<dyn Model>> {
        self.model.clone().ok_or_else(|| {
            TutorError::config("this command needs a model; set OPENAI_API_KEY")
        })
    }
}

/// Load, chunk and index `sources`, or `None` when there are none
pub async fn index_documents(sources: &[String], k: usize) -> Result<Option<Arc<dyn Retriever>>> {
    if sources.is_empty() {
        return Ok(None);
    }

    let loader = DocumentLoader::new();
    let mut documents = Vec::with_capacity(sources.len());
    for source in sources {
        documents.push(loader.load(source).await?);
    }
    let chunks = chunk_documents(&documents, DEFAULT_CHUNK_SIZE);
    log::info!(
        "Indexed {} chunks from {} documents",
        chunks.len(),
        documents.len()
    );
    Ok(Some(Arc::new(KeywordRetriever::with_k(chunks, k))))
}
