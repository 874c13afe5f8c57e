// SPDX-License-Identifier: MIT

//! Answer evaluation with a model as judge
//!
//! Each case's question goes through an [`Answerer`]; a judge model compares
//! the answer to the ground truth and returns a 1 to 5 score with reasoning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::adk::error::Result;
use crate::adk::model::{generate_structured, Content, GenerationConfig, Model};
use crate::tutor::intent::Intent;
use crate::tutor::models::EvaluationScore;
use crate::tutor::orchestrator::{Orchestrator, Request};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// One dataset entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    pub ground_truth: String,
}

/// Load cases from a `.json` file, or YAML for any other extension
pub async fn load_dataset(path: &Path) -> Result<Vec<EvalCase>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cases = if is_json {
        serde_json::from_str(&raw)?
    } else {
        serde_yaml::from_str(&raw)?
    };
    Ok(cases)
}

/// The system under test
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

#[async_trait]
impl<I: Intent> Answerer for Orchestrator<I> {
    async fn answer(&self, question: &str) -> Result<String> {
        Ok(self.run(Request::new(question), None).await?.answer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalResult {
    pub question: String,
    pub answer: String,
    pub score: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalReport {
    pub results: Vec<EvalResult>,
}

impl EvalReport {
    /// Mean score, `None` for an empty report
    pub fn average_score(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let total: u32 = self.results.iter().map(|r| u32::from(r.score)).sum();
        Some(f64::from(total) / self.results.len() as f64)
    }
}

pub struct Evaluator {
    judge: Arc<dyn Model>,
}

impl Evaluator {
    pub fn new(judge: Arc<dyn Model>) -> Self {
        Self { judge }
    }

    /// Score `answer` against `ground_truth`
    pub async fn judge(
        &self,
        question: &str,
        answer: &str,
        ground_truth: &str,
    ) -> Result<EvaluationScore> {
        let prompt = format!(
            "Question: {}\n\nGround Truth: {}\n\nGenerated Answer: {}\n\n\
             Rate the Generated Answer on a scale of 1 to 5 based on accuracy and clarity.\n\
             1 = Completely wrong\n5 = Perfect match in meaning\n\n\
             Provide your reasoning.",
            question, ground_truth, answer
        );
        let history = [
            Content::system(
                "You are an expert evaluator. Compare the generated answer to the ground truth.",
            ),
            Content::user(prompt),
        ];
        let mut verdict: EvaluationScore = generate_structured(
            self.judge.as_ref(),
            &history,
            Some(&GenerationConfig::deterministic()),
        )
        .await?;

        if !(MIN_SCORE..=MAX_SCORE).contains(&verdict.score) {
            log::warn!("Judge score {} out of range, clamping", verdict.score);
            verdict.score = verdict.score.clamp(MIN_SCORE, MAX_SCORE);
        }
        Ok(verdict)
    }

    /// Answer and judge every case in order
    pub async fn evaluate(&self, cases: &[EvalCase], answerer: &dyn Answerer) -> Result<EvalReport> {
        let mut report = EvalReport::default();
        for (i, case) in cases.iter().enumerate() {
            log::info!("Test case {}: {}", i + 1, case.question);
            let answer = answerer.answer(&case.question).await?;
            let verdict = self.judge(&case.question, &answer, &case.ground_truth).await?;
            log::info!("Judge score: {}/{}", verdict.score, MAX_SCORE);
            report.results.push(EvalResult {
                question: case.question.clone(),
                answer,
                score: verdict.score,
                reasoning: verdict.reasoning,
            });
        }
        Ok(report)
    }
}
