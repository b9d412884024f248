//! Evaluation run / result types, driving the evaluator harness (component I).

use super::kb::KbId;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an evaluation run. Transitions are a prefix of
/// `(Pending, Running, Completed | Failed)`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Whether `next` is a legal transition from `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// A single judge's verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeScore {
    /// 0-5.
    pub score: u8,
    pub reason: String,
}

/// The four judges dispatched per question. `tool` is reported but excluded
/// from the averaged score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeScores {
    pub retrieval: JudgeScore,
    pub faithfulness: JudgeScore,
    pub quality: JudgeScore,
    pub tool: JudgeScore,
}

impl JudgeScores {
    /// Unit-weighted average of retrieval, faithfulness, and quality. Tool
    /// is reported separately and never folded into this average.
    #[must_use]
    pub fn average(&self) -> f64 {
        f64::from(self.retrieval.score + self.faithfulness.score + self.quality.score) / 3.0
    }
}

/// One question's evaluation result within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    pub question: String,
    pub answer: String,
    pub retrieved_evidence: String,
    pub tools_called: Vec<String>,
    pub scores: JudgeScores,
}

/// An evaluation run binds to a KB and a question set, tracking aggregate
/// averages per judge dimension as results accumulate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRun {
    pub id: String,
    pub kb_id: KbId,
    pub status: RunStatus,
    pub total_questions: usize,
    pub completed_count: usize,
    pub results: Vec<EvalResult>,
}

impl EvalRun {
    #[must_use]
    pub fn new(kb_id: KbId, total_questions: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kb_id,
            status: RunStatus::Pending,
            total_questions,
            completed_count: 0,
            results: Vec::new(),
        }
    }

    /// Transition to `next`, returning an error-shaped `false` if the
    /// transition would move status backwards.
    pub fn transition(&mut self, next: RunStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Record one question's result. `completed_count` is monotonically
    /// non-decreasing and never exceeds `total_questions`.
    pub fn record_result(&mut self, result: EvalResult) {
        if self.completed_count < self.total_questions {
            self.completed_count += 1;
        }
        self.results.push(result);
    }

    /// Average score per dimension across all recorded results so far.
    #[must_use]
    pub fn averages(&self) -> EvalAverages {
        if self.results.is_empty() {
            return EvalAverages::default();
        }
        let n = self.results.len() as f64;
        let mut retrieval = 0.0;
        let mut faithfulness = 0.0;
        let mut quality = 0.0;
        let mut tool = 0.0;
        for r in &self.results {
            retrieval += f64::from(r.scores.retrieval.score);
            faithfulness += f64::from(r.scores.faithfulness.score);
            quality += f64::from(r.scores.quality.score);
            tool += f64::from(r.scores.tool.score);
        }
        EvalAverages {
            retrieval: retrieval / n,
            faithfulness: faithfulness / n,
            quality: quality / n,
            tool: tool / n,
            overall: (retrieval + faithfulness + quality) / (3.0 * n),
        }
    }
}

/// Aggregate averages per judge dimension, plus the unit-weighted three-judge
/// overall average (tool excluded).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EvalAverages {
    pub retrieval: f64,
    pub faithfulness: f64,
    pub quality: f64,
    pub tool: f64,
    pub overall: f64,
}
