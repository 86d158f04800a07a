//! Sequential agent pipeline.
//!
//! A [`Pipeline`] is a fixed, ordered list of [`PipelineStep`]s executed
//! strictly in sequence: the state of an invocation is nothing more than
//! the index of the current step, each step's raw output is appended to the
//! context handed to later steps, and the final step's output is the
//! pipeline's result. The step list is data, fixed at construction; there
//! is no dynamic reordering.
//!
//! Each step runs a bounded reasoning loop against the [`ChatProvider`]:
//! the agent may request the uploaded report through the shared
//! [`ReportReader`] tool (by replying with the `READ_REPORT` directive),
//! and both an iteration budget and a calls-per-minute budget cap the loop.
//! Busting either budget ends the step with whatever partial text it has.
//!
//! A failure inside any step aborts the whole invocation; there is no
//! partial-result continuation across steps.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::persona::AgentPersona;
use crate::agent::provider::{ChatMessage, ChatProvider};
use crate::report::ReportReader;
use crate::{HemolensError, Result};

/// Tool directive an agent emits to receive the report contents.
const READ_REPORT_DIRECTIVE: &str = "READ_REPORT";

/// Window over which per-step call rates are measured.
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// One analysis request: the (already defaulted and trimmed) query plus the
/// path of the persisted report. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct AnalysisQuery {
    query: String,
    file_path: PathBuf,
}

impl AnalysisQuery {
    /// Query substituted when the client supplies none.
    pub const DEFAULT_QUERY: &'static str = "Summarise my Blood Test Report";

    /// Build a query, substituting the default for empty/absent input and
    /// trimming surrounding whitespace.
    pub fn new(raw_query: Option<&str>, file_path: impl Into<PathBuf>) -> Self {
        let query = match raw_query {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => Self::DEFAULT_QUERY.to_string(),
        };
        Self {
            query,
            file_path: file_path.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// One (persona, task) step of the pipeline.
///
/// `description` may reference `{query}` and `{file_path}`; both are
/// substituted when the step runs.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub persona: AgentPersona,
    pub description: String,
    pub expected_output: String,
}

impl PipelineStep {
    /// Confirm the uploaded file is a readable blood-test report.
    pub fn verification() -> Self {
        Self {
            persona: AgentPersona::verifier(),
            description: "Examine the uploaded file at {file_path} to confirm it is a valid \
                          blood test report. Use the Blood Test Report Reader to read the \
                          file. Verify its structure and the presence of expected medical \
                          parameters, and flag any anomalies."
                .to_string(),
            expected_output: "A verification status indicating whether the file is a valid \
                              blood test report, with the reason if it is not."
                .to_string(),
        }
    }

    /// Dietary recommendations from the blood values.
    pub fn nutrition_analysis() -> Self {
        Self {
            persona: AgentPersona::nutritionist(),
            description: "Based on the blood test report at {file_path}, analyze relevant \
                          blood values (glucose, cholesterol, vitamins, minerals) and \
                          formulate tailored nutritional recommendations. Use the Blood Test \
                          Report Reader to read the file. User query: {query}"
                .to_string(),
            expected_output: "A nutrition plan with dietary adjustments based on the report \
                              findings, foods to emphasize or avoid, and advice on nutrient \
                              intake."
                .to_string(),
        }
    }

    /// Exercise plan constrained by the report.
    pub fn exercise_planning() -> Self {
        Self {
            persona: AgentPersona::exercise_specialist(),
            description: "Using the blood test report at {file_path} as reference, design a \
                          safe and effective exercise plan. Use the Blood Test Report Reader \
                          to read the file. Account for any health limitations the report \
                          indicates. User query: {query}"
                .to_string(),
            expected_output: "A structured exercise plan with recommended exercise types, \
                              intensity, duration, frequency, and safety considerations."
                .to_string(),
        }
    }

    /// Final synthesis by the doctor; its output is the pipeline result.
    pub fn help_patients() -> Self {
        Self {
            persona: AgentPersona::doctor(),
            description: "Analyze the user's query and the provided blood test report at \
                          {file_path}, together with the specialist findings above. Use the \
                          Blood Test Report Reader if you need the raw report. Synthesize a \
                          comprehensive, clear, and actionable health summary. Prioritize \
                          evidence-based advice and identify significant abnormalities that \
                          require attention. User query: {query}"
                .to_string(),
            expected_output: "A well-structured report with a concise summary of key \
                              findings, abnormal values and their implications, personalized \
                              recommendations, and suggestions for further consultation if \
                              necessary."
                .to_string(),
        }
    }
}

/// Per-step execution budget: reasoning iterations plus a sliding-window
/// calls-per-minute cap.
struct StepBudget {
    iterations_left: u32,
    max_rpm: u32,
    window: VecDeque<Instant>,
}

impl StepBudget {
    fn new(persona: &AgentPersona) -> Self {
        Self {
            iterations_left: persona.max_iterations,
            max_rpm: persona.max_rpm,
            window: VecDeque::new(),
        }
    }

    /// Account for one provider call. Returns false when either budget
    /// would be exceeded; the step must then stop with its partial result.
    fn try_acquire(&mut self) -> bool {
        if self.iterations_left == 0 {
            return false;
        }
        let now = Instant::now();
        while self
            .window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= RATE_WINDOW)
        {
            self.window.pop_front();
        }
        if self.window.len() as u32 >= self.max_rpm {
            return false;
        }
        self.iterations_left -= 1;
        self.window.push_back(now);
        true
    }
}

/// Fixed sequential agent pipeline over a shared provider and report tool.
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    provider: Arc<dyn ChatProvider>,
    reader: Arc<ReportReader>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline from an explicit step list.
    pub fn new(
        steps: Vec<PipelineStep>,
        provider: Arc<dyn ChatProvider>,
        reader: Arc<ReportReader>,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(HemolensError::validation("pipeline requires at least one step"));
        }
        Ok(Self {
            steps,
            provider,
            reader,
        })
    }

    /// The deployed medical pipeline: verification, nutrition, exercise,
    /// then the doctor's synthesis as the final step.
    pub fn medical(provider: Arc<dyn ChatProvider>, reader: Arc<ReportReader>) -> Self {
        Self {
            steps: vec![
                PipelineStep::verification(),
                PipelineStep::nutrition_analysis(),
                PipelineStep::exercise_planning(),
                PipelineStep::help_patients(),
            ],
            provider,
            reader,
        }
    }

    /// Run one pipeline invocation to completion.
    ///
    /// Steps execute strictly in sequence; any step error aborts the
    /// invocation. Returns the final step's output.
    pub async fn run(&self, request: &AnalysisQuery) -> Result<String> {
        let mut context = String::new();
        let mut last_output = String::new();

        for (index, step) in self.steps.iter().enumerate() {
            tracing::info!(
                step = index,
                role = %step.persona.role,
                "running pipeline step"
            );
            let output = self.run_step(step, request, &context).await?;

            let _ = write!(context, "\n\n[{}]\n{}", step.persona.role, output);
            last_output = output;
        }

        Ok(last_output)
    }

    /// Run one step's bounded reasoning loop.
    async fn run_step(
        &self,
        step: &PipelineStep,
        request: &AnalysisQuery,
        context: &str,
    ) -> Result<String> {
        let system = step.persona.system_prompt();
        let mut task = render_template(&step.description, request);
        let _ = write!(task, "\n\nExpected output: {}", step.expected_output);
        if !context.trim().is_empty() {
            let _ = write!(task, "\n\nFindings from earlier specialists:{context}");
        }

        let mut messages = vec![ChatMessage::user(task)];
        let mut budget = StepBudget::new(&step.persona);
        let mut partial = String::new();

        loop {
            if !budget.try_acquire() {
                tracing::warn!(
                    role = %step.persona.role,
                    "step budget exhausted, returning partial result"
                );
                return Ok(partial);
            }

            let reply = self.provider.complete(&system, &messages).await?;

            match split_tool_directive(&reply) {
                Some(remainder) => {
                    if !remainder.is_empty() {
                        partial = remainder;
                    }
                    let report = self.reader.read_to_text(Some(request.file_path()));
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!(
                        "Blood Test Report Reader output:\n{report}"
                    )));
                }
                None => return Ok(reply),
            }
        }
    }
}

/// Substitute `{query}` and `{file_path}` placeholders in a step template.
fn render_template(template: &str, request: &AnalysisQuery) -> String {
    template
        .replace("{query}", request.query())
        .replace("{file_path}", &request.file_path().to_string_lossy())
}

/// Detect the tool directive in a reply.
///
/// Returns `Some(rest)` when any line equals `READ_REPORT`, where `rest` is
/// the reply with the directive line removed (the step's partial text so
/// far). Returns `None` for a final answer.
fn split_tool_directive(reply: &str) -> Option<String> {
    if !reply.lines().any(|l| l.trim() == READ_REPORT_DIRECTIVE) {
        return None;
    }
    let rest: Vec<&str> = reply
        .lines()
        .filter(|l| l.trim() != READ_REPORT_DIRECTIVE)
        .collect();
    Some(rest.join("\n").trim().to_string())
}
