//! Agent personas.
//!
//! A persona is read-only configuration bound to one agent role: who the
//! agent is, what it optimizes for, and how much provider budget one step
//! may spend. The four built-ins mirror the deployed medical crew.

/// Fixed role/goal/backstory/budget configuration for one agent role.
///
/// Instances are constructed at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AgentPersona {
    /// Role name, e.g. `"Clinical Nutritionist"`.
    pub role: String,
    /// Goal statement injected into the system prompt.
    pub goal: String,
    /// Backstory statement injected into the system prompt.
    pub backstory: String,
    /// Maximum reasoning iterations (provider calls) per step.
    pub max_iterations: u32,
    /// Maximum provider calls per minute per step.
    pub max_rpm: u32,
    /// Whether the agent may hand work to another agent.
    pub allow_delegation: bool,
}

impl AgentPersona {
    pub fn doctor() -> Self {
        Self {
            role: "Senior Experienced Doctor".to_string(),
            goal: "Provide accurate and comprehensive medical advice based on blood test \
                   reports and relevant medical knowledge."
                .to_string(),
            backstory: "You are a highly experienced medical doctor with a strong focus on \
                        evidence-based medicine. You meticulously analyze blood reports and \
                        provide holistic health recommendations with clear communication."
                .to_string(),
            max_iterations: 2,
            max_rpm: 10,
            allow_delegation: false,
        }
    }

    pub fn verifier() -> Self {
        Self {
            role: "Blood Report Verifier".to_string(),
            goal: "Rigorously verify the accuracy and completeness of medical data, \
                   especially blood test reports, ensuring all information is correctly \
                   interpreted and accounted for."
                .to_string(),
            backstory: "You are a detail-oriented medical data verifier. Your expertise lies \
                        in cross-referencing information, identifying discrepancies, and \
                        ensuring the integrity of medical records."
                .to_string(),
            max_iterations: 2,
            max_rpm: 10,
            allow_delegation: false,
        }
    }

    pub fn nutritionist() -> Self {
        Self {
            role: "Clinical Nutritionist".to_string(),
            goal: "Develop personalized nutrition plans and dietary recommendations based on \
                   individual blood values and scientific nutritional guidelines."
                .to_string(),
            backstory: "You are a certified clinical nutritionist with extensive experience \
                        in evidence-based dietary strategies. You analyze blood reports to \
                        tailor practical, sustainable nutritional advice."
                .to_string(),
            max_iterations: 1,
            max_rpm: 1,
            allow_delegation: false,
        }
    }

    pub fn exercise_specialist() -> Self {
        Self {
            role: "Exercise Physiologist".to_string(),
            goal: "Design safe, effective, and personalized exercise programs that align \
                   with an individual's health status and blood test insights."
                .to_string(),
            backstory: "You are a qualified exercise physiologist with a deep understanding \
                        of human physiology, crafting regimens that are challenging, safe, \
                        and aligned with long-term health."
                .to_string(),
            max_iterations: 1,
            max_rpm: 1,
            allow_delegation: false,
        }
    }

    /// Render the system prompt for one step under this persona, including
    /// the tool invocation protocol.
    pub fn system_prompt(&self) -> String {
        let delegation = if self.allow_delegation {
            ""
        } else {
            " Work alone; do not delegate."
        };
        format!(
            "You are {role}.\nGoal: {goal}\nBackstory: {backstory}\n\n\
             You have one tool available, the Blood Test Report Reader. To read the \
             uploaded report, reply with exactly one line containing the word \
             READ_REPORT and nothing else; the file contents will be returned to you. \
             Otherwise, reply with your final answer.{delegation}",
            role = self.role,
            goal = self.goal,
            backstory = self.backstory,
        )
    }
}
