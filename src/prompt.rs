//! C10: Prompt Composer — concatenates the fixed preamble, best-effort
//! reference documents, instance-scoped context, and the task payload into
//! one prompt text (§4.10).

use crate::models::Task;
use crate::paths::InstancePaths;
use crate::Result;

const PREAMBLE: &str = "You are running inside an autonomous task-loop runner. \
A fresh process has been spawned for exactly one task. Complete exactly one task.";

const OUTPUT_REQUIREMENTS: &str = "# Output Requirements\n\
- Implement the task fully.\n\
- Run the verify command(s) and ensure they pass.\n\
- Commit your changes.\n\
- If you cannot complete the task, explain the blocker clearly.";

fn read_best_effort(path: &std::path::Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn section(heading: &str, body: &str) -> String {
    format!("# {heading}\n\n{body}")
}

/// Builds the complete prompt text for `task` within `paths`.
pub fn compose(paths: &InstancePaths, task: &Task) -> Result<String> {
    let task_json = serde_json::to_string_pretty(task)?;

    let sections = vec![
        PREAMBLE.to_string(),
        section("SKILL.md", &read_best_effort(&paths.skill_md())),
        section("Global Prompt", &read_best_effort(&paths.global_prompt())),
        section("Instance Prompt", &read_best_effort(&paths.prompt_md())),
        section("Task Specification", &read_best_effort(&paths.spec_md())),
        section("Global Learnings", &read_best_effort(&paths.global_state_learnings())),
        section("Instance Learnings", &read_best_effort(&paths.learnings_md())),
        section("Current Task", &task_json),
        OUTPUT_REQUIREMENTS.to_string(),
    ];

    Ok(sections.join("\n\n"))
}
