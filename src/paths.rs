use std::path::{Path, PathBuf};

/// Resolves the on-disk layout rooted at `<project>/.obliviate/` (§6).
#[derive(Debug, Clone)]
pub struct InstancePaths {
    root: PathBuf,
    instance: String,
}

impl InstancePaths {
    pub fn new(project_root: impl Into<PathBuf>, instance: impl Into<String>) -> Self {
        Self {
            root: project_root.into().join(".obliviate"),
            instance: instance.into(),
        }
    }

    pub fn global_learnings(&self) -> PathBuf {
        self.root.join("global-learnings.md")
    }

    pub fn skill_md(&self) -> PathBuf {
        self.root.join("SKILL.md")
    }

    pub fn global_prompt(&self) -> PathBuf {
        self.root.join("global-prompt.md")
    }

    pub fn global_state_learnings(&self) -> PathBuf {
        self.root.join("state").join("global").join("learnings.md")
    }

    pub fn instance_dir(&self) -> PathBuf {
        self.root.join("state").join(&self.instance)
    }

    pub fn instance_json(&self) -> PathBuf {
        self.instance_dir().join("instance.json")
    }

    pub fn prompt_md(&self) -> PathBuf {
        self.instance_dir().join("prompt.md")
    }

    pub fn spec_md(&self) -> PathBuf {
        self.instance_dir().join("spec.md")
    }

    pub fn learnings_md(&self) -> PathBuf {
        self.instance_dir().join("learnings.md")
    }

    pub fn tasks_jsonl(&self) -> PathBuf {
        self.instance_dir().join("tasks.jsonl")
    }

    pub fn runs_jsonl(&self) -> PathBuf {
        self.instance_dir().join("runs.jsonl")
    }

    pub fn cycle_log(&self) -> PathBuf {
        self.instance_dir().join("cycle.log")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.instance_dir().join(".tasks.lock")
    }

    pub fn instances_root(root: &Path) -> PathBuf {
        root.join(".obliviate").join("state")
    }
}
