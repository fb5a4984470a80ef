/// Build lifecycle states and transitions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use vireo_core::error::{VireoError, VireoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Created,
    Reconstructing,
    Extracting,
    Writing,
    Indexing,
    Exporting,
    /// Copying staged artifacts into the final index directory
    Uploading,
    Reconciling,
    Ready,
    /// Terminal failure state, reachable from every non-terminal state
    RolledBack,
}

impl BuildState {
    /// The state a successful stage leads to
    pub fn next(&self) -> Option<BuildState> {
        match self {
            BuildState::Created => Some(BuildState::Reconstructing),
            BuildState::Reconstructing => Some(BuildState::Extracting),
            BuildState::Extracting => Some(BuildState::Writing),
            BuildState::Writing => Some(BuildState::Indexing),
            BuildState::Indexing => Some(BuildState::Exporting),
            BuildState::Exporting => Some(BuildState::Uploading),
            BuildState::Uploading => Some(BuildState::Reconciling),
            BuildState::Reconciling => Some(BuildState::Ready),
            BuildState::Ready | BuildState::RolledBack => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Ready | BuildState::RolledBack)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuildState::Created => "created",
            BuildState::Reconstructing => "reconstructing",
            BuildState::Extracting => "extracting",
            BuildState::Writing => "writing",
            BuildState::Indexing => "indexing",
            BuildState::Exporting => "exporting",
            BuildState::Uploading => "uploading",
            BuildState::Reconciling => "reconciling",
            BuildState::Ready => "ready",
            BuildState::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: BuildState,
    pub to: BuildState,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BuildStateMachine {
    state: BuildState,
    transitions: Vec<Transition>,
}

impl Default for BuildStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStateMachine {
    pub fn new() -> Self {
        Self {
            state: BuildState::Created,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Move to the successor of the current state
    pub fn advance(&mut self) -> VireoResult<BuildState> {
        let next = self.state.next().ok_or_else(|| {
            VireoError::InvalidInput(format!("cannot advance from terminal state {}", self.state))
        })?;
        self.transition_to(next);
        Ok(next)
    }

    /// Jump to `RolledBack`. Returns false if the build had already finished.
    pub fn fail(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.transition_to(BuildState::RolledBack);
        true
    }

    /// Every state visited, starting with `Created`
    pub fn history(&self) -> Vec<BuildState> {
        std::iter::once(BuildState::Created)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    fn transition_to(&mut self, to: BuildState) {
        tracing::debug!(from = %self.state, to = %to, "build state transition");
        self.transitions.push(Transition {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
    }
}
