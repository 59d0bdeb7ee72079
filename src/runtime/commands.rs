use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::scene::{ContainerProps, Props, TextProps};

/// Name the component layer gives a node. Stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The canvas root, created by the host before any command runs.
    pub const ROOT: NodeKey = NodeKey(0);
}

impl From<u64> for NodeKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// One scene-graph mutation, as produced by the component layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationCommand {
    CreateContainer {
        key: NodeKey,
        #[serde(default)]
        props: ContainerProps,
    },
    CreateText {
        key: NodeKey,
        #[serde(default)]
        content: String,
        #[serde(default)]
        props: TextProps,
    },
    AppendChild {
        parent: NodeKey,
        child: NodeKey,
    },
    InsertBefore {
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    },
    RemoveChild {
        parent: NodeKey,
        child: NodeKey,
    },
    SetProps {
        key: NodeKey,
        props: Props,
    },
    SetText {
        key: NodeKey,
        content: String,
    },
    ResetChildren {
        key: NodeKey,
    },
    SetHidden {
        key: NodeKey,
        hidden: bool,
    },
}

impl MutationCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateContainer { .. } => "create_container",
            Self::CreateText { .. } => "create_text",
            Self::AppendChild { .. } => "append_child",
            Self::InsertBefore { .. } => "insert_before",
            Self::RemoveChild { .. } => "remove_child",
            Self::SetProps { .. } => "set_props",
            Self::SetText { .. } => "set_text",
            Self::ResetChildren { .. } => "reset_children",
            Self::SetHidden { .. } => "set_hidden",
        }
    }
}

/// Ordered commands applied together in one commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBatch {
    commands: Vec<MutationCommand>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: MutationCommand) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Append every command of `later` after the ones already queued.
    pub fn merge(&mut self, later: CommandBatch) {
        self.commands.extend(later.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MutationCommand> {
        self.commands.iter()
    }
}

impl From<Vec<MutationCommand>> for CommandBatch {
    fn from(commands: Vec<MutationCommand>) -> Self {
        Self { commands }
    }
}

impl FromIterator<MutationCommand> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = MutationCommand>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CommandBatch {
    type Item = MutationCommand;
    type IntoIter = std::vec::IntoIter<MutationCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

/// Decode a JSON-lines command stream: one command object per line, blank
/// lines skipped.
pub fn decode_batch(reader: impl BufRead) -> Result<CommandBatch> {
    let mut batch = CommandBatch::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = serde_json::from_str(line)
            .map_err(|err| EngineError::Decode(format!("line {}: {err}", idx + 1)))?;
        batch.push(command);
    }
    Ok(batch)
}
