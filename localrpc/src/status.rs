//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Deployment block status.
//!
//! Records, per deployment block, whether it started and, if not, why. The
//! directory is consulted only to explain a failed lookup; it never takes
//! part in routing.

use crate::error::{CapturedFailure, InvocationError};
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a deployment block's startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block started and registered its services.
    Started,
    /// The block failed to start.
    Failed(CapturedFailure),
}

/// Status of one deployment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStatus {
    name: String,
    context_name: String,
    outcome: BlockOutcome,
}

impl BlockStatus {
    /// Returns the block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context name the block is deployed under.
    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    /// Returns the startup outcome.
    pub fn outcome(&self) -> &BlockOutcome {
        &self.outcome
    }

    /// Returns `true` if the block started.
    pub fn is_started(&self) -> bool {
        self.outcome == BlockOutcome::Started
    }

    /// Returns the startup failure, if the block failed to start.
    pub fn failure(&self) -> Option<&CapturedFailure> {
        match &self.outcome {
            BlockOutcome::Started => None,
            BlockOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Registry of block statuses keyed by block name.
#[derive(Debug, Default)]
pub struct BlockStatusDirectory {
    blocks: ArcSwap<BTreeMap<String, BlockStatus>>,
}

impl BlockStatusDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that block `name` started.
    ///
    /// Returns `false` without changing anything if the block is already
    /// recorded as started.
    pub fn try_record_started(&self, name: &str, context_name: &str) -> bool {
        let mut claimed = false;
        self.blocks.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            claimed = !current.get(name).is_some_and(BlockStatus::is_started);
            if claimed {
                next.insert(name.to_string(), status(name, context_name, BlockOutcome::Started));
            }
            next
        });
        if claimed {
            debug!(block = name, context = context_name, "Deployment block started");
        }
        claimed
    }

    /// Records that block `name` failed to start.
    ///
    /// Returns `false` without changing anything if the block is already
    /// recorded as started.
    pub fn record_failed(&self, name: &str, context_name: &str, failure: CapturedFailure) -> bool {
        let mut recorded = false;
        self.blocks.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            recorded = !current.get(name).is_some_and(BlockStatus::is_started);
            if recorded {
                next.insert(
                    name.to_string(),
                    status(name, context_name, BlockOutcome::Failed(failure.clone())),
                );
            }
            next
        });
        if recorded {
            warn!(
                block = name,
                context = context_name,
                error = %failure,
                "Deployment block failed to start"
            );
        }
        recorded
    }

    /// Removes the status of block `name`.
    pub fn remove(&self, name: &str) -> Option<BlockStatus> {
        let previous = self.blocks.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.remove(name);
            next
        });
        previous.get(name).cloned()
    }

    /// Returns the status of block `name`.
    pub fn get(&self, name: &str) -> Option<BlockStatus> {
        self.blocks.load().get(name).cloned()
    }

    /// Returns the names of all recorded blocks, sorted.
    pub fn block_names(&self) -> Vec<String> {
        self.blocks.load().keys().cloned().collect()
    }

    /// Returns a snapshot of all statuses.
    pub fn snapshot(&self) -> Arc<BTreeMap<String, BlockStatus>> {
        self.blocks.load_full()
    }

    /// Returns `true` if no block is recorded.
    pub fn is_empty(&self) -> bool {
        self.blocks.load().is_empty()
    }

    /// Explains why `entry_name` is missing from the service directory.
    ///
    /// Three cases are distinguished: the target block started but did not
    /// register the service, the target block failed to start (the captured
    /// failure becomes the error's source), and the target block is unknown,
    /// in which case the message lists the blocks that are known.
    ///
    /// `block_name` is the last segment of the connection URL and is matched
    /// against the context names of the recorded blocks.
    pub fn access_error(&self, block_name: &str, entry_name: &str) -> InvocationError {
        let blocks = self.blocks.load();
        let target = blocks
            .values()
            .find(|status| status.context_name() == block_name);
        match target.map(BlockStatus::outcome) {
            Some(BlockOutcome::Started) => InvocationError::LocalServiceAccess {
                message: format!(
                    "Unable to invoke '{entry_name}': service is not registered in the local \
                     service directory of deployment block '{block_name}'. Check that the \
                     service implementation is registered when the block starts."
                ),
                cause: None,
            },
            Some(BlockOutcome::Failed(failure)) => InvocationError::LocalServiceAccess {
                message: format!(
                    "Unable to invoke '{entry_name}': deployment block '{block_name}' failed to \
                     start: {failure}. See the error cause for details."
                ),
                cause: Some(failure.clone()),
            },
            None if blocks.is_empty() => InvocationError::LocalServiceAccess {
                message: format!(
                    "Unable to invoke '{entry_name}': deployment block '{block_name}' is not \
                     registered. No deployment blocks are registered in this process. Possible \
                     causes:\nlocal service invocation enabled for a deployment that does not \
                     support it,\nor the target block is not deployed."
                ),
                cause: None,
            },
            None => {
                let known = blocks
                    .values()
                    .map(|status| format!("'{}'", status.context_name()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let example = blocks
                    .values()
                    .next()
                    .map(BlockStatus::context_name)
                    .unwrap_or_default();
                InvocationError::LocalServiceAccess {
                    message: format!(
                        "Unable to invoke '{entry_name}': deployment block '{block_name}' is not \
                         registered. Registered deployment blocks are: {known}. Possible \
                         causes:\n'{}' property value not ending with the actual context name \
                         of the target block, e.g. '{} = http://localhost:8080/{example}',\nor \
                         incorrect context name configured for the target block.",
                        crate::config::CONNECTION_URL_LIST,
                        crate::config::CONNECTION_URL_LIST,
                    ),
                    cause: None,
                }
            }
        }
    }
}

fn status(name: &str, context_name: &str, outcome: BlockOutcome) -> BlockStatus {
    BlockStatus {
        name: name.to_string(),
        context_name: context_name.to_string(),
        outcome,
    }
}
