//! Concurrent discovery and parsing
//!
//! One blocking walker per root feeds discovered files into a channel; every
//! file is read and parsed in its own task. The caller receives results only
//! after every walker and every parse has finished, ordered as a sequential
//! walk of the roots would have produced them.

use super::{ResolverError, ResolverResult};
use crate::parser::{Declarations, ModuleParser, ParseError};
use crate::walk::{self, WalkError, WalkFilter};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

/// Position of a file in a sequential walk: (root index, file index)
type Discovery = (usize, usize);

/// Outcome of parsing one discovered file
pub(super) type Parsed = (PathBuf, Result<Declarations, ParseError>);

pub(super) fn task_error(error: JoinError) -> ResolverError {
    ResolverError::Task(error.to_string())
}

/// Why a walker stopped early
enum WalkStop {
    Failed(WalkError),
    /// Nobody is listening anymore
    Closed,
}

impl From<WalkError> for WalkStop {
    fn from(error: WalkError) -> Self {
        WalkStop::Failed(error)
    }
}

/// Walk every root and parse every discovered file concurrently
///
/// Parse failures are returned per file so the caller can surface them in
/// discovery order. Walk failures and task panics fail the whole call.
pub(super) async fn parse_roots(
    roots: &[PathBuf],
    filter: &WalkFilter,
    parser: &ModuleParser,
) -> ResolverResult<Vec<Parsed>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<(Discovery, PathBuf)>();

    let mut walkers = JoinSet::new();
    for (root_index, root) in roots.iter().enumerate() {
        let tx = tx.clone();
        let root = root.clone();
        let filter = filter.clone();
        walkers.spawn_blocking(move || {
            let mut file_index = 0;
            let result = walk::walk_tree(&root, &filter, |filename| {
                tx.send(((root_index, file_index), filename))
                    .map_err(|_| WalkStop::Closed)?;
                file_index += 1;
                Ok(())
            });
            match result {
                Ok(()) | Err(WalkStop::Closed) => Ok(()),
                Err(WalkStop::Failed(error)) => Err(error),
            }
        });
    }
    drop(tx);

    let mut parses = JoinSet::new();
    while let Some((discovery, filename)) = rx.recv().await {
        let parser = parser.clone();
        parses.spawn(async move {
            let declarations = parser.parse(&filename).await;
            (discovery, filename, declarations)
        });
    }

    // Fan-in: every walker and every parse must finish
    while let Some(walked) = walkers.join_next().await {
        walked.map_err(task_error)??;
    }
    let mut parsed = Vec::with_capacity(parses.len());
    while let Some(result) = parses.join_next().await {
        parsed.push(result.map_err(task_error)?);
    }

    parsed.sort_by_key(|(discovery, _, _)| *discovery);
    tracing::debug!(files = parsed.len(), "parsed all discovered files");

    Ok(parsed
        .into_iter()
        .map(|(_, filename, declarations)| (filename, declarations))
        .collect())
}
