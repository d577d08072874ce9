//! Deterministic dependency ordering.
//!
//! Candidates are sorted by id first, so an unchanged set always resolves to
//! the same order. Actions without dependencies come out first; the rest are
//! released pass by pass as their dependencies resolve. Whatever is left
//! when a full pass makes no progress is reported in one `DependencyError`.
use std::collections::HashSet;

use crate::types::errors::DependencyError;

/// Anything the resolver can order.
pub trait Dependent {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[&str];
}

/// Lazy resolution of a candidate set. Yields each item once its
/// dependencies have been yielded, then at most one error.
pub struct Resolution<'a, T> {
    ready: std::vec::IntoIter<&'a T>,
    deferred: Vec<&'a T>,
    resolved: HashSet<String>,
    cursor: usize,
    progressed: bool,
    finished: bool,
}

/// Order `candidates` so every item follows its dependencies.
///
/// `previously_resolved` holds ids already placed by earlier stages; they
/// satisfy dependencies but are not yielded again.
pub fn resolve_action_order<'a, T, I, S>(candidates: &'a [T], previously_resolved: I) -> Resolution<'a, T>
where
    T: Dependent,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sorted: Vec<&T> = candidates.iter().collect();
    sorted.sort_by(|a, b| a.id().cmp(b.id()));
    let (ready, deferred): (Vec<&T>, Vec<&T>) =
        sorted.into_iter().partition(|a| a.dependencies().is_empty());
    Resolution {
        ready: ready.into_iter(),
        deferred,
        resolved: previously_resolved.into_iter().map(Into::into).collect(),
        cursor: 0,
        progressed: false,
        finished: false,
    }
}

impl<'a, T: Dependent> Iterator for Resolution<'a, T> {
    type Item = Result<&'a T, DependencyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.ready.next() {
            self.resolved.insert(item.id().to_string());
            return Some(Ok(item));
        }
        if self.finished {
            return None;
        }
        loop {
            if self.cursor >= self.deferred.len() {
                // End of a pass: stop once a pass released nothing.
                if !self.progressed || self.deferred.is_empty() {
                    break;
                }
                self.cursor = 0;
                self.progressed = false;
                continue;
            }
            let candidate = self.deferred[self.cursor];
            if candidate
                .dependencies()
                .iter()
                .all(|d| self.resolved.contains(*d))
            {
                self.deferred.remove(self.cursor);
                self.resolved.insert(candidate.id().to_string());
                self.progressed = true;
                return Some(Ok(candidate));
            }
            self.cursor += 1;
        }
        self.finished = true;
        if self.deferred.is_empty() {
            None
        } else {
            let ids = self.deferred.drain(..).map(|a| a.id().to_string()).collect();
            Some(Err(DependencyError::new(ids)))
        }
    }
}
