//! Fresh record id allocation.

use crate::error::PlannerError;
use mend_common::{ContentHash, ObjectId};
use std::collections::HashSet;

const MAX_ATTEMPTS: u32 = 256;

/// Derives fresh 24-digit ids that collide with nothing in the manifest.
///
/// Candidates are hashed from the registered path, the record role and an
/// attempt counter, so the same request against the same text yields the same
/// ids. A candidate is rejected if it occurs anywhere in the raw text, not
/// only among parsed ids, or if it was already handed out.
pub struct IdAllocator<'a> {
    text: &'a str,
    issued: HashSet<String>,
}

impl<'a> IdAllocator<'a> {
    /// An allocator avoiding every token in `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            issued: HashSet::new(),
        }
    }

    /// Allocates an id for the `role` record of `path`.
    pub fn allocate(&mut self, path: &str, role: &str) -> Result<ObjectId, PlannerError> {
        for attempt in 0..MAX_ATTEMPTS {
            let seed = format!("{path}\0{role}\0{attempt}");
            let candidate = ContentHash::from_bytes(seed.as_bytes()).upper_hex(ObjectId::GENERATED_LEN);
            if self.text.contains(&candidate) || self.issued.contains(&candidate) {
                continue;
            }
            self.issued.insert(candidate.clone());
            return Ok(ObjectId::new(candidate));
        }
        Err(PlannerError::IdSpaceExhausted {
            path: path.to_string(),
        })
    }
}
