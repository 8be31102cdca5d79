//! Working galaxy catalog.
//!
//! A [`GalaxyCatalog`] is an ordered set of candidates with stable ids. The
//! scheduler owns one working copy per run and shrinks it as accepted tiles
//! cover candidates; the order of the remaining rows never changes.

use std::collections::HashSet;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::core::domain::{Candidate, CandidateId, DistanceProxy, ObservableWindow};

/// Ordered collection of catalog candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyCatalog {
    identifier: String,
    candidates: Vec<Candidate>,
}

impl GalaxyCatalog {
    pub fn new(identifier: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            identifier: identifier.into(),
            candidates,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Candidates whose raw RA/Dec fall inside `window`, in catalog order.
    pub fn observable(&self, window: &ObservableWindow) -> Vec<Candidate> {
        self.candidates
            .iter()
            .filter(|c| window.contains(c.ra_deg, c.dec_deg))
            .cloned()
            .collect()
    }

    /// New catalog with the same identifier keeping rows that match `keep`.
    pub fn filtered<F>(&self, keep: F) -> GalaxyCatalog
    where
        F: Fn(&Candidate) -> bool,
    {
        GalaxyCatalog {
            identifier: self.identifier.clone(),
            candidates: self.candidates.iter().filter(|c| keep(c)).cloned().collect(),
        }
    }

    /// Drop every candidate whose id is in `ids`, returning how many were removed.
    pub fn remove_ids(&mut self, ids: &HashSet<CandidateId>) -> usize {
        let before = self.candidates.len();
        self.candidates.retain(|c| !ids.contains(&c.id));
        before - self.candidates.len()
    }

    /// SHA-256 hex digest of the catalog snapshot.
    ///
    /// Only the loaded fields are hashed, so attaching densities does not
    /// change the checksum.
    pub fn checksum(&self) -> String {
        let mut content = String::with_capacity(self.candidates.len() * 48);
        let _ = writeln!(content, "{}", self.identifier);
        for c in &self.candidates {
            let distance = match c.distance {
                DistanceProxy::RecessionVelocity(v) => format!("cz={}", v),
                DistanceProxy::LuminosityDistance(d) => format!("dl={}", d),
            };
            let _ = writeln!(
                content,
                "{},{},{},{},{}",
                c.id, c.name, c.ra_deg, c.dec_deg, distance
            );
        }
        calculate_checksum(&content)
    }
}

/// Calculate SHA-256 checksum of text content.
///
/// # Returns
/// Hexadecimal string representation of the SHA-256 hash.
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
