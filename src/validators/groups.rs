//! XSD Model Group validators
//!
//! Sequences and choices are compiled into automata (see
//! [`models`](super::models)); this module holds the order-insensitive
//! `xs:all` group, which is checked with one counter per particle instead.
//! Counters live in a buffer owned by the session, so a group can be
//! validated at any nesting depth without allocating.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Model_Groups

use indexmap::IndexMap;

use crate::schema::ElemId;
use crate::symbols::QName;
use crate::validators::exceptions::ErrorCode;

/// An element particle of an `all` group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllParticle {
    /// Expected declaration
    pub elem: ElemId,
    /// minOccurs (0 or 1)
    pub min: u32,
    /// maxOccurs (0 or 1)
    pub max: u32,
}

/// Runtime form of an `xs:all` group
#[derive(Debug, Clone, Default)]
pub struct AllGroup {
    /// Particles in declaration order
    pub particles: Vec<AllParticle>,
    /// minOccurs of the group itself
    pub min_occurs: u32,
    /// Particle index per admitted name, substitution-group members included
    pub names: IndexMap<QName, usize>,
}

impl AllGroup {
    /// Number of particles, i.e. counters needed
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the group has no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Feed a child name, bumping its particle's counter
    ///
    /// Returns the declaration expected in the matched slot.
    pub fn feed(&self, counts: &mut [u32], name: QName) -> Result<ElemId, ErrorCode> {
        let index = *self.names.get(&name).ok_or(ErrorCode::UnexpectedElement)?;
        let particle = &self.particles[index];
        let count = counts.get_mut(index).ok_or(ErrorCode::UnexpectedElement)?;
        if *count >= particle.max {
            return Err(ErrorCode::UnexpectedElement);
        }
        *count += 1;
        Ok(particle.elem)
    }

    /// Check the counters at the end of the element; returns the missing
    /// declarations on failure
    pub fn close(&self, counts: &[u32]) -> Result<(), Vec<ElemId>> {
        if self.min_occurs == 0 && counts.iter().all(|c| *c == 0) {
            return Ok(());
        }
        let missing: Vec<ElemId> = self
            .particles
            .iter()
            .zip(counts)
            .filter(|(p, c)| **c < p.min)
            .map(|(p, _)| p.elem)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}
