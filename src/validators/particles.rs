//! XSD Particle Schema Components
//!
//! This module implements the particle model for XSD elements, groups, and wildcards.
//! Particles define occurrence constraints (minOccurs, maxOccurs) for schema components.
//! A particle tree is the builder-side description of a content model; it is
//! compiled into a [`ContentModel`](super::models::ContentModel) or an
//! [`AllGroup`](super::groups::AllGroup) when the schema is finished.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#p

use crate::error::ParseError;
use crate::schema::{ElemId, WildcardId};

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max_occurs means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check that the bounds are consistent
    pub fn check(&self) -> Result<(), ParseError> {
        match self.max {
            Some(max) if self.min > max => Err(ParseError::new(format!(
                "minOccurs ({}) must be lesser or equal than maxOccurs ({})",
                self.min, max
            ))),
            _ => Ok(()),
        }
    }
}

/// A node of a content-model particle tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Particle {
    /// Element declaration
    Element {
        /// Declaration (local or a reference to a global one)
        elem: ElemId,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// `xs:any`
    Any {
        /// Wildcard
        wildcard: WildcardId,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// `xs:sequence`
    Sequence {
        /// Children in order
        particles: Vec<Particle>,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// `xs:choice`
    Choice {
        /// Alternatives in declaration order
        particles: Vec<Particle>,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// `xs:all`
    All {
        /// Element particles
        particles: Vec<Particle>,
        /// Occurrence bounds (maxOccurs is 1)
        occurs: Occurs,
    },
}

impl Particle {
    /// Element particle occurring once
    pub fn element(elem: ElemId) -> Self {
        Particle::Element { elem, occurs: Occurs::once() }
    }

    /// Wildcard particle occurring once
    pub fn any(wildcard: WildcardId) -> Self {
        Particle::Any { wildcard, occurs: Occurs::once() }
    }

    /// Sequence occurring once
    pub fn sequence(particles: Vec<Particle>) -> Self {
        Particle::Sequence { particles, occurs: Occurs::once() }
    }

    /// Choice occurring once
    pub fn choice(particles: Vec<Particle>) -> Self {
        Particle::Choice { particles, occurs: Occurs::once() }
    }

    /// All-group occurring once
    pub fn all(particles: Vec<Particle>) -> Self {
        Particle::All { particles, occurs: Occurs::once() }
    }

    /// Replace the occurrence bounds
    pub fn with_occurs(mut self, min: u32, max: Option<u32>) -> Self {
        *self.occurs_mut() = Occurs::new(min, max);
        self
    }

    /// Occurrence bounds
    pub fn occurs(&self) -> Occurs {
        match self {
            Particle::Element { occurs, .. }
            | Particle::Any { occurs, .. }
            | Particle::Sequence { occurs, .. }
            | Particle::Choice { occurs, .. }
            | Particle::All { occurs, .. } => *occurs,
        }
    }

    fn occurs_mut(&mut self) -> &mut Occurs {
        match self {
            Particle::Element { occurs, .. }
            | Particle::Any { occurs, .. }
            | Particle::Sequence { occurs, .. }
            | Particle::Choice { occurs, .. }
            | Particle::All { occurs, .. } => occurs,
        }
    }

    /// Child particles of a model group
    pub fn children(&self) -> &[Particle] {
        match self {
            Particle::Sequence { particles, .. }
            | Particle::Choice { particles, .. }
            | Particle::All { particles, .. } => particles,
            _ => &[],
        }
    }

    /// Whether the particle accepts an empty child sequence
    pub fn is_emptiable(&self) -> bool {
        if self.occurs().is_emptiable() {
            return true;
        }
        match self {
            Particle::Element { .. } | Particle::Any { .. } => false,
            Particle::Sequence { particles, .. } | Particle::All { particles, .. } => {
                particles.iter().all(Particle::is_emptiable)
            }
            Particle::Choice { particles, .. } => particles.iter().any(Particle::is_emptiable),
        }
    }

    /// Check occurrence bounds across the tree, and that `all` groups hold
    /// only element particles and are not nested
    pub fn check(&self, top_level: bool) -> Result<(), ParseError> {
        self.occurs().check()?;
        match self {
            Particle::Element { .. } | Particle::Any { .. } => Ok(()),
            Particle::All { particles, occurs } => {
                if !top_level {
                    return Err(ParseError::new("an 'all' model group must be the top-level particle"));
                }
                if occurs.max.map_or(true, |max| max > 1) {
                    return Err(ParseError::new("maxOccurs of an 'all' model group must be 0 or 1"));
                }
                for particle in particles {
                    match particle {
                        Particle::Element { occurs, .. } => {
                            occurs.check()?;
                            if occurs.max.map_or(true, |max| max > 1) {
                                return Err(ParseError::new(
                                    "maxOccurs of an element in an 'all' model group must be 0 or 1",
                                ));
                            }
                        }
                        _ => {
                            return Err(ParseError::new(
                                "an 'all' model group may only contain element particles",
                            ))
                        }
                    }
                }
                Ok(())
            }
            Particle::Sequence { particles, .. } | Particle::Choice { particles, .. } => {
                particles.iter().try_for_each(|p| p.check(false))
            }
        }
    }
}
