//! XSD Content Model Validators
//!
//! This module provides the runtime side of content models: a deterministic
//! automaton per complex type, built by the schema builder from the particle
//! tree. Each state has a sparse table of named transitions and an ordered
//! list of wildcard transitions. A named transition always beats a wildcard,
//! and wildcards are tried in declaration order.
//!
//! The automaton never changes state on a rejected child, so the caller can
//! report the error, skip the child's subtree and keep checking siblings.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#coss-particle

use indexmap::IndexMap;

use crate::schema::{CompiledSchema, ElemId, WildcardId};
use crate::symbols::QName;
use crate::validators::exceptions::ErrorCode;
use crate::validators::particles::Occurs;
use crate::validators::wildcards::ProcessContents;

/// What a transition consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// An element declaration; substitution-group members of the declaration
    /// share its transition
    Element(ElemId),
    /// A wildcard
    Wildcard(WildcardId),
}

/// A transition of the automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Target state
    pub target: u32,
    /// Consumed term
    pub term: Term,
    /// Occurrence bounds of the particle the term came from
    pub occurs: Occurs,
}

/// A state of the automaton
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    /// Transitions keyed by element name
    pub named: IndexMap<QName, Transition>,
    /// Wildcard transitions in declaration order
    pub wildcards: Vec<Transition>,
    /// Whether the child sequence may end here
    pub is_final: bool,
}

/// Outcome of feeding a child name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMatch {
    /// Matched an element slot; `slot` is the declaration the model expects,
    /// which differs from the instance name for substitution-group members
    Element {
        /// The expected declaration
        slot: ElemId,
    },
    /// Matched a wildcard
    Wildcard {
        /// The wildcard
        wildcard: WildcardId,
        /// Its process contents
        process_contents: ProcessContents,
    },
}

/// Deterministic content-model automaton; state 0 is the start state
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    /// States, indexed by state number
    pub states: Vec<ModelState>,
}

impl ContentModel {
    /// Automaton that accepts only the empty child sequence
    pub fn empty() -> Self {
        Self {
            states: vec![ModelState {
                is_final: true,
                ..ModelState::default()
            }],
        }
    }

    /// Start state
    pub fn start(&self) -> u32 {
        0
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the automaton has no states
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether `state` accepts the end of the child sequence
    pub fn is_final(&self, state: u32) -> bool {
        self.states.get(state as usize).map_or(false, |s| s.is_final)
    }

    /// Feed a child element name; on success `state` moves to the target.
    ///
    /// On failure `state` is unchanged and the error code tells whether the
    /// state still needed an element (`RequiredElementMissing`) or simply
    /// admits nothing more by that name (`UnexpectedElement`).
    pub fn feed(
        &self,
        schema: &CompiledSchema,
        state: &mut u32,
        name: QName,
    ) -> Result<ModelMatch, ErrorCode> {
        let Some(current) = self.states.get(*state as usize) else {
            return Err(ErrorCode::UnexpectedElement);
        };
        if let Some(transition) = current.named.get(&name) {
            *state = transition.target;
            if let Term::Element(slot) = transition.term {
                return Ok(ModelMatch::Element { slot });
            }
        }
        for transition in &current.wildcards {
            if let Term::Wildcard(wildcard) = transition.term {
                let wc = schema.wildcard(wildcard);
                if wc.matches(name.ns) {
                    *state = transition.target;
                    return Ok(ModelMatch::Wildcard {
                        wildcard,
                        process_contents: wc.process_contents,
                    });
                }
            }
        }
        if current.is_final {
            Err(ErrorCode::UnexpectedElement)
        } else {
            Err(ErrorCode::RequiredElementMissing)
        }
    }

    /// Names admitted in `state`, for messages
    pub fn expected(&self, schema: &CompiledSchema, state: u32) -> Vec<String> {
        let Some(current) = self.states.get(state as usize) else {
            return Vec::new();
        };
        let mut out: Vec<String> = current
            .named
            .iter()
            .filter(|(name, t)| match t.term {
                Term::Element(slot) => schema.element(slot).name == **name,
                Term::Wildcard(_) => false,
            })
            .map(|(name, _)| schema.display_qname(*name).to_string())
            .collect();
        if !current.wildcards.is_empty() {
            out.push("any element".to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComplexTypeSpec, ElementSpec, SchemaBuilder};
    use crate::validators::particles::Particle;
    use crate::validators::wildcards::ProcessContents;
    use crate::schema::ContentKind;

    struct Fixture {
        schema: CompiledSchema,
        model: crate::schema::ModelId,
        a: QName,
        b: QName,
        c: QName,
        other: QName,
    }

    fn build(particle: impl FnOnce(&mut SchemaBuilder, [ElemId; 3]) -> Particle) -> Fixture {
        let mut builder = SchemaBuilder::new();
        let string = builder.builtin("string");
        let names = ["a", "b", "c"].map(|n| builder.qname("", n));
        let elems = names.map(|n| builder.element(ElementSpec::new(n, string)).unwrap());
        let particle = particle(&mut builder, elems);
        let ty = builder
            .complex_type(ComplexTypeSpec::new(None).content(ContentKind::ElementOnly, particle))
            .unwrap();
        let other = builder.qname("urn:other", "x");
        let schema = builder.finish().unwrap();
        let model = match schema.complex_of(ty).unwrap().model {
            crate::schema::ContentHandle::Automaton(m) => m,
            other => panic!("unexpected handle {:?}", other),
        };
        Fixture {
            schema,
            model,
            a: names[0],
            b: names[1],
            c: names[2],
            other,
        }
    }

    fn run(f: &Fixture, names: &[QName]) -> Result<bool, (usize, ErrorCode)> {
        let model = f.schema.model(f.model);
        let mut state = model.start();
        for (i, name) in names.iter().enumerate() {
            model.feed(&f.schema, &mut state, *name).map_err(|e| (i, e))?;
        }
        Ok(model.is_final(state))
    }

    #[test]
    fn test_sequence_with_optional() {
        let f = build(|_, [a, b, c]| {
            Particle::sequence(vec![
                Particle::element(a),
                Particle::element(b).with_occurs(0, Some(1)),
                Particle::element(c),
            ])
        });
        assert_eq!(run(&f, &[f.a, f.b, f.c]), Ok(true));
        assert_eq!(run(&f, &[f.a, f.c]), Ok(true));
        assert_eq!(run(&f, &[f.a]), Ok(false));
        assert_eq!(run(&f, &[f.a, f.c, f.b]), Err((2, ErrorCode::UnexpectedElement)));
        assert_eq!(run(&f, &[f.b]), Err((0, ErrorCode::RequiredElementMissing)));
    }

    #[test]
    fn test_state_unchanged_on_reject() {
        let f = build(|_, [a, b, _]| Particle::sequence(vec![Particle::element(a), Particle::element(b)]));
        let model = f.schema.model(f.model);
        let mut state = model.start();
        model.feed(&f.schema, &mut state, f.a).unwrap();
        let before = state;
        assert!(model.feed(&f.schema, &mut state, f.c).is_err());
        assert_eq!(state, before);
        model.feed(&f.schema, &mut state, f.b).unwrap();
        assert!(model.is_final(state));
    }

    #[test]
    fn test_bounded_repetition() {
        let f = build(|_, [a, b, _]| {
            Particle::sequence(vec![
                Particle::element(a).with_occurs(2, Some(3)),
                Particle::element(b).with_occurs(0, None),
            ])
        });
        assert_eq!(run(&f, &[f.a]), Ok(false));
        assert_eq!(run(&f, &[f.a, f.a]), Ok(true));
        assert_eq!(run(&f, &[f.a, f.a, f.a, f.b, f.b]), Ok(true));
        assert_eq!(run(&f, &[f.a, f.a, f.a, f.a]), Err((3, ErrorCode::UnexpectedElement)));
    }

    #[test]
    fn test_nested_choice_repetition() {
        let f = build(|_, [a, b, c]| {
            Particle::sequence(vec![
                Particle::choice(vec![Particle::element(a), Particle::element(b)]).with_occurs(1, None),
                Particle::element(c),
            ])
        });
        assert_eq!(run(&f, &[f.b, f.a, f.b, f.c]), Ok(true));
        assert_eq!(run(&f, &[f.c]), Err((0, ErrorCode::RequiredElementMissing)));
    }

    #[test]
    fn test_named_beats_wildcard() {
        let f = build(|builder, [a, _, _]| {
            let any = builder.wildcard("##any", ProcessContents::Lax, "").unwrap();
            Particle::choice(vec![Particle::element(a), Particle::any(any)])
        });
        let model = f.schema.model(f.model);
        let mut state = model.start();
        assert!(matches!(
            model.feed(&f.schema, &mut state, f.a),
            Ok(ModelMatch::Element { .. })
        ));
        let mut state = model.start();
        assert!(matches!(
            model.feed(&f.schema, &mut state, f.other),
            Ok(ModelMatch::Wildcard {
                process_contents: ProcessContents::Lax,
                ..
            })
        ));
    }

    #[test]
    fn test_wildcards_in_declaration_order() {
        let f = build(|builder, _| {
            let first = builder.wildcard("urn:other", ProcessContents::Skip, "").unwrap();
            let second = builder.wildcard("##any", ProcessContents::Strict, "").unwrap();
            Particle::choice(vec![Particle::any(first), Particle::any(second)])
        });
        let model = f.schema.model(f.model);
        let mut state = model.start();
        assert!(matches!(
            model.feed(&f.schema, &mut state, f.other),
            Ok(ModelMatch::Wildcard {
                process_contents: ProcessContents::Skip,
                ..
            })
        ));
        let mut state = model.start();
        assert!(matches!(
            model.feed(&f.schema, &mut state, f.a),
            Ok(ModelMatch::Wildcard {
                process_contents: ProcessContents::Strict,
                ..
            })
        ));
    }

    #[test]
    fn test_expected_names() {
        let f = build(|_, [a, b, _]| Particle::choice(vec![Particle::element(a), Particle::element(b)]));
        let model = f.schema.model(f.model);
        assert_eq!(model.expected(&f.schema, model.start()), vec!["a".to_string(), "b".to_string()]);
    }
}
