//! Content-model compilation
//!
//! A particle tree is lowered to a regular expression over positions
//! (bounded `maxOccurs` unrolled, `unbounded` as a loop), the Glushkov
//! first/last/follow sets are computed over it, and subset construction
//! turns the position automaton into the deterministic [`ContentModel`].

use std::collections::{BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;

use crate::error::ParseError;
use crate::schema::{ElementDecl, WildcardId};
use crate::symbols::QName;
use crate::validators::groups::{AllGroup, AllParticle};
use crate::validators::models::{ContentModel, ModelState, Term, Transition};
use crate::validators::particles::{Occurs, Particle};

/// Cap on positions after unrolling
const MAX_POSITIONS: usize = 10_000;
/// Cap on automaton states
const MAX_STATES: usize = 10_000;

#[derive(Debug)]
enum Node {
    Eps,
    Pos(u32),
    Seq(Vec<Node>),
    Alt(Vec<Node>),
    Star(Box<Node>),
    Plus(Box<Node>),
}

#[derive(Debug, Clone, Copy)]
struct Position {
    term: Term,
    occurs: Occurs,
}

#[derive(Debug, Default)]
struct Glushkov {
    // slot 0 is the start position
    positions: Vec<Option<Position>>,
    follow: Vec<BTreeSet<u32>>,
}

struct Analysis {
    nullable: bool,
    first: BTreeSet<u32>,
    last: BTreeSet<u32>,
}

impl Glushkov {
    fn new() -> Self {
        Self {
            positions: vec![None],
            follow: vec![BTreeSet::new()],
        }
    }

    fn position(&mut self, term: Term, occurs: Occurs) -> Result<Node, ParseError> {
        if self.positions.len() > MAX_POSITIONS {
            return Err(ParseError::new(format!(
                "content model exceeds {} positions after expanding occurrence bounds",
                MAX_POSITIONS
            )));
        }
        let id = self.positions.len() as u32;
        self.positions.push(Some(Position { term, occurs }));
        self.follow.push(BTreeSet::new());
        Ok(Node::Pos(id))
    }

    fn lower(&mut self, particle: &Particle) -> Result<Node, ParseError> {
        let occurs = particle.occurs();
        let mut seq = Vec::new();
        for _ in 1..occurs.min {
            seq.push(self.lower_term(particle)?);
        }
        match occurs.max {
            None if occurs.min == 0 => seq.push(Node::Star(Box::new(self.lower_term(particle)?))),
            None => seq.push(Node::Plus(Box::new(self.lower_term(particle)?))),
            Some(max) => {
                if occurs.min > 0 {
                    seq.push(self.lower_term(particle)?);
                }
                let optional = max.saturating_sub(occurs.min);
                // x (x (x)?)? nests so each copy is only reachable after the previous one
                let mut copies = Vec::with_capacity(optional as usize);
                for _ in 0..optional {
                    copies.push(self.lower_term(particle)?);
                }
                let mut tail = Node::Eps;
                for copy in copies.into_iter().rev() {
                    tail = Node::Alt(vec![Node::Seq(vec![copy, tail]), Node::Eps]);
                }
                seq.push(tail);
            }
        }
        Ok(match seq.len() {
            1 => seq.pop().unwrap_or(Node::Eps),
            _ => Node::Seq(seq),
        })
    }

    fn lower_term(&mut self, particle: &Particle) -> Result<Node, ParseError> {
        match particle {
            Particle::Element { elem, occurs } => self.position(Term::Element(*elem), *occurs),
            Particle::Any { wildcard, occurs } => self.position(Term::Wildcard(*wildcard), *occurs),
            Particle::Sequence { particles, .. } => {
                Ok(Node::Seq(particles.iter().map(|p| self.lower(p)).collect::<Result<_, _>>()?))
            }
            Particle::Choice { particles, .. } => {
                Ok(Node::Alt(particles.iter().map(|p| self.lower(p)).collect::<Result<_, _>>()?))
            }
            Particle::All { .. } => Err(ParseError::new(
                "an 'all' model group cannot appear inside another model group",
            )),
        }
    }

    fn analyze(&mut self, node: &Node) -> Analysis {
        match node {
            Node::Eps => Analysis {
                nullable: true,
                first: BTreeSet::new(),
                last: BTreeSet::new(),
            },
            Node::Pos(p) => Analysis {
                nullable: false,
                first: [*p].into(),
                last: [*p].into(),
            },
            Node::Seq(items) => {
                let mut acc = Analysis {
                    nullable: true,
                    first: BTreeSet::new(),
                    last: BTreeSet::new(),
                };
                for item in items {
                    let next = self.analyze(item);
                    for p in &acc.last {
                        self.follow[*p as usize].extend(next.first.iter().copied());
                    }
                    if acc.nullable {
                        acc.first.extend(next.first.iter().copied());
                    }
                    if next.nullable {
                        acc.last.extend(next.last);
                    } else {
                        acc.last = next.last;
                    }
                    acc.nullable &= next.nullable;
                }
                acc
            }
            Node::Alt(items) => {
                let mut acc = Analysis {
                    nullable: false,
                    first: BTreeSet::new(),
                    last: BTreeSet::new(),
                };
                for item in items {
                    let next = self.analyze(item);
                    acc.nullable |= next.nullable;
                    acc.first.extend(next.first);
                    acc.last.extend(next.last);
                }
                acc
            }
            Node::Star(inner) | Node::Plus(inner) => {
                let mut result = self.analyze(inner);
                for p in &result.last {
                    self.follow[*p as usize].extend(result.first.iter().copied());
                }
                if matches!(node, Node::Star(_)) {
                    result.nullable = true;
                }
                result
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Symbol {
    Name(QName),
    Wild(WildcardId),
}

/// Compile a particle tree into a deterministic automaton.
///
/// `elements` is the element table, used for names and substitution groups.
pub(super) fn content_model(particle: &Particle, elements: &[ElementDecl]) -> Result<ContentModel, ParseError> {
    let mut glushkov = Glushkov::new();
    let root = glushkov.lower(particle)?;
    let analysis = glushkov.analyze(&root);
    glushkov.follow[0] = analysis.first;
    let mut last = analysis.last;
    if analysis.nullable {
        last.insert(0);
    }

    let mut index: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut sets: Vec<Vec<u32>> = vec![vec![0]];
    index.insert(vec![0], 0);
    let mut queue = VecDeque::from([0u32]);
    let mut states: Vec<ModelState> = vec![ModelState::default()];

    while let Some(state_id) = queue.pop_front() {
        let set = sets[state_id as usize].clone();
        let mut candidates = BTreeSet::new();
        for p in &set {
            candidates.extend(glushkov.follow[*p as usize].iter().copied());
        }

        let mut groups: IndexMap<Symbol, (Vec<u32>, Transition)> = IndexMap::new();
        for p in candidates {
            let Some(position) = glushkov.positions[p as usize] else {
                continue;
            };
            let proto = Transition {
                target: 0,
                term: position.term,
                occurs: position.occurs,
            };
            match position.term {
                Term::Element(elem) => {
                    let decl = &elements[elem.index()];
                    let names = std::iter::once(decl.name)
                        .chain(decl.substitutes.iter().map(|m| elements[m.index()].name));
                    for name in names {
                        groups.entry(Symbol::Name(name)).or_insert_with(|| (Vec::new(), proto)).0.push(p);
                    }
                }
                Term::Wildcard(wildcard) => {
                    groups.entry(Symbol::Wild(wildcard)).or_insert_with(|| (Vec::new(), proto)).0.push(p);
                }
            }
        }

        let mut named = IndexMap::new();
        let mut wildcards = Vec::new();
        for (symbol, (mut targets, mut transition)) in groups {
            targets.dedup();
            let target = match index.get(&targets) {
                Some(id) => *id,
                None => {
                    if sets.len() >= MAX_STATES {
                        return Err(ParseError::new(format!(
                            "content model exceeds {} automaton states",
                            MAX_STATES
                        )));
                    }
                    let id = sets.len() as u32;
                    index.insert(targets.clone(), id);
                    sets.push(targets);
                    states.push(ModelState::default());
                    queue.push_back(id);
                    id
                }
            };
            transition.target = target;
            match symbol {
                Symbol::Name(name) => {
                    named.insert(name, transition);
                }
                Symbol::Wild(_) => wildcards.push(transition),
            }
        }

        let state = &mut states[state_id as usize];
        state.named = named;
        state.wildcards = wildcards;
        state.is_final = set.iter().any(|p| last.contains(p));
    }

    Ok(ContentModel { states })
}

/// Build the runtime form of a top-level `all` group
pub(super) fn all_group(particle: &Particle, elements: &[ElementDecl]) -> Result<AllGroup, ParseError> {
    let Particle::All { particles, occurs } = particle else {
        return Err(ParseError::new("expected an 'all' model group"));
    };
    let mut group = AllGroup {
        particles: Vec::with_capacity(particles.len()),
        min_occurs: occurs.min,
        names: IndexMap::new(),
    };
    for particle in particles {
        let Particle::Element { elem, occurs } = particle else {
            return Err(ParseError::new("an 'all' model group may only contain element particles"));
        };
        let index = group.particles.len();
        group.particles.push(AllParticle {
            elem: *elem,
            min: occurs.min,
            max: occurs.max.unwrap_or(1),
        });
        let decl = &elements[elem.index()];
        let names = std::iter::once(decl.name).chain(decl.substitutes.iter().map(|m| elements[m.index()].name));
        for name in names {
            if group.names.insert(name, index).is_some() {
                return Err(ParseError::new(format!(
                    "element name used twice in an 'all' model group (particle {})",
                    index + 1
                )));
            }
        }
    }
    Ok(group)
}
