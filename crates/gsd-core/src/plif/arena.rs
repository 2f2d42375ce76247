use tracing::{debug, debug_span};

use super::{Lookup, PenaltyFunction, PlifId};
use crate::error::{ModelError, Result};

/// Owns every penalty function of a model.
///
/// Chains are forward links by id. `new` rejects dangling links and cycles,
/// then builds the integer caches once; the arena is immutable afterwards
/// and can be shared by concurrent decodes.
#[derive(Debug, Clone, Default)]
pub struct PlifArena {
    functions: Vec<PenaltyFunction>,
}

impl PlifArena {
    /// Build an arena from functions with ids `0..n` in any order.
    pub fn new(mut functions: Vec<PenaltyFunction>) -> Result<Self> {
        let n = functions.len();
        let _span = debug_span!("plif_arena_new", n).entered();

        let mut seen = vec![false; n];
        for f in &functions {
            let id = f.id.0;
            if id >= n {
                return Err(ModelError::out_of_range("penalty function", id, n));
            }
            if std::mem::replace(&mut seen[id], true) {
                return Err(ModelError::DuplicateId(id));
            }
        }
        functions.sort_by_key(|f| f.id);

        for f in &functions {
            if let Some(next) = f.next {
                if next.0 >= n {
                    return Err(ModelError::out_of_range(
                        format!("next of penalty function {}", f.id.0),
                        next.0,
                        n,
                    ));
                }
            }
        }
        check_acyclic(&functions)?;

        for f in &mut functions {
            f.build_cache();
        }
        debug!(
            cached = functions.iter().filter(|f| f.has_cache()).count(),
            chained = functions.iter().filter(|f| f.next.is_some()).count()
        );
        Ok(Self { functions })
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, id: PlifId) -> Option<&PenaltyFunction> {
        self.functions.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PenaltyFunction> {
        self.functions.iter()
    }

    /// Largest breakpoint table in the arena.
    pub fn max_breakpoints(&self) -> usize {
        self.functions.iter().map(|f| f.len()).max().unwrap_or(0)
    }

    /// Look up `id` at a real-valued input.
    ///
    /// An out-of-domain input gives `-inf`. With `follow_chain`, every later
    /// link is evaluated on the same raw input and added.
    pub fn lookup(&self, id: PlifId, raw: f64, external: &[f64], follow_chain: bool) -> Lookup {
        let f = &self.functions[id.0];
        let mut result = f.own_term(raw, external);
        if let (Some(next), true) = (f.next, follow_chain) {
            result.score += self.lookup(next, raw, external, true).score;
        }
        result
    }

    /// Look up `id` at an integer input (a segment length), using the cache
    /// of every link that has one.
    pub fn lookup_len(&self, id: PlifId, len: i32, external: &[f64], follow_chain: bool) -> Lookup {
        let f = &self.functions[id.0];
        let mut result = f.own_term_int(len, external);
        if let (Some(next), true) = (f.next, follow_chain) {
            result.score += self.lookup_len(next, len, external, true).score;
        }
        result
    }

    /// Accumulate derivatives of `lookup(id, raw, ..)` with respect to the
    /// breakpoint values of every function involved.
    pub fn add_derivative(
        &self,
        id: PlifId,
        raw: f64,
        external: &[f64],
        follow_chain: bool,
        out: &mut PlifDerivatives,
    ) {
        let mut cur = Some(id);
        let mut first = true;
        while let Some(cid) = cur {
            let f = &self.functions[cid.0];
            f.add_own_derivative(raw, external, &mut out.values[cid.0]);
            if !f.uses_external_scores() && !f.in_domain(raw) {
                break;
            }
            if first && !follow_chain {
                break;
            }
            first = false;
            cur = f.next;
        }
    }
}

fn check_acyclic(functions: &[PenaltyFunction]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; functions.len()];
    for start in 0..functions.len() {
        let mut cur = Some(start);
        let mut walked = Vec::new();
        while let Some(i) = cur {
            match marks[i] {
                Mark::Done => break,
                Mark::InProgress => return Err(ModelError::CyclicChain(start)),
                Mark::Unvisited => {
                    marks[i] = Mark::InProgress;
                    walked.push(i);
                    cur = functions[i].next.map(|n| n.0);
                }
            }
        }
        for i in walked {
            marks[i] = Mark::Done;
        }
    }
    Ok(())
}

/// Per-breakpoint derivative accumulators, one row per penalty function,
/// every row sized to the largest breakpoint table of the arena.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PlifDerivatives {
    pub values: Vec<Vec<f64>>,
}

impl PlifDerivatives {
    pub fn for_arena(arena: &PlifArena) -> Self {
        let width = arena.max_breakpoints();
        Self {
            values: vec![vec![0.0; width]; arena.len()],
        }
    }

    pub fn get(&self, id: PlifId) -> &[f64] {
        &self.values[id.0]
    }

    pub fn clear(&mut self) {
        for row in &mut self.values {
            row.fill(0.0);
        }
    }
}
