use super::{PlifArena, PlifDerivatives, PlifId};

/// Zero, one or many penalty functions whose scores add up.
///
/// Attached to automaton edges and state signal planes. Each member keeps
/// its own chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PenaltyCollection {
    #[default]
    Empty,
    Single(PlifId),
    Many(Vec<PlifId>),
}

impl PenaltyCollection {
    pub fn from_ids(ids: impl IntoIterator<Item = PlifId>) -> Self {
        let mut ids: Vec<PlifId> = ids.into_iter().collect();
        match ids.len() {
            0 => Self::Empty,
            1 => Self::Single(ids[0]),
            _ => {
                ids.shrink_to_fit();
                Self::Many(ids)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn ids(&self) -> &[PlifId] {
        match self {
            Self::Empty => &[],
            Self::Single(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }

    /// Sum of every member's lookup at a real-valued input.
    pub fn evaluate(
        &self,
        arena: &PlifArena,
        raw: f64,
        external: &[f64],
        follow_chain: bool,
    ) -> f64 {
        match self {
            Self::Empty => 0.0,
            Self::Single(id) => arena.lookup(*id, raw, external, follow_chain).score,
            Self::Many(ids) => ids
                .iter()
                .map(|&id| arena.lookup(id, raw, external, follow_chain).score)
                .sum(),
        }
    }

    /// Same as [`evaluate`](Self::evaluate) for a segment length, cache-aware.
    pub fn evaluate_len(
        &self,
        arena: &PlifArena,
        len: i32,
        external: &[f64],
        follow_chain: bool,
    ) -> f64 {
        match self {
            Self::Empty => 0.0,
            Self::Single(id) => arena.lookup_len(*id, len, external, follow_chain).score,
            Self::Many(ids) => ids
                .iter()
                .map(|&id| arena.lookup_len(id, len, external, follow_chain).score)
                .sum(),
        }
    }

    pub fn add_derivative(
        &self,
        arena: &PlifArena,
        raw: f64,
        external: &[f64],
        follow_chain: bool,
        out: &mut PlifDerivatives,
    ) {
        for &id in self.ids() {
            arena.add_derivative(id, raw, external, follow_chain, out);
        }
    }

    /// Largest `max_value` among members, `None` when empty.
    pub fn max_value(&self, arena: &PlifArena) -> Option<f64> {
        self.ids()
            .iter()
            .filter_map(|&id| arena.get(id))
            .map(|f| f.max_value())
            .reduce(f64::max)
    }

    /// Whether any member, or any link of a member's chain, reads external
    /// scores.
    pub fn uses_external_scores(&self, arena: &PlifArena) -> bool {
        self.max_external_index(arena).is_some()
    }

    /// Largest one-based external score index read by any member or chain
    /// link.
    pub fn max_external_index(&self, arena: &PlifArena) -> Option<usize> {
        let mut best = None;
        for &id in self.ids() {
            let mut cur = Some(id);
            while let Some(cid) = cur {
                let Some(f) = arena.get(cid) else { break };
                if let Some(idx) = f.external_score_index() {
                    best = best.max(Some(idx));
                }
                cur = f.next();
            }
        }
        best
    }
}
