mod basic;
mod brute;

use crate::model::{Automaton, Transition};
use crate::plif::{PenaltyCollection, PenaltyFunction, PlifArena, PlifId};

const NEG_INF: f64 = f64::NEG_INFINITY;

fn linear(id: usize, min_len: i32, max_len: i32, v0: f64, v1: f64) -> PenaltyFunction {
    PenaltyFunction::builder(id, vec![min_len as f64, max_len as f64], vec![v0, v1])
        .len_range(min_len, max_len)
        .build()
        .unwrap()
}

/// `start -> middle -> end`, the second hop scored by `(0, -5)-(10, 5)`.
fn start_middle_end() -> Automaton {
    let arena = PlifArena::new(vec![linear(0, 0, 10, -5.0, 5.0)]).unwrap();
    Automaton::builder(3, arena)
        .initial(vec![0.0, NEG_INF, NEG_INF])
        .terminal(vec![NEG_INF, NEG_INF, 0.0])
        .transition(Transition::new(0, 1, 0.0))
        .transition(Transition::new(1, 2, 0.0))
        .edge_penalty(1, 2, PenaltyCollection::Single(PlifId(0)))
        .build()
        .unwrap()
}
