/// One entry of a top-K list: accumulated score, the cell it continues
/// from and which rank of that cell's list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KEntry {
    pub score: f64,
    /// `(column, state)` of the predecessor, `None` at the path start.
    pub prev: Option<(usize, usize)>,
    pub prev_rank: usize,
}

impl KEntry {
    pub fn start(score: f64) -> Self {
        Self {
            score,
            prev: None,
            prev_rank: 0,
        }
    }
}

/// Whether a candidate score can take part in a top-K list.
#[inline]
pub(crate) fn admissible(score: f64) -> bool {
    !score.is_nan() && score != f64::NEG_INFINITY
}

/// Insert into a top-K list kept in descending score order, max size `k`.
///
/// Equal scores keep insertion order, so the first generated candidate wins
/// a tie. `prev_rank` of later cells indexes into finalized lists, which is
/// why this stays a sorted `Vec` rather than a heap.
pub(crate) fn insert_top_k(list: &mut Vec<KEntry>, k: usize, entry: KEntry) {
    let pos = list.partition_point(|e| e.score >= entry.score);
    if pos >= k {
        return;
    }
    list.insert(pos, entry);
    if list.len() > k {
        list.pop();
    }
}

/// Follow back-pointers from `(column, state, rank)` of a table laid out
/// `[column * n_states + state]`.
///
/// Returns `(states, columns)` in path order.
pub(crate) fn backtrace(
    table: &[Vec<KEntry>],
    n_states: usize,
    column: usize,
    state: usize,
    rank: usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut states = Vec::new();
    let mut columns = Vec::new();
    let (mut col, mut st, mut rk) = (column, state, rank);
    loop {
        states.push(st);
        columns.push(col);
        let entry = &table[col * n_states + st][rk];
        match entry.prev {
            Some((pc, ps)) => {
                rk = entry.prev_rank;
                col = pc;
                st = ps;
            }
            None => break,
        }
    }
    states.reverse();
    columns.reverse();
    (states, columns)
}
