/// Incremental stop-codon scan for segments ending at one position.
///
/// Segment starts are visited in decreasing order; each call only scans
/// the codons not covered by the previous call, stepping back in units of
/// three from the last in-frame codon before `end`.
pub(crate) struct OrfScan<'a> {
    stops: &'a [bool],
    to_frame: i32,
    end: i32,
    last_pos: i32,
}

impl<'a> OrfScan<'a> {
    pub fn new(stops: &'a [bool], to_frame: i32, end: i32) -> Self {
        Self {
            stops,
            to_frame,
            end: end.max(0),
            last_pos: end,
        }
    }

    /// Whether the open reading frame can be extended back to `start`
    /// without crossing a stop codon. Once this returns `false`, every
    /// smaller `start` fails too.
    pub fn extend(&mut self, start: i32) -> bool {
        let start = start.max(0);
        let last_codon = self.end - self.to_frame - 3;
        let mut pos = if self.last_pos == self.end {
            last_codon
        } else {
            self.last_pos
        };
        if pos < 0 {
            return true;
        }
        while pos >= start {
            if self.stops.get(pos as usize).copied().unwrap_or(false) {
                return false;
            }
            pos -= 3;
        }
        self.last_pos = (pos + 3).min(last_codon);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops_at(len: usize, hits: &[usize]) -> Vec<bool> {
        let mut v = vec![false; len];
        for &h in hits {
            v[h] = true;
        }
        v
    }

    #[test]
    fn no_stop_extends_to_start() {
        let stops = stops_at(30, &[]);
        let mut scan = OrfScan::new(&stops, 0, 30);
        assert!(scan.extend(21));
        assert!(scan.extend(9));
        assert!(scan.extend(0));
    }

    #[test]
    fn in_frame_stop_blocks_further_starts() {
        // codons end at 30: in-frame codon starts are 27, 24, ..., 0
        let stops = stops_at(30, &[12]);
        let mut scan = OrfScan::new(&stops, 0, 30);
        assert!(scan.extend(15));
        assert!(!scan.extend(12));
        assert!(!scan.extend(3));
    }

    #[test]
    fn out_of_frame_stop_is_ignored() {
        let stops = stops_at(30, &[13, 20]);
        let mut scan = OrfScan::new(&stops, 0, 30);
        assert!(scan.extend(0));
    }

    #[test]
    fn to_frame_shifts_codons() {
        // to_frame 1: last codon starts at 26, then 23, 20, ...
        let stops = stops_at(30, &[20]);
        let mut scan = OrfScan::new(&stops, 1, 30);
        assert!(scan.extend(21));
        assert!(!scan.extend(18));
    }
}
