use std::collections::HashMap;

/// Second sequences at least this long get popular characters dropped from
/// the match index.
const AUTOJUNK_MIN_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchBlock {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

/// Longest-matching-block alignment of two character sequences.
///
/// Blocks are found by taking the longest common run, then recursing into the
/// unmatched regions on either side of it. The similarity ratio is
/// `2 * matched / (len(a) + len(b))`.
#[derive(Debug)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a = a.chars().collect::<Vec<char>>();
        let b = b.chars().collect::<Vec<char>>();
        let b2j = index_second(&b);
        Self { a, b, b2j }
    }

    pub fn ratio(&self) -> f64 {
        let matched = self
            .matching_blocks()
            .iter()
            .map(|block| block.size)
            .sum::<usize>();
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * matched as f64 / total as f64
    }

    /// Matching blocks in ascending order, adjacent blocks merged, terminated
    /// by a zero-size sentinel at `(len(a), len(b))`.
    pub fn matching_blocks(&self) -> Vec<MatchBlock> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::<MatchBlock>::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let found = self.find_longest_match(alo, ahi, blo, bhi);
            if found.size == 0 {
                continue;
            }
            blocks.push(found);
            if alo < found.a && blo < found.b {
                queue.push((alo, found.a, blo, found.b));
            }
            if found.a + found.size < ahi && found.b + found.size < bhi {
                queue.push((found.a + found.size, ahi, found.b + found.size, bhi));
            }
        }
        blocks.sort();

        let mut merged = Vec::<MatchBlock>::with_capacity(blocks.len() + 1);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }
        merged.push(MatchBlock {
            a: self.a.len(),
            b: self.b.len(),
            size: 0,
        });
        merged
    }

    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchBlock {
        let (a, b) = (&self.a, &self.b);
        let mut best_i = alo;
        let mut best_j = blo;
        let mut best_size = 0usize;

        // run length of the match ending at b[j], for the previous row of a
        let mut j2len = HashMap::<usize, usize>::new();
        for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next_j2len = HashMap::<usize, usize>::new();
            if let Some(positions) = self.b2j.get(ch) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let previous = if j > 0 {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    };
                    let k = previous + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // popular characters were left out of the index; absorb them at the edges
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && a[best_i + best_size] == b[best_j + best_size]
        {
            best_size += 1;
        }

        MatchBlock {
            a: best_i,
            b: best_j,
            size: best_size,
        }
    }
}

/// Positions of every character of `b`, minus characters too frequent to be
/// useful anchors in long sequences.
fn index_second(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j = HashMap::<char, Vec<usize>>::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    if b.len() >= AUTOJUNK_MIN_LEN {
        let threshold = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= threshold);
    }
    b2j
}

pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}
