/// Edit distance used to rank noisy subtitle filenames: the minimum number of
/// single-character insertions, deletions and substitutions turning `a` into
/// `b`.
///
/// Comparison is ordinal over `char`s; callers lowercase both sides first when
/// they want case-insensitive ranking.
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the (len(a)+1) x (len(b)+1) table are enough.
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Pick the candidate closest to `target`, keeping the first one seen on ties.
pub fn closest<'a, I>(candidates: I, target: &str) -> Option<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|candidate| (candidate, distance(candidate, target)))
        .min_by_key(|&(_, d)| d)
}
