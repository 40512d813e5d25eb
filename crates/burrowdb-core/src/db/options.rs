///
/// QueryOptions
///
/// Window over an ordered result: `skip` records from the start of the
/// requested direction, then at most `limit`. Non-positive values disable
/// either bound.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueryOptions {
    pub limit: i64,
    pub skip: i64,
    pub reverse: bool,
}

impl QueryOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: 0,
            skip: 0,
            reverse: false,
        }
    }

    #[must_use]
    pub const fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub const fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub(crate) fn window(&self) -> Window {
        Window {
            skip: usize::try_from(self.skip).unwrap_or(0),
            limit: usize::try_from(self.limit).ok().filter(|limit| *limit > 0),
            seen: 0,
            taken: 0,
        }
    }
}

///
/// Admit
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Admit {
    Skip,
    Take,
    Done,
}

///
/// Window
///
/// Running skip/limit state for one ordered walk.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct Window {
    skip: usize,
    limit: Option<usize>,
    seen: usize,
    taken: usize,
}

impl Window {
    /// Offer the next candidate in walk order.
    pub(crate) fn admit(&mut self) -> Admit {
        if self.is_full() {
            return Admit::Done;
        }

        if self.seen < self.skip {
            self.seen += 1;
            return Admit::Skip;
        }

        self.taken += 1;
        Admit::Take
    }

    pub(crate) fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.taken >= limit)
    }

    /// Apply the window to an already ordered list.
    pub(crate) fn apply<T>(mut self, items: Vec<T>) -> Vec<T> {
        let mut out = Vec::new();

        for item in items {
            match self.admit() {
                Admit::Skip => {}
                Admit::Take => out.push(item),
                Admit::Done => break,
            }
        }

        out
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn run(options: QueryOptions) -> Vec<u32> {
        options.window().apply((1..=10).collect())
    }

    #[test]
    fn defaults_take_everything() {
        assert_eq!(run(QueryOptions::new()), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn skip_then_limit_selects_a_slice() {
        assert_eq!(run(QueryOptions::new().skip(2).limit(3)), vec![3, 4, 5]);
    }

    #[test]
    fn non_positive_bounds_are_ignored() {
        assert_eq!(run(QueryOptions::new().skip(-3).limit(-1)).len(), 10);
        assert_eq!(run(QueryOptions::new().limit(0)).len(), 10);
    }

    #[test]
    fn skip_past_the_end_is_empty() {
        assert!(run(QueryOptions::new().skip(200)).is_empty());
    }
}
