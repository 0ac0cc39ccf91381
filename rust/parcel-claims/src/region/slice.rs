use crate::Owner;

/// A contiguous vertical run `[from, to)` inside a [`Slice`] with a single
/// owner. `None` defers to the nominal owner of the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Lowest block y (inclusive)
    pub from: i32,
    /// Highest block y (exclusive)
    pub to: i32,
    /// The owner of this run, if it differs from the region's
    pub owner: Option<Owner>,
}

/// A fixed vertical segment of a region, partitioned into one or more
/// [`Span`]s. The spans are sorted, contiguous, cover the whole slice and
/// never leave two neighbours with the same owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slice {
    from: i32,
    to: i32,
    spans: Vec<Span>,
}

impl Slice {
    /// A slice covering `[from, to)` with a single span
    pub fn new(from: i32, to: i32, owner: Option<Owner>) -> Self {
        Self {
            from,
            to,
            spans: vec![Span { from, to, owner }],
        }
    }

    /// Rebuild a slice from spans that are already known to partition it
    pub(crate) fn from_spans(from: i32, to: i32, spans: Vec<Span>) -> Self {
        let mut slice = Self { from, to, spans };
        slice.normalize();
        slice
    }

    /// Lowest block y (inclusive)
    pub fn from(&self) -> i32 {
        self.from
    }

    /// Highest block y (exclusive)
    pub fn to(&self) -> i32 {
        self.to
    }

    /// Whether `y` falls inside this slice
    pub fn contains(&self, y: i32) -> bool {
        self.from <= y && y < self.to
    }

    /// The spans of this slice, lowest first
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Whether the slice has been divided between several owners
    pub fn is_subdivided(&self) -> bool {
        self.spans.len() > 1
    }

    /// The span covering `y`, if `y` falls inside this slice
    pub fn span_at(&self, y: i32) -> Option<&Span> {
        if !self.contains(y) {
            return None;
        }
        self.spans.iter().find(|span| span.from <= y && y < span.to)
    }

    /// The spans that intersect `[from, to)`
    pub fn spans_in(&self, from: i32, to: i32) -> impl Iterator<Item = &Span> {
        self.spans
            .iter()
            .filter(move |span| span.from < to && from < span.to)
    }

    /// Give `[from, to)` to `owner`. The range must already be clipped to
    /// this slice.
    ///
    /// A `fresh` assignment overwrites every block in the range, splitting
    /// spans that straddle its edges. Otherwise existing subdivisions are
    /// preserved: only spans that lie wholly inside the range change hands
    /// and partly covered spans keep theirs. A slice that was never
    /// subdivided has nothing to preserve and is split as if `fresh`.
    pub(crate) fn assign(&mut self, from: i32, to: i32, owner: Option<Owner>, fresh: bool) {
        if fresh || !self.is_subdivided() {
            let mut spans = Vec::with_capacity(self.spans.len() + 2);
            let mut inserted = false;
            for span in &self.spans {
                if span.to <= from || to <= span.from {
                    spans.push(*span);
                    continue;
                }
                if span.from < from {
                    spans.push(Span {
                        from: span.from,
                        to: from,
                        owner: span.owner,
                    });
                }
                if !inserted {
                    spans.push(Span { from, to, owner });
                    inserted = true;
                }
                if to < span.to {
                    spans.push(Span {
                        from: to,
                        to: span.to,
                        owner: span.owner,
                    });
                }
            }
            self.spans = spans;
        } else {
            for span in self
                .spans
                .iter_mut()
                .filter(|span| from <= span.from && span.to <= to)
            {
                span.owner = owner;
            }
        }
        self.normalize();
    }

    /// Point every span at `owner`, collapsing the slice to a single span
    pub(crate) fn reset(&mut self, owner: Option<Owner>) {
        self.spans = vec![Span {
            from: self.from,
            to: self.to,
            owner,
        }];
    }

    /// Hand every span owned by `owner` back to the nominal owner. Returns
    /// whether anything changed.
    pub(crate) fn release(&mut self, owner: &Owner) -> bool {
        let mut changed = false;
        for span in self.spans.iter_mut() {
            if span.owner.as_ref() == Some(owner) {
                span.owner = None;
                changed = true;
            }
        }
        if changed {
            self.normalize();
        }
        changed
    }

    fn normalize(&mut self) {
        let mut merged: Vec<Span> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            if span.from >= span.to {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.owner == span.owner && last.to == span.from => {
                    last.to = span.to;
                }
                _ => merged.push(span),
            }
        }
        self.spans = merged;
    }
}

#[cfg(test)]
mod tests {
    use crate::{Owner, PlayerId, Slice, Span};

    fn owners(slice: &Slice) -> Vec<(i32, i32, Option<Owner>)> {
        slice
            .spans()
            .iter()
            .map(|span| (span.from, span.to, span.owner))
            .collect()
    }

    #[test]
    fn it_splits_spans_on_a_fresh_assignment() {
        let alice = Some(Owner::from(PlayerId::new()));
        let bob = Some(Owner::from(PlayerId::new()));
        let mut slice = Slice::new(0, 16, alice);

        slice.assign(4, 8, bob, true);

        assert_eq!(
            owners(&slice),
            vec![(0, 4, alice), (4, 8, bob), (8, 16, alice)]
        );
        assert_eq!(slice.span_at(7).map(|span| span.owner), Some(bob));
        assert_eq!(slice.span_at(16), None);
    }

    #[test]
    fn it_only_reassigns_whole_spans_otherwise() {
        let alice = Some(Owner::from(PlayerId::new()));
        let bob = Some(Owner::from(PlayerId::new()));
        let carol = Some(Owner::from(PlayerId::new()));
        let mut slice = Slice::new(0, 16, alice);
        slice.assign(4, 8, bob, true);

        slice.assign(2, 10, carol, false);

        assert_eq!(
            owners(&slice),
            vec![(0, 4, alice), (4, 8, carol), (8, 16, alice)]
        );
    }

    #[test]
    fn it_splits_an_undivided_slice_even_when_not_fresh() {
        let alice = Some(Owner::from(PlayerId::new()));
        let bob = Some(Owner::from(PlayerId::new()));
        let mut slice = Slice::new(0, 16, alice);

        slice.assign(0, 8, bob, false);

        assert_eq!(owners(&slice), vec![(0, 8, bob), (8, 16, alice)]);
    }

    #[test]
    fn it_merges_neighbours_with_the_same_owner() {
        let alice = Some(Owner::from(PlayerId::new()));
        let bob = Some(Owner::from(PlayerId::new()));
        let mut slice = Slice::new(0, 16, alice);
        slice.assign(4, 8, bob, true);

        slice.assign(4, 8, alice, true);

        assert_eq!(slice.spans(), &[Span { from: 0, to: 16, owner: alice }]);
        assert!(!slice.is_subdivided());
    }
}
