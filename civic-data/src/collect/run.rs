use civic_core::RawRecord;

/// Progress of one collection towards its target record count.
///
/// The accumulated records never exceed the target: pages that overshoot
/// are truncated on absorption.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRun {
    target: u64,
    records: Vec<RawRecord>,
}

impl CollectionRun {
    /// Start an empty run aiming for `target` records.
    pub fn new(target: u64) -> Self {
        Self {
            target,
            records: Vec::new(),
        }
    }

    /// Records the run aims to collect.
    pub const fn target(&self) -> u64 {
        self.target
    }

    /// Records collected so far.
    pub fn collected(&self) -> u64 {
        u64::try_from(self.records.len()).unwrap_or(u64::MAX)
    }

    /// Records still missing.
    pub fn remaining(&self) -> u64 {
        self.target.saturating_sub(self.collected())
    }

    /// Whether the target has been reached.
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Append a page, dropping anything beyond the target.
    ///
    /// Returns the number of records kept.
    pub fn absorb(&mut self, mut page: Vec<RawRecord>) -> usize {
        let room = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        page.truncate(room);
        let kept = page.len();
        self.records.append(&mut page);
        kept
    }

    /// Hand over the accumulated records.
    pub fn into_records(self) -> Vec<RawRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::test_support::text_record;
    use rstest::rstest;

    fn page(len: usize) -> Vec<RawRecord> {
        (0..len)
            .map(|i| text_record([("id", i.to_string().as_str())]))
            .collect()
    }

    #[rstest]
    fn absorbs_until_complete() {
        let mut run = CollectionRun::new(5);
        assert_eq!(run.absorb(page(3)), 3);
        assert_eq!((run.collected(), run.remaining()), (3, 2));
        assert!(!run.is_complete());
        assert_eq!(run.absorb(page(2)), 2);
        assert!(run.is_complete());
    }

    #[rstest]
    fn overshooting_pages_are_truncated() {
        let mut run = CollectionRun::new(4);
        run.absorb(page(3));
        assert_eq!(run.absorb(page(3)), 1);
        assert_eq!(run.collected(), 4);
        assert_eq!(run.into_records().len(), 4);
    }

    #[rstest]
    fn zero_target_is_immediately_complete() {
        let mut run = CollectionRun::new(0);
        assert!(run.is_complete());
        assert_eq!(run.absorb(page(2)), 0);
        assert!(run.into_records().is_empty());
    }
}
