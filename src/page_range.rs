use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Offending pages spelled out in an `OutOfRange` message before the rest
/// are summarized as a count.
pub const MAX_LISTED_PAGES: usize = 1_000;

static RANGE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s*-\s*([0-9]+)\s*$").expect("range pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageSelectionError {
    #[error("Page expression is missing or blank")]
    InvalidInput,

    #[error("Invalid page range: \"{segment}\"")]
    InvalidRange { segment: String },

    #[error("Invalid page number: \"{segment}\"")]
    InvalidPageNumber { segment: String },

    #[error(
        "Page(s) out of range (document has {total} pages): {}{}",
        join_pages(.pages),
        more_pages(.unlisted)
    )]
    OutOfRange {
        pages: Vec<u32>,
        total: u32,
        unlisted: u64,
    },
}

/// An ascending, duplicate-free set of 1-based page numbers.
///
/// Held as sorted, disjoint, non-adjacent runs, so `"1-4000000000"` costs
/// one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet(Vec<RangeInclusive<u32>>);

impl PageSet {
    /// Parse a page expression like "2-5, 8, 10-12"
    pub fn parse(expr: &str) -> Result<Self, PageSelectionError> {
        parse_page_expression(expr)
    }

    /// Check every page against the document's page count
    pub fn validate(&self, total_pages: u32) -> Result<(), PageSelectionError> {
        validate_page_set(self, total_pages)
    }

    fn from_runs(mut runs: Vec<RangeInclusive<u32>>) -> Self {
        runs.sort_by_key(|run| *run.start());

        let mut merged: Vec<RangeInclusive<u32>> = Vec::with_capacity(runs.len());
        for run in runs {
            match merged.last_mut() {
                Some(last) if *run.start() <= last.end().saturating_add(1) => {
                    if run.end() > last.end() {
                        *last = *last.start()..=*run.end();
                    }
                }
                _ => merged.push(run),
            }
        }

        PageSet(merged)
    }

    pub fn runs(&self) -> &[RangeInclusive<u32>] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().flat_map(|run| run.clone())
    }

    pub fn len(&self) -> u64 {
        self.0
            .iter()
            .map(|run| u64::from(run.end() - run.start()) + 1)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

impl FromStr for PageSet {
    type Err = PageSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_page_expression(s)
    }
}

impl FromIterator<u32> for PageSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        PageSet::from_runs(iter.into_iter().map(|page| page..=page).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Single(u32),
    Range { start: u32, end: u32 },
}

impl Segment {
    /// Parse one trimmed, comma-free segment: either "7" or "2-5"
    fn parse(segment: &str) -> Result<Self, PageSelectionError> {
        if let Some(caps) = RANGE_SEGMENT.captures(segment) {
            let invalid_range = || PageSelectionError::InvalidRange {
                segment: segment.to_string(),
            };

            // Digits that overflow u32 can't be a real page either way
            let start: u32 = caps[1].parse().map_err(|_| invalid_range())?;
            let end: u32 = caps[2].parse().map_err(|_| invalid_range())?;

            if start < 1 || end < start {
                return Err(invalid_range());
            }

            return Ok(Segment::Range { start, end });
        }

        let invalid_number = || PageSelectionError::InvalidPageNumber {
            segment: segment.to_string(),
        };

        // `u32::from_str` tolerates a leading '+', which is not a page number
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid_number());
        }

        match segment.parse::<u32>() {
            Ok(page) if page >= 1 => Ok(Segment::Single(page)),
            _ => Err(invalid_number()),
        }
    }

    fn run(self) -> RangeInclusive<u32> {
        match self {
            Segment::Single(page) => page..=page,
            Segment::Range { start, end } => start..=end,
        }
    }
}

/// Parse a comma-separated page expression into an ascending set of pages.
///
/// The first invalid segment aborts parsing; no partial set is returned.
pub fn parse_page_expression(expr: &str) -> Result<PageSet, PageSelectionError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(PageSelectionError::InvalidInput);
    }

    let runs = expr
        .split(',')
        .map(|segment| Segment::parse(segment.trim()).map(Segment::run))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PageSet::from_runs(runs))
}

/// Ensure every page exists in a document with `total_pages` pages.
///
/// Reports all offending pages in ascending order. Past
/// `MAX_LISTED_PAGES` only their count is kept.
pub fn validate_page_set(pages: &PageSet, total_pages: u32) -> Result<(), PageSelectionError> {
    let mut offending: Vec<RangeInclusive<u32>> = Vec::new();
    for run in pages.runs() {
        if *run.start() == 0 {
            offending.push(0..=0);
        }
        if *run.end() > total_pages {
            offending.push((*run.start()).max(total_pages + 1)..=*run.end());
        }
    }

    if offending.is_empty() {
        return Ok(());
    }

    let offending = PageSet::from_runs(offending);
    let listed: Vec<u32> = offending.iter().take(MAX_LISTED_PAGES).collect();
    Err(PageSelectionError::OutOfRange {
        unlisted: offending.len() - listed.len() as u64,
        pages: listed,
        total: total_pages,
    })
}

fn join_pages(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn more_pages(unlisted: &u64) -> String {
    if *unlisted == 0 {
        String::new()
    } else {
        format!(" and {} more", unlisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn pages(expr: &str) -> Vec<u32> {
        parse_page_expression(expr).unwrap().to_vec()
    }

    #[test]
    fn test_single_page() {
        assert_eq!(pages("3"), vec![3]);
    }

    #[test]
    fn test_page_range() {
        assert_eq!(pages("2-5"), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(pages("2-5,8,10-12"), vec![2, 3, 4, 5, 8, 10, 11, 12]);
    }

    #[test]
    fn test_whitespace_everywhere() {
        assert_eq!(pages("  2 - 5 ,  8 ,10-  12 "), vec![2, 3, 4, 5, 8, 10, 11, 12]);
    }

    #[test]
    fn test_overlap_collapses() {
        assert_eq!(pages("2-4,3-5"), vec![2, 3, 4, 5]);
        assert_eq!(pages("7,7,1-2,2"), vec![1, 2, 7]);
    }

    #[test]
    fn test_out_of_order_input_sorted() {
        assert_eq!(pages("10,3-4,1"), vec![1, 3, 4, 10]);
    }

    #[test]
    fn test_single_page_range() {
        assert_eq!(pages("4-4"), vec![4]);
    }

    #[test]
    fn test_reverse_range_rejected() {
        let err = parse_page_expression("5-3").unwrap_err();
        assert_eq!(
            err,
            PageSelectionError::InvalidRange {
                segment: "5-3".to_string()
            }
        );
        assert_eq!(err.to_string(), "Invalid page range: \"5-3\"");
    }

    #[test]
    fn test_range_starting_at_zero_rejected() {
        assert!(matches!(
            parse_page_expression("0-3"),
            Err(PageSelectionError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_page_zero_rejected() {
        assert_eq!(
            parse_page_expression("0").unwrap_err(),
            PageSelectionError::InvalidPageNumber {
                segment: "0".to_string()
            }
        );
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = parse_page_expression("abc").unwrap_err();
        assert_eq!(err.to_string(), "Invalid page number: \"abc\"");
    }

    #[test]
    fn test_signs_and_fragments_rejected() {
        for expr in ["-3", "3-", "+3", "1.5", "2-5-7", "1,,2", "1,"] {
            assert!(
                matches!(
                    parse_page_expression(expr),
                    Err(PageSelectionError::InvalidPageNumber { .. })
                ),
                "{expr:?} should be an invalid page number"
            );
        }
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(
            parse_page_expression("").unwrap_err(),
            PageSelectionError::InvalidInput
        );
        assert_eq!(
            parse_page_expression("   ").unwrap_err(),
            PageSelectionError::InvalidInput
        );
    }

    #[test]
    fn test_first_bad_segment_reported() {
        let err = parse_page_expression("1-2, x, 9-3").unwrap_err();
        assert_eq!(
            err,
            PageSelectionError::InvalidPageNumber {
                segment: "x".to_string()
            }
        );
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            parse_page_expression("99999999999"),
            Err(PageSelectionError::InvalidPageNumber { .. })
        ));
        assert!(matches!(
            parse_page_expression("1-99999999999"),
            Err(PageSelectionError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_non_ascii_digits_rejected() {
        for expr in ["١", "١-٣", "２-３"] {
            assert_eq!(
                parse_page_expression(expr).unwrap_err(),
                PageSelectionError::InvalidPageNumber {
                    segment: expr.to_string()
                }
            );
        }
    }

    #[test]
    fn test_wide_range_is_cheap() {
        let set = parse_page_expression("1-4000000000, 7").unwrap();
        assert_eq!(set.len(), 4_000_000_000);
        assert_eq!(set.runs(), &[1..=4_000_000_000]);
        assert_eq!(set.iter().take(3).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_runs_merge() {
        let set = parse_page_expression("5-6, 1-2, 3, 9").unwrap();
        assert_eq!(set.runs(), &[1..=3, 5..=6, 9..=9]);
        assert_eq!(set, [9, 6, 5, 3, 2, 1].into_iter().collect::<PageSet>());
    }

    #[test]
    fn test_idempotent() {
        let expr = "9, 2-4, 3";
        assert_eq!(
            parse_page_expression(expr).unwrap(),
            parse_page_expression(expr).unwrap()
        );
    }

    #[test]
    fn test_from_str() {
        let set: PageSet = "1-3".parse().unwrap();
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
        assert_eq!(set.iter().nth(1), Some(2));
    }

    #[test]
    fn test_validate_reports_out_of_range() {
        let set: PageSet = [1, 5, 9].into_iter().collect();
        let err = validate_page_set(&set, 6).unwrap_err();
        assert_eq!(
            err,
            PageSelectionError::OutOfRange {
                pages: vec![9],
                total: 6,
                unlisted: 0
            }
        );
    }

    #[test]
    fn test_validate_lists_every_offender() {
        let set = parse_page_expression("1, 9, 4-7").unwrap();
        let err = set.validate(5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Page(s) out of range (document has 5 pages): 6, 7, 9"
        );
    }

    #[test]
    fn test_wide_range_is_out_of_range() {
        let set = parse_page_expression("1-100001").unwrap();
        let Err(PageSelectionError::OutOfRange {
            pages,
            total,
            unlisted,
        }) = validate_page_set(&set, 5)
        else {
            panic!("expected OutOfRange");
        };

        assert_eq!(total, 5);
        assert_eq!(pages.len(), MAX_LISTED_PAGES);
        assert_eq!(pages.first(), Some(&6));
        assert_eq!(pages.last(), Some(&1005));
        assert_eq!(unlisted, 100_001 - 5 - 1_000);

        let message = validate_page_set(&set, 5).unwrap_err().to_string();
        assert!(message.starts_with("Page(s) out of range (document has 5 pages): 6, 7, 8"));
        assert!(message.ends_with("1004, 1005 and 98996 more"));
    }

    #[test]
    fn test_validate_catches_page_zero() {
        let set: PageSet = [0, 1].into_iter().collect();
        assert!(matches!(
            validate_page_set(&set, 3),
            Err(PageSelectionError::OutOfRange { ref pages, .. }) if pages == &vec![0]
        ));
    }

    #[test]
    fn test_validate_ok() {
        let set: PageSet = [1, 2, 3].into_iter().collect();
        assert!(validate_page_set(&set, 3).is_ok());
    }

    fn segment() -> impl Strategy<Value = (u32, u32)> {
        (1u32..200, 0u32..20).prop_map(|(start, len)| (start, start + len))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn parsed_pages_are_strictly_ascending_union(segments in prop::collection::vec(segment(), 1..8)) {
            let expr = segments
                .iter()
                .map(|(start, end)| {
                    if start == end {
                        start.to_string()
                    } else {
                        format!("{}-{}", start, end)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");

            let parsed = parse_page_expression(&expr).unwrap().to_vec();

            prop_assert!(parsed.windows(2).all(|w| w[0] < w[1]));

            let expected: BTreeSet<u32> = segments
                .iter()
                .flat_map(|&(start, end)| start..=end)
                .collect();
            prop_assert_eq!(parsed, expected.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn parsing_is_idempotent(expr in "[0-9, -]{0,20}") {
            prop_assert_eq!(parse_page_expression(&expr), parse_page_expression(&expr));
        }
    }
}
