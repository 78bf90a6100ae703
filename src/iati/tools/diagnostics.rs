use std::collections::{BTreeMap, BTreeSet};

use crate::iati::tools::model::{Corpus, Sheet};

/// Sheet names that are not part of the expected layout.
///
/// Without a reference list the expected set is the sheets shared by every
/// workbook. A reference list replaces that intersection; the observed set is
/// always the union over the corpus. An empty corpus yields an empty result.
pub fn non_standard_sheet_names(corpus: &Corpus, reference: Option<&[String]>) -> BTreeSet<String> {
    let per_workbook: Vec<BTreeSet<String>> = corpus
        .workbooks()
        .map(|workbook| workbook.sheet_names().map(str::to_string).collect())
        .collect();

    let union: BTreeSet<String> = per_workbook.iter().flatten().cloned().collect();

    let expected: BTreeSet<String> = match reference {
        Some(names) => names.iter().cloned().collect(),
        None => intersection(&per_workbook),
    };

    union.difference(&expected).cloned().collect()
}

fn intersection(sets: &[BTreeSet<String>]) -> BTreeSet<String> {
    let Some((first, rest)) = sets.split_first() else {
        return BTreeSet::new();
    };
    rest.iter().fold(first.clone(), |acc, set| {
        acc.intersection(set).cloned().collect()
    })
}

/// Header width of each sheet, per workbook, in sheet order.
pub fn column_counts(corpus: &Corpus) -> BTreeMap<String, Vec<usize>> {
    corpus
        .workbooks()
        .map(|workbook| {
            let counts = workbook.sheets().iter().map(Sheet::header_width).collect();
            (workbook.key().to_string(), counts)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iati::tools::model::Workbook;

    fn workbook(key: &str, sheets: &[&str]) -> Workbook {
        Workbook::with_sheets(key, sheets.iter().map(|name| Sheet::new(*name)).collect())
    }

    #[test]
    fn identical_layouts_report_nothing() {
        let corpus: Corpus = vec![
            workbook("a.xlsx", &["Activity Level", "Transactions"]),
            workbook("b.xlsx", &["Transactions", "Activity Level"]),
        ]
        .into_iter()
        .collect();

        assert!(non_standard_sheet_names(&corpus, None).is_empty());
    }

    #[test]
    fn sheets_missing_from_any_workbook_are_reported() {
        let corpus: Corpus = vec![
            workbook("a.xlsx", &["Activity Level"]),
            workbook("b.xlsx", &["Activity Level", "Notes"]),
        ]
        .into_iter()
        .collect();

        let result = non_standard_sheet_names(&corpus, None);
        assert_eq!(result, BTreeSet::from(["Notes".to_string()]));
    }

    #[test]
    fn reference_list_replaces_the_intersection() {
        let corpus: Corpus = vec![
            workbook("a.xlsx", &["Activity Level", "Scratch"]),
            workbook("b.xlsx", &["Activity Level", "Scratch"]),
        ]
        .into_iter()
        .collect();

        let reference = vec!["Activity Level".to_string(), "Transactions".to_string()];
        let result = non_standard_sheet_names(&corpus, Some(&reference));
        assert_eq!(result, BTreeSet::from(["Scratch".to_string()]));

        // Empty exactly when every workbook's sheets are a subset of the expected set.
        let reference = vec!["Activity Level".to_string(), "Scratch".to_string()];
        assert!(non_standard_sheet_names(&corpus, Some(&reference)).is_empty());
    }

    #[test]
    fn degenerate_corpora_do_not_fail() {
        assert!(non_standard_sheet_names(&Corpus::new(), None).is_empty());

        let single: Corpus = std::iter::once(workbook("a.xlsx", &["Activity Level"])).collect();
        assert!(non_standard_sheet_names(&single, None).is_empty());
    }

    #[test]
    fn column_counts_follow_header_width() {
        let corpus: Corpus = std::iter::once(Workbook::with_sheets(
            "a.xlsx",
            vec![
                Sheet::from_rows("Activity Level", vec![vec!["a".into(), "b".into()]]),
                Sheet::new("Empty"),
            ],
        ))
        .collect();

        assert_eq!(column_counts(&corpus)["a.xlsx"], vec![2, 0]);
    }
}
