use std::fs;
use std::path::Path;

use iati_tools::ToolError;
use iati_tools::consolidate::{ConsolidatedRow, ConsolidatedTable, ConsolidationSettings};
use iati_tools::io::{excel_read, excel_write, json};
use iati_tools::model::{CellValue, Corpus, Sheet, Workbook};
use iati_tools::pipeline::{self, RunOptions};
use tempfile::tempdir;

const IDENTIFIER: &str = "iati-identifier";
const DATE: &str = "activity-date/0/@iso-date";

fn row(cells: &[&str]) -> Vec<CellValue> {
    cells.iter().map(|cell| CellValue::from(*cell)).collect()
}

fn template_workbook() -> Workbook {
    Workbook::with_sheets(
        "template.xlsx",
        vec![
            Sheet::from_rows("#Guide", vec![row(&["read me"])]),
            Sheet::from_rows(
                "Activity Level",
                vec![row(&[IDENTIFIER, DATE, "#note"]), row(&["doc", "doc", "doc"])],
            ),
        ],
    )
}

fn report_corpus() -> Corpus {
    let first = Workbook::with_sheets(
        "a.xlsx",
        vec![
            Sheet::from_rows(
                "Activity Level",
                vec![
                    row(&[IDENTIFIER, "activty-date", "title", IDENTIFIER]),
                    row(&["doc", "doc", "doc", "doc"]),
                    row(&["AA-1", "2016-01-01", "First", "WRONG-1"]),
                    row(&["AA-2", "2016-02-01", "Second", "WRONG-2"]),
                ],
            ),
            Sheet::from_rows("Notes", vec![row(&["scratch"])]),
        ],
    );
    let second = Workbook::with_sheets(
        "b.xlsx",
        vec![Sheet::from_rows(
            "Activity Level",
            vec![
                row(&[DATE, IDENTIFIER, "title", "budget"]),
                row(&["doc", "doc", "doc", "doc"]),
                row(&["2016-03-01", "BB-1", "Third", "10"]),
                row(&["2016-04-01", "", "Orphan", "20"]),
            ],
        )],
    );
    vec![first, second].into_iter().collect()
}

fn write_json(path: &Path, value: serde_json::Value) {
    fs::write(path, serde_json::to_string_pretty(&value).expect("JSON serialised"))
        .expect("JSON written");
}

#[test]
fn exported_tables_reload_with_same_columns_and_values() {
    let table = ConsolidatedTable {
        sheet_name: "Activity Level".into(),
        columns: vec![IDENTIFIER.into(), DATE.into(), "budget".into()],
        rows: vec![
            ConsolidatedRow {
                source: "a.xlsx".into(),
                cells: vec!["AA-1".into(), "2016-01-01".into(), CellValue::Number(12.5)],
            },
            ConsolidatedRow {
                source: "b.xlsx".into(),
                cells: vec!["BB-1".into(), CellValue::Empty, CellValue::Bool(true)],
            },
        ],
    };

    let temp_dir = tempdir().expect("temporary directory");
    let output = temp_dir.path().join("output.xlsx");
    excel_write::write_consolidated(&output, std::slice::from_ref(&table), None)
        .expect("export written");

    let restored = excel_read::read_tables(&output).expect("export read");
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].sheet_name, table.sheet_name);
    assert_eq!(restored[0].columns, table.columns);
    let cells: Vec<Vec<CellValue>> = restored[0].rows.iter().map(|row| row.cells.clone()).collect();
    let expected: Vec<Vec<CellValue>> = table.rows.iter().map(|row| row.cells.clone()).collect();
    assert_eq!(cells, expected);
}

#[test]
fn export_refuses_to_overwrite() {
    let temp_dir = tempdir().expect("temporary directory");
    let output = temp_dir.path().join("output.xlsx");
    fs::write(&output, b"existing").expect("placeholder written");

    let result = excel_write::write_consolidated(&output, &[], None);

    assert!(matches!(result, Err(ToolError::OutputExists(_))));
    assert_eq!(fs::read(&output).expect("placeholder read"), b"existing");
}

#[test]
fn unreadable_corpus_file_aborts_the_load() {
    let temp_dir = tempdir().expect("temporary directory");
    let raw = temp_dir.path().join("raw");
    excel_write::save_corpus(&report_corpus(), &raw).expect("corpus saved");
    fs::write(raw.join("notes.txt"), "not a workbook").expect("stray file written");

    match excel_read::load_corpus(&raw) {
        Err(ToolError::Load { path, .. }) => assert!(path.ends_with("notes.txt")),
        other => panic!("expected load error, got {other:?}"),
    }
}

#[test]
fn saved_corpus_reloads_unchanged() {
    let temp_dir = tempdir().expect("temporary directory");
    let raw = temp_dir.path().join("raw");
    let corpus = report_corpus();
    excel_write::save_corpus(&corpus, &raw).expect("corpus saved");

    let restored = excel_read::load_corpus(&raw).expect("corpus loaded");
    assert_eq!(restored, corpus);

    let again = excel_write::save_corpus(&corpus, &raw);
    assert!(matches!(again, Err(ToolError::OutputExists(_))));
}

#[test]
fn template_schema_persists_and_reloads() {
    let temp_dir = tempdir().expect("temporary directory");
    let template_dir = temp_dir.path().join("meta");
    let corpus: Corpus = std::iter::once(template_workbook()).collect();
    excel_write::save_corpus(&corpus, &template_dir).expect("template saved");

    let schema_path = temp_dir.path().join("template_column_map.json");
    let schema =
        pipeline::register_template(&template_dir.join("template.xlsx"), &schema_path)
            .expect("template registered");

    assert_eq!(schema.sheet_names(), vec!["Activity Level"]);
    assert_eq!(
        schema.sheet("Activity Level").expect("sheet").columns,
        vec![IDENTIFIER, DATE]
    );

    let persisted = fs::read_to_string(&schema_path).expect("schema read");
    assert!(persisted.contains("\n  \"Activity Level\""));
    assert_eq!(json::read_template(&schema_path).expect("schema parsed"), schema);
    assert_eq!(pipeline::load_template(&schema_path).expect("schema loaded"), schema);
}

#[test]
fn pipeline_cleans_consolidates_and_exports() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();

    let raw = root.join("raw");
    excel_write::save_corpus(&report_corpus(), &raw).expect("corpus saved");
    let meta = root.join("meta");
    excel_write::save_corpus(&std::iter::once(template_workbook()).collect(), &meta)
        .expect("template saved");

    let mapping = root.join("file-mapping.json");
    write_json(
        &mapping,
        serde_json::json!({"a.xlsx": "Nigeria", "b.xlsx": "Kenya"}),
    );
    let alterations = root.join("alterations.json");
    write_json(
        &alterations,
        serde_json::json!({
            "substitutions": {"columns": {"activty-date": DATE}},
            "column_deduplications": {"Activity Level": {"D": IDENTIFIER}}
        }),
    );

    let options = RunOptions {
        raw_dir: raw,
        template: meta.join("template.xlsx"),
        schema_out: Some(root.join("template_column_map.json")),
        mapping,
        alterations,
        output: root.join("output.xlsx"),
        snapshot_dir: Some(root.join("intermediate")),
        settings: ConsolidationSettings::default(),
        provenance_column: Some("country".into()),
    };

    let report = pipeline::run(&options).expect("pipeline run");

    assert_eq!(report.removed_sheets.iter().collect::<Vec<_>>(), vec!["Notes"]);
    assert_eq!(report.substitutions, 1);
    assert_eq!(report.blanked_columns, 1);
    assert_eq!(report.rows_per_sheet, vec![("Activity Level".to_string(), 3)]);
    assert!(root.join("template_column_map.json").exists());

    for stage in ["extra_sheets_removed", "headings_corrected", "duplicates_resolved"] {
        let snapshot = excel_read::read_workbook(&root.join("intermediate").join(stage).join("a.xlsx"))
            .expect("snapshot read");
        assert!(snapshot.sheet("Notes").is_none(), "{stage}");
    }

    let tables = excel_read::read_tables(&options.output).expect("output read");
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.columns, vec![IDENTIFIER, DATE, "country"]);
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(CellValue::to_string).collect())
        .collect();
    assert_eq!(
        rows,
        vec![
            vec!["AA-1", "2016-01-01", "Nigeria"],
            vec!["AA-2", "2016-02-01", "Nigeria"],
            vec!["BB-1", "2016-03-01", "Kenya"],
        ]
    );

    let rerun = pipeline::run(&options);
    assert!(matches!(rerun, Err(ToolError::OutputExists(_))));
}

#[test]
fn pipeline_rejects_mapping_that_misses_a_workbook() {
    let temp_dir = tempdir().expect("temporary directory");
    let root = temp_dir.path();

    let raw = root.join("raw");
    excel_write::save_corpus(&report_corpus(), &raw).expect("corpus saved");
    let schema = root.join("schema.json");
    write_json(&schema, serde_json::json!({"Activity Level": [IDENTIFIER, DATE]}));
    let mapping = root.join("file-mapping.json");
    write_json(&mapping, serde_json::json!({"a.xlsx": "Nigeria"}));
    let alterations = root.join("alterations.json");
    write_json(
        &alterations,
        serde_json::json!({"substitutions": {"columns": {}}, "column_deduplications": {}}),
    );

    let options = RunOptions {
        raw_dir: raw,
        template: schema,
        schema_out: None,
        mapping,
        alterations,
        output: root.join("output.xlsx"),
        snapshot_dir: None,
        settings: ConsolidationSettings::default(),
        provenance_column: None,
    };

    match pipeline::run(&options) {
        Err(ToolError::SchemaMismatch { missing, unexpected }) => {
            assert_eq!(missing, vec!["b.xlsx"]);
            assert!(unexpected.is_empty());
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    assert!(!options.output.exists());
}

#[test]
fn diagnose_reports_against_template_sheets() {
    let temp_dir = tempdir().expect("temporary directory");
    let raw = temp_dir.path().join("raw");
    excel_write::save_corpus(&report_corpus(), &raw).expect("corpus saved");

    let diagnosis = pipeline::diagnose(&raw, None).expect("diagnosed");

    assert_eq!(
        diagnosis.non_standard_sheets.iter().collect::<Vec<_>>(),
        vec!["Notes"]
    );
    assert_eq!(diagnosis.column_counts["a.xlsx"], vec![4, 1]);
    assert_eq!(diagnosis.column_counts["b.xlsx"], vec![4]);
}
