// End-to-end scenarios: CSV export → standardized dataset → views

use serde_json::json;
use std::fs;
use transaction_explorer::{
    load_dataset, render, render_json, select_dataset, standardize_file, AppState, ChartKey,
    DatasetStore, Display, Locale, PatternRegistry, RawTable, SortController, StatsReport,
    TableInput, TimeBasis, VaultFilter, View,
};

fn table(value: serde_json::Value) -> RawTable {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_two_week_scenario() {
    let t = table(json!([
        ["date", "amount"],
        ["2024-01-01T10:00", "5"],
        ["2024-01-08T10:00", "7"]
    ]));

    let report = StatsReport::compute(&t, TimeBasis::Utc, Locale::En);

    let weekly = report.series(ChartKey::WeeklyAverage).unwrap();
    assert_eq!(weekly.labels, vec!["2024-01-01", "2024-01-08"]);
    assert_eq!(weekly.values, vec![5.0, 7.0]);
    assert_eq!(report.series(ChartKey::Cumulative).unwrap().values, vec![5.0, 12.0]);
}

#[test]
fn test_one_record_per_hour_scenario() {
    let mut rows = vec![json!(["date", "amount"])];
    for hour in 0..24 {
        rows.push(json!([format!("2024-03-06 {:02}:15", hour), 1]));
    }
    let t = table(serde_json::Value::Array(rows));

    let report = StatsReport::compute(&t, TimeBasis::Utc, Locale::Fr);

    let hourly = report.series(ChartKey::Hourly).unwrap();
    assert!(hourly.values.iter().all(|v| *v == 1.0));

    // 2024-03-06 is a Wednesday
    let weekday = report.series(ChartKey::Weekday).unwrap();
    assert_eq!(weekday.labels[2], "Mercredi");
    assert_eq!(weekday.values, vec![0.0, 0.0, 24.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_renderer_edge_inputs() {
    assert!(render_json(json!([])).is_empty());

    let short = render_json(json!([["a", "b", "c"], [1, 2]]));
    assert_eq!(short.body[0], vec!["1", "2", ""]);
    assert_eq!(short.warnings.len(), 1);

    let missing = render_json(json!([{"a": 0, "b": false}, {"a": ""}]));
    assert_eq!(missing.body, vec![vec!["0", "false"], vec!["", ""]]);
    assert_eq!(missing.warnings.len(), 1);
}

#[test]
fn test_sort_cases() {
    let mut numeric = render(&TableInput::Rows(table(json!([["n"], ["10"], ["2"], ["33"]]))));
    SortController::attach(&numeric).toggle(&mut numeric, 0);
    assert_eq!(numeric.column(0), vec!["2", "10", "33"]);

    let mut text = render(&TableInput::Rows(table(json!([["s"], ["b"], ["a"], ["C"]]))));
    SortController::attach(&text).toggle(&mut text, 0);
    assert_eq!(text.column(0), vec!["C", "a", "b"]);
}

#[test]
fn test_csv_export_to_every_view() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = dir.path().join("patterns");
    let data = dir.path().join("datas");
    fs::create_dir_all(&patterns).unwrap();
    fs::create_dir_all(&data).unwrap();

    fs::write(
        patterns.join("comchain.json"),
        json!({
            "name": "comchain",
            "horizontalMapping": {
                "Date": "when",
                "Montant": "amount",
                "Expéditeur": "from",
                "Destinataire": "to"
            },
            "verticalMappingRules": {
                "keywords": {"Professionnel": ["SARL"], "Particulier": ["M."]}
            }
        })
        .to_string(),
    )
    .unwrap();

    let export = dir.path().join("march.csv");
    fs::write(
        &export,
        "when,amount,from,to,memo\n\
         2024-03-04 09:00,12.5,M. Martin,Epicerie SARL,bread\n\
         2024-03-05 18:30,40,Epicerie SARL,Moulin SARL,flour\n\
         2024-03-11 12:00,8,Vault,Epicerie SARL,\n",
    )
    .unwrap();

    let registry = PatternRegistry::from_dir(&patterns).unwrap();
    let outcome = standardize_file(&export, &registry, &data).unwrap();
    assert_eq!(outcome.output, "march_standardized.json");
    assert_eq!(outcome.pattern, "comchain");
    assert_eq!(outcome.rows, 3);

    let store = DatasetStore::new(&data);
    let datasets = store.list().unwrap();
    let name = select_dataset(&datasets, "1").unwrap();

    let (state, ticket) = AppState::new().begin_load();
    let state = state.complete_load(ticket, load_dataset(&store, &name).unwrap());

    match state.display(View::Standardized, TimeBasis::Utc, Locale::En) {
        Display::Table(grid) => {
            assert_eq!(
                grid.header,
                vec!["Date", "Montant", "Expéditeur", "Destinataire", "Type_Expéditeur", "Type_Destinataire"]
            );
            assert_eq!(grid.body[0][4..], ["U", "P"]);
            // unknown sender falls back to vault
            assert_eq!(grid.body[2][4..], ["C", "P"]);
        }
        other => panic!("unexpected: {other:?}"),
    }

    match state.display(View::New, TimeBasis::Utc, Locale::En) {
        Display::Table(grid) => {
            assert_eq!(grid.header[0], "Professionnel");
            assert_eq!(grid.body[0], vec!["Moulin SARL", "40", "0", "0", "0", "40"]);
            // Epicerie: 13 B2B received (ceil 12.5) + 8 reconversion
            assert_eq!(grid.body[1], vec!["Epicerie SARL", "13", "40", "0", "8", "21"]);
        }
        other => panic!("unexpected: {other:?}"),
    }

    match state.display(View::Stats, TimeBasis::Utc, Locale::En) {
        Display::Stats(report) => {
            assert_eq!(report.valid_records, 3);
            assert_eq!(report.series(ChartKey::Cumulative).unwrap().values, vec![12.5, 52.5, 60.5]);
        }
        other => panic!("unexpected: {other:?}"),
    }

    let filtered = state
        .with_filter(VaultFilter { ignore_sender: true, ignore_recipient: false })
        .unwrap();
    match filtered.display(View::Stats, TimeBasis::Utc, Locale::En) {
        Display::Stats(report) => assert_eq!(report.valid_records, 2),
        other => panic!("unexpected: {other:?}"),
    }
}
