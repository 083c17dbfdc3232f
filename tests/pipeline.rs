use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parcel_reconciler::config::{ConfigKey, ConfigStore, Settings};
use parcel_reconciler::features::read_feature_collection;
use parcel_reconciler::prompt::Prompt;
use parcel_reconciler::{run, Error, OverwritePolicy, RunOutcome};
use serde_json::json;

const OWNERS_CSV: &str = "\
Bg Emplacement;Nom complet du proprietaire [BG];Commune
12345 A 7;DUPONT Jean, MARTIN Paul;Testville
12345 AB 12;DURAND Anne;Testville
12345A7;LEROY Marie;Testville
12345 C 99;ORPHAN Luc;Testville
";

const PARCELS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [2.35, 48.85]},
      "properties": {"id": "123450000A0007", "contenance": 512}
    },
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [2.36, 48.86]},
      "properties": {"id": "12345000AB0012"}
    },
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [2.37, 48.87]},
      "properties": {"id": "123450000B0001"}
    }
  ]
}"#;

/// Answers every question with the same reply and counts the questions.
struct Answer {
    reply: &'static str,
    asked: usize,
}

impl Answer {
    fn new(reply: &'static str) -> Self {
        Self { reply, asked: 0 }
    }
}

impl Prompt for Answer {
    fn ask(&mut self, _question: &str) -> io::Result<String> {
        self.asked += 1;
        Ok(self.reply.to_string())
    }
}

fn workspace(owners_csv: &str) -> (tempfile::TempDir, Settings) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("owners.csv"), owners_csv).unwrap();
    fs::write(root.join("parcels.geojson"), PARCELS_GEOJSON).unwrap();

    let mut settings = Settings::default();
    settings.paths.input_csv = root.join("owners.csv");
    settings.paths.input_geojson = root.join("parcels.geojson");
    settings.paths.output_geojson = root.join("out/parcels_owners.geojson");
    settings.paths.grouped_csv = root.join("out/grouped.csv");
    settings.paths.inconsistencies_csv = root.join("out/inconsistencies_csv.csv");
    settings.paths.inconsistencies_geojson = root.join("out/inconsistencies_json.csv");
    (dir, settings)
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn full_run_writes_every_output() {
    let (_dir, settings) = workspace(OWNERS_CSV);
    let mut confirm = Answer::new("n");

    let outcome = run(&settings, OverwritePolicy::Ask, &mut confirm).unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("run was cancelled");
    };

    assert_eq!(confirm.asked, 0);
    assert_eq!(summary.csv_rows, 4);
    assert_eq!(summary.parcels, 3);
    assert_eq!(summary.features, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.report.missing_owners, ["123450000B0001"]);
    assert_eq!(summary.report.missing_geometry, ["123450000C0099"]);

    let fc = read_feature_collection(&settings.paths.output_geojson).unwrap();
    let first = &fc.features[0];
    assert_eq!(
        first.property("Propriétaires"),
        Some(&json!("DUPONT Jean, MARTIN Paul, LEROY Marie"))
    );
    assert_eq!(first.property("Propriétaire 3"), Some(&json!("LEROY Marie")));
    assert_eq!(first.property("contenance"), Some(&json!(512)));
    assert!(first.geometry.is_some());
    assert_eq!(fc.features[2].property("Propriétaires"), None);

    assert_eq!(
        lines(&settings.paths.grouped_csv),
        [
            "Parcel ID;Owners",
            "123450000A0007;DUPONT Jean, MARTIN Paul, LEROY Marie",
            "12345000AB0012;DURAND Anne",
            "123450000C0099;ORPHAN Luc",
        ]
    );
    assert_eq!(
        lines(&settings.paths.inconsistencies_geojson),
        ["Parcel ID,Reason", "123450000B0001,No matching owner data"]
    );
    assert_eq!(
        lines(&settings.paths.inconsistencies_csv),
        ["Parcel ID,Reason", "123450000C0099,No matching owner data"]
    );
}

#[test]
fn output_is_pretty_and_keeps_accents() {
    let (_dir, settings) = workspace(OWNERS_CSV);
    run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("n")).unwrap();

    let text = fs::read_to_string(&settings.paths.output_geojson).unwrap();
    assert!(text.contains("\"Propriétaires\""));
    assert!(text.contains("\n    \"features\""));
}

#[test]
fn refusing_overwrite_leaves_output_untouched() {
    let (_dir, settings) = workspace(OWNERS_CSV);
    fs::create_dir_all(settings.paths.output_geojson.parent().unwrap()).unwrap();
    fs::write(&settings.paths.output_geojson, "previous").unwrap();

    let mut confirm = Answer::new("n");
    let outcome = run(&settings, OverwritePolicy::Ask, &mut confirm).unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(confirm.asked, 1);
    assert_eq!(fs::read_to_string(&settings.paths.output_geojson).unwrap(), "previous");
}

#[test]
fn accepting_overwrite_replaces_output() {
    let (_dir, settings) = workspace(OWNERS_CSV);
    fs::create_dir_all(settings.paths.output_geojson.parent().unwrap()).unwrap();
    fs::write(&settings.paths.output_geojson, "previous").unwrap();

    let outcome = run(&settings, OverwritePolicy::Ask, &mut Answer::new("yes")).unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert!(read_feature_collection(&settings.paths.output_geojson).is_ok());
}

#[test]
fn assume_yes_never_asks() {
    let (_dir, settings) = workspace(OWNERS_CSV);
    fs::create_dir_all(settings.paths.output_geojson.parent().unwrap()).unwrap();
    fs::write(&settings.paths.output_geojson, "previous").unwrap();

    let mut confirm = Answer::new("n");
    let outcome = run(&settings, OverwritePolicy::AssumeYes, &mut confirm).unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(confirm.asked, 0);
}

#[test]
fn rerun_on_own_output_is_stable() {
    let (_dir, mut settings) = workspace(OWNERS_CSV);
    run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap();
    let first = fs::read_to_string(&settings.paths.output_geojson).unwrap();

    let rerun_input: PathBuf = settings.paths.output_geojson.with_file_name("rerun_input.geojson");
    fs::write(&rerun_input, &first).unwrap();
    settings.paths.input_geojson = rerun_input;
    run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap();

    assert_eq!(fs::read_to_string(&settings.paths.output_geojson).unwrap(), first);
}

#[test]
fn malformed_id_aborts_but_keeps_no_geojson() {
    let csv = format!("{OWNERS_CSV}1234 A 7;BROKEN;Testville\n");
    let (_dir, settings) = workspace(&csv);

    let err = run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap_err();
    assert!(matches!(err, Error::MalformedIdentifier { ref raw } if raw == "1234 A 7"));
    assert!(!settings.paths.output_geojson.exists());
    assert!(!settings.paths.grouped_csv.exists());
}

#[test]
fn malformed_id_skipped_when_configured() {
    let csv = format!("{OWNERS_CSV}1234 A 7;BROKEN;Testville\n");
    let (_dir, settings) = workspace(&csv);
    let mut store = ConfigStore::in_memory(settings);
    store.set(ConfigKey::SkipMalformed, "true").unwrap();

    let outcome = run(store.settings(), OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("run was cancelled");
    };
    assert_eq!(summary.skipped, ["1234 A 7"]);
    assert_eq!(summary.processed, 2);
}

#[test]
fn missing_id_column_fails_before_any_output() {
    let (_dir, mut settings) = workspace(OWNERS_CSV);
    settings.options.id_csv_column = "Parcelle".to_string();

    let err = run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "Parcelle"));
    assert!(!settings.paths.grouped_csv.exists());
}

#[test]
fn unreadable_geojson_leaves_grouped_csv_behind() {
    let (_dir, mut settings) = workspace(OWNERS_CSV);
    settings.paths.input_geojson = settings.paths.input_geojson.with_file_name("absent.geojson");

    let err = run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
    assert!(settings.paths.grouped_csv.exists());
    assert!(!settings.paths.output_geojson.exists());
}

#[test]
fn individual_properties_can_be_disabled() {
    let (_dir, mut settings) = workspace(OWNERS_CSV);
    settings.options.individual_prop_name = String::new();
    run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap();

    let fc = read_feature_collection(&settings.paths.output_geojson).unwrap();
    assert!(fc.features[0].property("Propriétaires").is_some());
    assert_eq!(fc.features[0].property("Propriétaire 1"), None);
}

#[test]
fn no_inconsistency_files_when_everything_matches() {
    let csv = "\
Bg Emplacement;Nom complet du proprietaire [BG]
12345 A 7;A
12345 AB 12;B
12345 B 1;C
";
    let (_dir, settings) = workspace(csv);
    let outcome = run(&settings, OverwritePolicy::AssumeYes, &mut Answer::new("y")).unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("run was cancelled");
    };
    assert!(summary.report.is_empty());
    assert!(summary.inconsistency_files.is_empty());
    assert!(!settings.paths.inconsistencies_csv.exists());
    assert!(!settings.paths.inconsistencies_geojson.exists());
}
