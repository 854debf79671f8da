//! Integration tests for full merge runs on disk.

use arff_core::report::{report_file_name, ERROR_REPORT_PREFIX, RESULT_REPORT_PREFIX};
use arff_core::{
    run_merge, scan_header, validate_files, Error, MergeConfig, MergeJob, NoticeLevel,
    RecordingNotifier,
};
use chrono::{Duration, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCHEMA: &str = concat!(
    "@relation first\n\n",
    "@attribute a numeric\n@attribute b numeric\n@attribute class {x,y}\n\n",
    "@data\n"
);

fn write_arff(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn with_rows(rows: &[&str]) -> String {
    let mut content = SCHEMA.to_string();
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    content
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect()
}

fn data_section(text: &str) -> Vec<String> {
    text.split("@data\n")
        .nth(1)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_two_compatible_files_merge() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let a = write_arff(input.path(), "A.arff", &with_rows(&["1,2,x", "3,4,y", "5,6,x"]));
    let b = write_arff(input.path(), "B.arff", &with_rows(&["7,8,y", "9,0,x"]));

    let notifier = RecordingNotifier::new();
    let config = MergeConfig::new(vec![a, b], output.path(), "merged");
    let success = run_merge(&config, &notifier).unwrap();

    assert_eq!(success.rows, 5);
    assert_eq!(success.output_path, output.path().join("merged.arff"));

    let text = fs::read_to_string(&success.output_path).unwrap();
    assert!(text.starts_with("@relation merged\n"));
    assert_eq!(text.matches("@relation").count(), 1);
    assert_eq!(text.matches("@attribute class {x,y}").count(), 1);
    assert_eq!(text.matches("@data").count(), 1);
    assert_eq!(data_section(&text).len(), 5);

    assert_eq!(files_with_prefix(output.path(), RESULT_REPORT_PREFIX).len(), 1);
    assert!(files_with_prefix(output.path(), ERROR_REPORT_PREFIX).is_empty());

    let report = fs::read_to_string(&success.report_path).unwrap();
    assert!(report.contains("'A.arff', 'B.arff'"));
    assert!(report.contains("File saved with name: merged.arff"));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Info);
    assert!(notices[0].1.starts_with("Merging successful."));
}

#[test]
fn test_class_mismatch_rejects_batch() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let a = write_arff(
        input.path(),
        "A.arff",
        "@attribute v numeric\n@attribute class {x,y}\n@data\n1,x\n",
    );
    let b = write_arff(
        input.path(),
        "B.arff",
        "@attribute v numeric\n@attribute class {x,y,z}\n@data\n2,z\n",
    );

    let notifier = RecordingNotifier::new();
    let config = MergeConfig::new(vec![a, b], output.path(), "merged");
    let failure = run_merge(&config, &notifier).unwrap_err();

    match &failure.error {
        Error::ClassDeclarationMismatch { groups } => {
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].value, "{x,y}");
            assert_eq!(groups[0].files, vec!["A.arff"]);
            assert_eq!(groups[1].value, "{x,y,z}");
            assert_eq!(groups[1].files, vec!["B.arff"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(!output.path().join("merged.arff").exists());
    assert!(files_with_prefix(output.path(), RESULT_REPORT_PREFIX).is_empty());

    let report_path = failure.report_path.unwrap();
    let report = fs::read_to_string(report_path).unwrap();
    assert!(report.contains("different class declarations"));
    assert!(report.contains("{x,y} class files:\n'A.arff'"));

    assert_eq!(notifier.notices()[0].0, NoticeLevel::Error);
}

#[test]
fn test_attribute_count_mismatch_writes_no_output() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let a = write_arff(input.path(), "a.arff", &with_rows(&["1,2,x"]));
    let b = write_arff(
        input.path(),
        "b.arff",
        "@attribute a numeric\n@attribute class {x,y}\n@data\n1,x\n",
    );
    let c = write_arff(input.path(), "c.arff", &with_rows(&["3,4,y"]));

    let config = MergeConfig::new(vec![a, b, c], output.path(), "merged");
    let failure = run_merge(&config, &RecordingNotifier::new()).unwrap_err();

    assert!(matches!(failure.error, Error::AttributeCountMismatch { .. }));
    let groups = failure.error.groups();
    assert_eq!(groups[0].value, "3");
    assert_eq!(groups[0].files, vec!["a.arff", "c.arff"]);
    assert_eq!(groups[1].files, vec!["b.arff"]);

    let written: Vec<_> = fs::read_dir(output.path()).unwrap().collect();
    assert_eq!(written.len(), 1);
    assert_eq!(files_with_prefix(output.path(), ERROR_REPORT_PREFIX).len(), 1);
}

#[test]
fn test_input_order_changes_rows_not_outcome() {
    let input = TempDir::new().unwrap();
    let a = write_arff(input.path(), "a.arff", &with_rows(&["1,1,x"]));
    let b = write_arff(input.path(), "b.arff", &with_rows(&["2,2,y"]));

    let out_ab = TempDir::new().unwrap();
    let out_ba = TempDir::new().unwrap();
    let notifier = RecordingNotifier::new();

    let ab_config = MergeConfig::new(vec![a.clone(), b.clone()], out_ab.path(), "m");
    let ab = run_merge(&ab_config, &notifier).unwrap();
    let ba = run_merge(&MergeConfig::new(vec![b, a], out_ba.path(), "m"), &notifier).unwrap();

    let rows_ab = data_section(&fs::read_to_string(ab.output_path).unwrap());
    let rows_ba = data_section(&fs::read_to_string(ba.output_path).unwrap());
    assert_eq!(rows_ab, vec!["1,1,x", "2,2,y"]);
    assert_eq!(rows_ba, vec!["2,2,y", "1,1,x"]);
}

#[test]
fn test_input_order_keeps_failure_kind() {
    let input = TempDir::new().unwrap();
    let a = write_arff(input.path(), "a.arff", &with_rows(&[]));
    let b = write_arff(input.path(), "b.arff", "@attribute class {x,y}\n@data\n");

    let forward = validate_files(&[a.clone(), b.clone()]).unwrap_err();
    let backward = validate_files(&[b, a]).unwrap_err();
    assert_eq!(forward.kind(), "AttributeCountMismatch");
    assert_eq!(backward.kind(), forward.kind());
}

#[test]
fn test_merged_output_revalidates() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let a = write_arff(input.path(), "a.arff", &with_rows(&["1,2,x", "3,4,y"]));
    let b = write_arff(input.path(), "b.arff", &with_rows(&["5,6,x"]));

    let config = MergeConfig::new(vec![a.clone(), b], output.path(), "m");
    let success = run_merge(&config, &RecordingNotifier::new()).unwrap();

    let batch = validate_files(&[success.output_path]).unwrap();
    assert_eq!(batch.signature, scan_header(&a).unwrap().signature());
}

#[test]
fn test_single_file_merge_keeps_rows() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let content = with_rows(&["1,2,x", "", "% comment", "3,4,y"]);
    let a = write_arff(input.path(), "a.arff", &content);

    let config = MergeConfig::new(vec![a], output.path(), "single");
    let success = run_merge(&config, &RecordingNotifier::new()).unwrap();

    let expected = content.replace("@relation first\n", "@relation single\n");
    assert_eq!(fs::read_to_string(success.output_path).unwrap(), expected);
    assert_eq!(success.rows, 2);
}

#[test]
fn test_empty_input_directory() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_arff(input.path(), "readme.txt", "not arff");

    let config = MergeConfig::from_directory(input.path(), output.path(), "merged").unwrap();
    let failure = run_merge(&config, &RecordingNotifier::new()).unwrap_err();

    assert!(matches!(failure.error, Error::EmptyInput { .. }));
    assert!(failure.report_path.is_some());
    assert!(!output.path().join("merged.arff").exists());
}

#[test]
fn test_malformed_file_aborts() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let good = write_arff(input.path(), "good.arff", &with_rows(&["1,2,x"]));
    let bad = write_arff(input.path(), "bad.arff", "@relation r\n@attribute a numeric\n1\n");

    let config = MergeConfig::new(vec![good, bad], output.path(), "m");
    let failure = run_merge(&config, &RecordingNotifier::new()).unwrap_err();

    assert!(matches!(failure.error, Error::MalformedFile { .. }));
    let report = fs::read_to_string(failure.report_path.unwrap()).unwrap();
    assert!(report.contains("bad.arff: rejected"));
    assert!(!output.path().join("m.arff").exists());
}

#[test]
fn test_invalid_name_checked_before_reading() {
    let output = TempDir::new().unwrap();
    let notifier = RecordingNotifier::new();
    let config = MergeConfig::new(
        vec![PathBuf::from("does-not-exist.arff")],
        output.path(),
        "bad name",
    );

    let failure = run_merge(&config, &notifier).unwrap_err();

    assert!(matches!(failure.error, Error::InvalidFileName { .. }));
    assert!(failure.report_path.is_none());
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    assert_eq!(notifier.notices().len(), 1);
}

#[test]
fn test_missing_output_directory() {
    let input = TempDir::new().unwrap();
    let a = write_arff(input.path(), "a.arff", &with_rows(&["1,2,x"]));
    let missing = input.path().join("missing");

    let config = MergeConfig::new(vec![a], &missing, "m");
    let failure = run_merge(&config, &RecordingNotifier::new()).unwrap_err();

    assert!(matches!(failure.error, Error::OutputWrite { .. }));
    assert!(!missing.exists());
}

#[test]
fn test_rerun_in_same_folder_skips_previous_output() {
    let dir = TempDir::new().unwrap();
    write_arff(dir.path(), "a.arff", &with_rows(&["1,2,x"]));
    write_arff(dir.path(), "b.arff", &with_rows(&["3,4,y"]));

    let config = MergeConfig::from_directory(dir.path(), dir.path(), "merged.arff").unwrap();
    let first = run_merge(&config, &RecordingNotifier::new()).unwrap();

    let config = MergeConfig::from_directory(dir.path(), dir.path(), "merged").unwrap();
    assert_eq!(config.input_paths.len(), 2);
    let second = run_merge(&config, &RecordingNotifier::new()).unwrap();

    assert_eq!(first.rows, 2);
    assert_eq!(second.rows, 2);
}

#[test]
fn test_job_file_drives_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_arff(input.path(), "a.arff", &with_rows(&["1,2,x"]));
    write_arff(input.path(), "b.arff", &with_rows(&["3,4,y"]));

    let job = MergeJob {
        input_dir: Some(input.path().to_path_buf()),
        files: Vec::new(),
        output_dir: output.path().to_path_buf(),
        output_name: "job".to_string(),
        json_report: true,
    };
    let job_path = output.path().join("job.json");
    job.save(&job_path).unwrap();

    let config = MergeJob::load(&job_path).unwrap().into_config().unwrap();
    let success = run_merge(&config, &RecordingNotifier::new()).unwrap();

    assert_eq!(success.rows, 2);
    let json = fs::read_to_string(success.report_path.with_extension("json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["outcome"]["result"], "success");
    assert_eq!(value["outcome"]["rows"], 2);
}

#[test]
fn test_unwritable_result_report_rolls_back_merge() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let a = write_arff(input.path(), "a.arff", &with_rows(&["1,2,x"]));
    let b = write_arff(input.path(), "b.arff", &with_rows(&["3,4,y"]));

    // Directories on the JSON result names for the next few seconds make
    // the result report fail after the merged file is written
    let now = Local::now();
    for offset in 0..10 {
        let name = report_file_name(RESULT_REPORT_PREFIX, &(now + Duration::seconds(offset)));
        fs::create_dir(output.path().join(name.replace(".txt", ".json"))).unwrap();
    }

    let notifier = RecordingNotifier::new();
    let config = MergeConfig::new(vec![a, b], output.path(), "merged").with_json_report(true);
    let failure = run_merge(&config, &notifier).unwrap_err();

    assert!(matches!(failure.error, Error::OutputWrite { .. }));
    assert!(!output.path().join("merged.arff").exists());
    let result_files: Vec<_> = files_with_prefix(output.path(), RESULT_REPORT_PREFIX)
        .into_iter()
        .filter(|p| p.is_file())
        .collect();
    assert!(result_files.is_empty());

    let report_path = failure.report_path.unwrap();
    let report_name = report_path.file_name().unwrap().to_str().unwrap();
    assert!(report_name.starts_with(ERROR_REPORT_PREFIX));
    assert!(fs::read_to_string(&report_path)
        .unwrap()
        .starts_with("Merging procedure cannot continue"));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Error);
}

#[test]
fn test_byte_order_mark_file_merges_cleanly() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let a = write_arff(
        input.path(),
        "a.arff",
        "\u{feff}@relation orig\n@attribute class {x,y}\n@data\nx\n",
    );
    let b = write_arff(input.path(), "b.arff", "@relation b\n@attribute class {x,y}\n@data\ny\n");

    let config = MergeConfig::new(vec![a, b], output.path(), "merged");
    let success = run_merge(&config, &RecordingNotifier::new()).unwrap();

    let text = fs::read_to_string(success.output_path).unwrap();
    assert_eq!(text, "@relation merged\n@attribute class {x,y}\n@data\nx\ny\n");
    assert_eq!(success.rows, 2);
}
