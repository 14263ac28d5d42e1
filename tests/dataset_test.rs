//! Dataset file handling through the public API.

use bedrock_finetune::{read_records, DatasetError, RecordError, Role, TrainingRecord};
use std::io::Write;
use test_case::test_case;

fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[tokio::test]
async fn test_read_valid_file() {
    let file = write_lines(&[
        r#"{"system":"S","messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#,
        "",
        r#"{"messages":[{"role":"user","content":"a"},{"role":"assistant","content":"b"},{"role":"user","content":"c"},{"role":"assistant","content":"d"}]}"#,
    ]);

    let records = read_records(file.path()).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].system.as_deref(), Some("S"));
    assert!(records[1].system.is_none());
    assert_eq!(records[1].messages.last().unwrap().role, Role::Assistant);
}

#[test_case(r#"{"messages":[{"role":"user","content":"hi"}]}"#, RecordError::TooFewMessages { count: 1 } ; "single turn")]
#[test_case(r#"{"messages":[{"role":"user","content":"a"},{"role":"user","content":"b"}]}"#, RecordError::NotAlternating { index: 1 } ; "same role twice")]
#[test_case(r#"{"id":1,"messages":[{"role":"user","content":"a"},{"role":"assistant","content":"b"}]}"#, RecordError::UnknownField { field: "id".into() } ; "extra key")]
#[tokio::test]
async fn test_invalid_line_is_located(line: &str, expected: RecordError) {
    let valid = r#"{"messages":[{"role":"user","content":"a"},{"role":"assistant","content":"b"}]}"#;
    let file = write_lines(&[valid, valid, line]);

    match read_records(file.path()).await {
        Err(DatasetError::InvalidRecord { line: 3, source }) => assert_eq!(source, expected),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_record_reencodes_to_same_line() {
    let line = r#"{"system":"S","messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#;
    let record: TrainingRecord = serde_json::from_str(line).unwrap();
    assert_eq!(serde_json::to_string(&record).unwrap(), line);
}
