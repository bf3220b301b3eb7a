use std::path::PathBuf;

use taskdeck::error::{exit_codes, Error, ErrorReport};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let missing = Error::TaskNotFound("task_1".to_string());
    assert_eq!(missing.exit_code(), exit_codes::USER_ERROR);

    let lock = Error::LockFailed(PathBuf::from("/tmp/taskManager_tasks.json.lock"));
    assert_eq!(lock.exit_code(), exit_codes::OPERATION_FAILED);

    let op = Error::OperationFailed("boom".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn io_errors_convert_with_question_mark() {
    fn read_missing() -> taskdeck::Result<String> {
        Ok(std::fs::read_to_string("/definitely/not/here/td.json")?)
    }

    let err = read_missing().expect_err("missing file");
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.kind(), "io");
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn error_report_includes_code_kind_and_details() {
    let err = Error::AmbiguousTaskId {
        input: "task_17".to_string(),
        matches: 3,
    };
    let report = ErrorReport::from(&err);
    assert_eq!(report.code, exit_codes::USER_ERROR);
    assert_eq!(report.kind, "ambiguous_task_id");
    assert!(report.message.contains("Ambiguous task id 'task_17'"));
    let details = report.details.expect("details");
    assert_eq!(details["matches"], 3);

    let plain = ErrorReport::from(&Error::OperationFailed("boom".to_string()));
    assert!(plain.details.is_none());
    let rendered = serde_json::to_value(&plain).expect("serialize");
    assert!(rendered.get("details").is_none());
    assert_eq!(rendered["code"], exit_codes::OPERATION_FAILED);
}
