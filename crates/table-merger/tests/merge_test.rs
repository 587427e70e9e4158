//! End-to-end tests for the merge workflow with scripted model output.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use table_merger::{
    ColumnType, Confidence, MergeState, MergerError, MockProvider, TableMergerManager,
};

const TEMPLATE: &str = "Date,EmployeeName,Plan,PolicyNumber,Premium\n\
                        01-05-2023,John Doe,Gold Plan,AB-12345,150.00\n\
                        15-05-2023,Jane Smith,Silver Plan,CD-67890,100.00\n\
                        28-05-2023,Michael Brown,Bronze Plan,EF-10111,50.00\n";

const INCOMING: &str = "Date_of_Policy,FullName,Insurance_Plan,Policy_No,Monthly_Premium,Department\n\
                        05/01/2023,John Doe,Gold Plan,AB-12345,150.00,IT\n\
                        05/02/2023,jane smith,silver plan,CD-67890,100.00,HR\n";

const MAPPING_RESPONSE: &str = r#"Here is the mapping:
```json
{"column_mapping": [
  {"template_column": "Date", "incoming_column": "Date_of_Policy", "confidence": "high", "ambiguous_with": []},
  {"template_column": "EmployeeName", "incoming_column": "FullName", "confidence": "high", "ambiguous_with": []},
  {"template_column": "Plan", "incoming_column": "Insurance_Plan", "confidence": "medium", "ambiguous_with": ["Department"]},
  {"template_column": "PolicyNumber", "incoming_column": "Policy_No", "confidence": "high", "ambiguous_with": []},
  {"template_column": "Premium", "incoming_column": "Monthly_Premium", "confidence": "high", "ambiguous_with": []}
]}
```"#;

const TRANSFORMATION_RESPONSE: &str = r#"{"transformations": [
  {"column_name": "Date", "transformation_expression": "reformat_date(value, \"%m/%d/%Y\", \"%d-%m-%Y\")"},
  {"column_name": "EmployeeName", "transformation_expression": "title_case(value)"},
  {"column_name": "Plan", "transformation_expression": "title_case(value)"},
  {"column_name": "PolicyNumber", "transformation_expression": "value"},
  {"column_name": "Premium", "transformation_expression": "value"}
]}"#;

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn ready_manager(mock: &Arc<MockProvider>) -> TableMergerManager {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("table_merger=debug")
        .with_test_writer()
        .try_init();

    let template = create_test_file(TEMPLATE);
    let mut manager = TableMergerManager::new(mock.clone());
    assert!(manager.ready_from_path(template.path()), "{:?}", manager.errors());
    manager
}

// =============================================================================
// Full workflow
// =============================================================================

#[test]
fn test_end_to_end_merge() {
    let mock = Arc::new(MockProvider::with_responses([
        MAPPING_RESPONSE,
        TRANSFORMATION_RESPONSE,
    ]));
    let manager = ready_manager(&mock);

    let template = manager.template_columns().unwrap();
    assert_eq!(template.len(), 5);
    assert_eq!(template[0].column_type, ColumnType::Date);
    assert_eq!(template[0].output_format, "%d-%m-%Y");

    let incoming = create_test_file(INCOMING);
    let mut op = manager.prep_csv_file_from_path(incoming.path()).unwrap();
    assert_eq!(op.state(), MergeState::Profiled);
    assert_eq!(op.incoming_column_info().len(), 6);

    let suggestion = op.suggest_mapping(&manager.mapping_suggester()).unwrap();
    assert!(suggestion.errors.is_empty());
    let plan = suggestion.mapping_for("Plan").unwrap();
    assert_eq!(plan.confidence, Confidence::Medium);
    assert_eq!(plan.candidates(), vec!["Department", "Insurance_Plan"]);
    let mapping = suggestion.selected_mapping();
    assert_eq!(op.state(), MergeState::MappingSuggested);

    op.confirm_mapping(mapping).unwrap();
    assert_eq!(op.state(), MergeState::MappingConfirmed);

    let transformations = op
        .suggest_transformations(&manager.transformation_suggester())
        .unwrap()
        .as_map();
    assert_eq!(op.state(), MergeState::TransformationSuggested);

    op.confirm_transformations(transformations).unwrap();
    let rows: Vec<_> = op
        .apply()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(op.state(), MergeState::Applied);
    assert_eq!(rows.len(), 2);

    let first: Vec<(&str, &str)> = rows[0]
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert_eq!(
        first,
        vec![
            ("Date", "01-05-2023"),
            ("EmployeeName", "John Doe"),
            ("Plan", "Gold Plan"),
            ("PolicyNumber", "AB-12345"),
            ("Premium", "150.00"),
        ]
    );
    assert_eq!(rows[1]["EmployeeName"], "Jane Smith");
    assert_eq!(rows[1]["Plan"], "Silver Plan");
    assert_eq!(rows[1]["Date"], "02-05-2023");

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Department"));
    assert!(prompts[1].contains("### Date <- Date_of_Policy"));
}

#[test]
fn test_apply_twice_is_identical() {
    let mock = Arc::new(MockProvider::new());
    let manager = ready_manager(&mock);
    let mut op = manager
        .prep_csv_file_from_reader(INCOMING.as_bytes())
        .unwrap();

    op.confirm_mapping([
        ("Date", "Date_of_Policy"),
        ("EmployeeName", "FullName"),
        ("Plan", "Insurance_Plan"),
        ("PolicyNumber", "Policy_No"),
        ("Premium", "Monthly_Premium"),
    ])
    .unwrap();
    op.confirm_transformations([
        ("Date", r#"reformat_date(value, "%m/%d/%Y", "%d-%m-%Y")"#),
        ("EmployeeName", "value"),
        ("Plan", "uppercase(value)"),
        ("PolicyNumber", r#"policy_no + "/" + department"#),
        ("Premium", "format_number(value, 0)"),
    ])
    .unwrap();

    let first: Vec<_> = op.apply().unwrap().map(|r| r.unwrap()).collect();
    let second: Vec<_> = op.apply().unwrap().map(|r| r.unwrap()).collect();

    assert_eq!(first, second);
    assert_eq!(first[0]["PolicyNumber"], "AB-12345/IT");
    assert_eq!(first[1]["Plan"], "SILVER PLAN");
    assert_eq!(first[1]["Premium"], "100");
    // Nothing was asked of the model.
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_row_errors_do_not_stop_iteration() {
    let mock = Arc::new(MockProvider::new());
    let manager = ready_manager(&mock);
    let incoming = "Date_of_Policy,FullName,Insurance_Plan,Policy_No,Monthly_Premium\n\
                    05/01/2023,John Doe,Gold,AB-1,1\n\
                    not a date,Jane Roe,Gold,AB-2,2\n\
                    ,Jim Poe,Gold,AB-3,3\n";
    let mut op = manager.prep_csv_file_from_reader(incoming.as_bytes()).unwrap();

    op.confirm_mapping([
        ("Date", "Date_of_Policy"),
        ("EmployeeName", "FullName"),
        ("Plan", "Insurance_Plan"),
        ("PolicyNumber", "Policy_No"),
        ("Premium", "Monthly_Premium"),
    ])
    .unwrap();
    op.confirm_transformations([
        ("Date", r#"reformat_date(value, "%m/%d/%Y", "%d-%m-%Y")"#),
        ("EmployeeName", "value"),
        ("Plan", "value"),
        ("PolicyNumber", "value"),
        ("Premium", "value"),
    ])
    .unwrap();

    let rows: Vec<_> = op.apply().unwrap().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].is_ok());
    match &rows[1] {
        Err(MergerError::Transformation { column, row, .. }) => {
            assert_eq!(column, "Date");
            assert_eq!(*row, Some(1));
        }
        other => panic!("expected a transformation error, got {other:?}"),
    }
    assert_eq!(rows[2].as_ref().unwrap()["Date"], "");
}

#[test]
fn test_unrenderable_date_format_fails_rows_instead_of_aborting() {
    let mock = Arc::new(MockProvider::new());
    let manager = ready_manager(&mock);
    let incoming = "Date_of_Policy,FullName,Insurance_Plan,Policy_No,Monthly_Premium\n\
                    05/01/2023,John Doe,Gold,AB-1,1\n\
                    ,Jim Poe,Gold,AB-3,3\n\
                    05/02/2023,Jane Roe,Gold,AB-2,2\n";
    let mut op = manager.prep_csv_file_from_reader(incoming.as_bytes()).unwrap();

    op.confirm_mapping([
        ("Date", "Date_of_Policy"),
        ("EmployeeName", "FullName"),
        ("Plan", "Insurance_Plan"),
        ("PolicyNumber", "Policy_No"),
        ("Premium", "Monthly_Premium"),
    ])
    .unwrap();
    op.confirm_transformations([
        ("Date", r#"reformat_date(value, "%m/%d/%Y", "%Y-%m-%dT%H:%M")"#),
        ("EmployeeName", "value"),
        ("Plan", "value"),
        ("PolicyNumber", "value"),
        ("Premium", "value"),
    ])
    .unwrap();

    let rows: Vec<_> = op.apply().unwrap().collect();
    assert_eq!(rows.len(), 3);
    assert!(matches!(
        &rows[0],
        Err(MergerError::Transformation { column, row: Some(0), .. }) if column == "Date"
    ));
    assert_eq!(rows[1].as_ref().unwrap()["EmployeeName"], "Jim Poe");
    assert!(matches!(&rows[2], Err(MergerError::Transformation { row: Some(2), .. })));
}

// =============================================================================
// Lifecycle guards
// =============================================================================

#[test]
fn test_transformation_suggestion_before_mapping_confirmation() {
    let mock = Arc::new(MockProvider::with_responses([MAPPING_RESPONSE]));
    let manager = ready_manager(&mock);
    let mut op = manager
        .prep_csv_file_from_reader(INCOMING.as_bytes())
        .unwrap();
    op.suggest_mapping(&manager.mapping_suggester()).unwrap();

    let err = op
        .suggest_transformations(&manager.transformation_suggester())
        .unwrap_err();
    assert!(matches!(err, MergerError::Precondition(_)));
    assert_eq!(op.state(), MergeState::MappingSuggested);
    assert_eq!(mock.call_count(), 1);
}

#[test]
fn test_mapping_is_suggested_at_most_once() {
    let mock = Arc::new(MockProvider::with_responses([MAPPING_RESPONSE, MAPPING_RESPONSE]));
    let manager = ready_manager(&mock);
    let mut op = manager
        .prep_csv_file_from_reader(INCOMING.as_bytes())
        .unwrap();

    op.suggest_mapping(&manager.mapping_suggester()).unwrap();
    let err = op.suggest_mapping(&manager.mapping_suggester()).unwrap_err();
    assert!(matches!(err, MergerError::Precondition(_)));
    assert_eq!(mock.remaining(), 1);
}

#[test]
fn test_incomplete_mapping_suggestion_is_reported_not_dropped() {
    let partial = r#"{"column_mapping": [
        {"template_column": "Date", "incoming_column": "Date_of_Policy", "confidence": "high"}
    ]}"#;
    let mock = Arc::new(MockProvider::with_responses([partial]));
    let manager = ready_manager(&mock);
    let mut op = manager
        .prep_csv_file_from_reader(INCOMING.as_bytes())
        .unwrap();

    let suggestion = op.suggest_mapping(&manager.mapping_suggester()).unwrap();
    assert_eq!(suggestion.errors.len(), 4);
    assert_eq!(op.state(), MergeState::MappingSuggested);
    assert_eq!(op.errors().len(), 4);

    // The reviewer completes the mapping by hand.
    op.confirm_mapping([
        ("Date", "Date_of_Policy"),
        ("EmployeeName", "FullName"),
        ("Plan", "Insurance_Plan"),
        ("PolicyNumber", "Policy_No"),
        ("Premium", "Monthly_Premium"),
    ])
    .unwrap();
    assert_eq!(op.state(), MergeState::MappingConfirmed);
}

#[test]
fn test_model_failure_errors_the_operation() {
    // Empty script: the mapping call itself fails.
    let mock = Arc::new(MockProvider::new());
    let manager = ready_manager(&mock);
    let mut op = manager
        .prep_csv_file_from_reader(INCOMING.as_bytes())
        .unwrap();

    let err = op.suggest_mapping(&manager.mapping_suggester()).unwrap_err();
    assert!(matches!(err, MergerError::Llm(_)));
    assert!(op.is_errored());
    assert_eq!(op.errors().len(), 1);

    let err = op
        .confirm_mapping([("Date", "Date_of_Policy")])
        .unwrap_err();
    assert!(matches!(err, MergerError::Precondition(_)));
}

#[test]
fn test_operations_share_template_profile() {
    let mock = Arc::new(MockProvider::new());
    let manager = ready_manager(&mock);

    let a = manager.prep_csv_file_from_reader(INCOMING.as_bytes()).unwrap();
    let b = manager.prep_csv_file_from_reader("X,Y\n1,2\n".as_bytes()).unwrap();

    assert_eq!(
        a.template_column_info().as_ptr(),
        b.template_column_info().as_ptr()
    );
    assert_eq!(b.incoming_column_info().len(), 2);
}

#[test]
fn test_missing_incoming_file_yields_errored_operation() {
    let mock = Arc::new(MockProvider::new());
    let manager = ready_manager(&mock);

    let op = manager
        .prep_csv_file_from_path("/nonexistent/incoming.csv")
        .unwrap();
    assert!(op.is_errored());
    assert!(op.errors()[0].contains("/nonexistent/incoming.csv"));
}
