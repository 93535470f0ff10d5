use chrono::NaiveDate;
use expense_core::db::migrations::latest_version;
use expense_core::db::open_db_in_memory;
use expense_core::{
    local_epoch_ms, Expense, ExpenseDraft, ExpenseRepository, ExpenseService, RepoError,
    SqliteExpenseRepository, ViewTab,
};
use rusqlite::Connection;

const FIXED_NOW: i64 = 1_700_000_000_000;

fn fixed_clock() -> i64 {
    FIXED_NOW
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    local_epoch_ms(
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap(),
    )
}

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn create_and_read_back_by_range_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());

    let target = at(2024, 3, 5, 12, 30);
    let draft = ExpenseDraft::new("Viva Supermarket", 28.0, "Food").with_description("weekly shop");
    let created = service.create_expense(&draft, target).unwrap();

    assert_eq!(created.title, "Viva Supermarket");
    assert_eq!(created.entry_date, target);

    let listed = service.expenses_for_day(day(2024, 3, 5)).unwrap();
    assert_eq!(listed, vec![created.clone()]);
    let loaded = &listed[0];
    assert_eq!(loaded.amount, 28.0);
    assert_eq!(loaded.category, "Food");
    assert_eq!(loaded.description.as_deref(), Some("weekly shop"));
}

#[test]
fn create_uses_target_date_over_draft_date() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());

    let draft = ExpenseDraft::new("Taxi", 9.0, "Transport").with_entry_date(at(2020, 1, 1, 8, 0));
    let target = at(2024, 6, 1, 9, 15);
    let created = service.create_expense(&draft, target).unwrap();

    assert_eq!(created.entry_date, target);
}

#[test]
fn inserted_ids_are_distinct_and_increasing() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());

    let ids: Vec<i64> = (0..5)
        .map(|index| {
            service
                .create_expense(&ExpenseDraft::new(format!("item {index}"), 1.0, "Other"), FIXED_NOW)
                .unwrap()
                .id
        })
        .collect();

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "ids: {ids:?}");
}

#[test]
fn update_replaces_every_column() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());

    let original = service
        .create_expense(
            &ExpenseDraft::new("Shawarma", 7.0, "Food").with_description("late dinner"),
            at(2024, 3, 5, 21, 0),
        )
        .unwrap();

    let new_date = at(2024, 3, 6, 13, 0);
    let payload = ExpenseDraft::new("Shawarma plate", 11.5, "Food").with_entry_date(new_date);
    assert_eq!(service.update_expense(original.id, &payload).unwrap(), 1);

    let loaded = service.get_expense(original.id).unwrap().unwrap();
    assert_eq!(
        loaded,
        Expense {
            id: original.id,
            title: "Shawarma plate".to_string(),
            amount: 11.5,
            category: "Food".to_string(),
            description: None,
            entry_date: new_date,
        }
    );
}

#[test]
fn update_without_date_stores_now() {
    let conn = open_db_in_memory().unwrap();
    let service =
        ExpenseService::with_clock(SqliteExpenseRepository::try_new(&conn).unwrap(), fixed_clock);

    let created = service
        .create_expense(&ExpenseDraft::new("Bus", 2.0, "Transport"), at(2024, 1, 2, 7, 0))
        .unwrap();
    service
        .update_expense(created.id, &ExpenseDraft::new("Bus", 2.5, "Transport"))
        .unwrap();

    let loaded = service.get_expense(created.id).unwrap().unwrap();
    assert_eq!(loaded.entry_date, FIXED_NOW);
}

#[test]
fn update_unknown_id_affects_zero_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());

    let changed = service
        .update_expense(404, &ExpenseDraft::new("ghost", 1.0, "Other"))
        .unwrap();
    assert_eq!(changed, 0);
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());

    let created = service
        .create_expense(&ExpenseDraft::new("Lulu Express", 28.0, "Shopping"), FIXED_NOW)
        .unwrap();

    assert_eq!(service.delete_expense(created.id).unwrap(), 1);
    assert_eq!(service.delete_expense(created.id).unwrap(), 0);
    assert_eq!(service.delete_expense(9_999).unwrap(), 0);
    assert!(service.get_expense(created.id).unwrap().is_none());
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let invalid = ExpenseDraft::new("bad", f64::NAN, "Other");
    let create_err = repo.insert_expense(&invalid, FIXED_NOW).unwrap_err();
    assert!(matches!(create_err, RepoError::Validation(_)));

    let id = repo
        .insert_expense(&ExpenseDraft::new("good", 3.0, "Other"), FIXED_NOW)
        .unwrap();
    let update_err = repo.update_expense(id, &invalid, FIXED_NOW).unwrap_err();
    assert!(matches!(update_err, RepoError::Validation(_)));

    let unchanged = repo.get_expense(id).unwrap().unwrap();
    assert_eq!(unchanged.amount, 3.0);
}

#[test]
fn null_columns_read_back_as_defaults() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO expenses (entryDate) VALUES (?1);", [FIXED_NOW])
        .unwrap();
    let repo = SqliteExpenseRepository::try_new(&conn).unwrap();

    let rows = repo
        .list_expenses(expense_core::DateRange::UNBOUNDED)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "");
    assert_eq!(rows[0].amount, 0.0);
    assert_eq!(rows[0].category, "");
    assert_eq!(rows[0].description, None);
}

#[test]
fn expense_serialization_uses_app_field_names() {
    let expense = Expense {
        id: 3,
        title: "Nits House".to_string(),
        amount: 90.0,
        category: "Food".to_string(),
        description: None,
        entry_date: FIXED_NOW,
    };

    let json = serde_json::to_value(&expense).unwrap();
    assert_eq!(json["entryDate"], FIXED_NOW);
    assert_eq!(json["title"], "Nits House");
    assert!(json.get("entry_date").is_none());

    let decoded: Expense = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, expense);
}

#[test]
fn read_range_daily_returns_entries_view() {
    let conn = open_db_in_memory().unwrap();
    let service = ExpenseService::new(SqliteExpenseRepository::try_new(&conn).unwrap());
    service
        .create_expense(&ExpenseDraft::new("a", 1.0, "Food"), at(2024, 3, 5, 10, 0))
        .unwrap();

    let view = service.read_range(day(2024, 3, 5), ViewTab::Daily).unwrap();
    assert!(matches!(view, expense_core::RangeView::Entries(ref rows) if rows.len() == 1));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteExpenseRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_missing_expense_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            title TEXT,
            amount REAL DEFAULT 0
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteExpenseRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "expenses",
            column: "category"
        })
    ));
}
