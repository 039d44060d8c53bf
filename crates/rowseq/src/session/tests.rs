use super::*;
use crate::{row, value::Value};
use tempfile::tempdir;

fn create_reports(session: &Session) {
    session
        .create_table(
            "reports",
            &[
                ColumnSpec::new("id", DataType::Integer)
                    .not_null()
                    .unique()
                    .primary_key(),
                ColumnSpec::new("name", DataType::Text),
            ],
        )
        .unwrap();
}

fn bound_in_memory() -> Session {
    let mut session = Session::open_in_memory().unwrap();
    create_reports(&session);
    session.bind("reports", "id", LengthMode::Cached).unwrap();

    session
}

#[test]
fn fresh_sessions_are_unbound() {
    let mut session = Session::open_in_memory().unwrap();
    create_reports(&session);

    assert!(session.table().is_none());
    assert!(matches!(session.len(), Err(Error::NotBound)));
    assert!(matches!(session.get(0), Err(Error::NotBound)));
    assert!(matches!(
        session.append(row! { "name" => "a" }),
        Err(Error::NotBound)
    ));
}

#[test]
fn bind_validates_table_and_key_column() {
    let mut session = Session::open_in_memory().unwrap();
    create_reports(&session);

    assert!(matches!(
        session.bind("missing", "id", LengthMode::Cached),
        Err(Error::SchemaInvalid { .. })
    ));
    assert!(matches!(
        session.bind("reports", "nokey", LengthMode::Cached),
        Err(Error::SchemaInvalid { .. })
    ));

    session.bind("reports", "id", LengthMode::Live).unwrap();
    let table = session.table().unwrap();
    assert_eq!(table.name, "reports");
    assert_eq!(table.columns.len(), 2);
}

#[test]
fn bind_primes_the_cached_counter() {
    let mut session = bound_in_memory();
    session.append(row! { "name" => "a" }).unwrap();
    session.append(row! { "name" => "b" }).unwrap();

    // A second binding over existing rows starts from a live count.
    session.bind("reports", "id", LengthMode::Cached).unwrap();
    assert_eq!(session.len().unwrap(), 2);
}

#[test]
fn scope_commits_then_closes_on_success() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports.db");

    Session::scope(&path, |session| {
        create_reports(session);
        session.bind("reports", "id", LengthMode::Cached)?;
        session.append(row! { "name" => "a" })?;
        Ok(())
    })
    .unwrap();

    let mut session = Session::open(&path).unwrap();
    session.bind("reports", "id", LengthMode::Live).unwrap();
    assert_eq!(session.len().unwrap(), 1);
}

#[test]
fn scope_still_commits_on_the_error_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports.db");

    let result: Result<(), Error> = Session::scope(&path, |session| {
        create_reports(session);
        session.bind("reports", "id", LengthMode::Cached)?;
        session.append(row! { "name" => "a" })?;
        Err(Error::NoMatch)
    });
    assert!(matches!(result, Err(Error::NoMatch)));

    let mut session = Session::open(&path).unwrap();
    session.bind("reports", "id", LengthMode::Live).unwrap();
    assert_eq!(session.len().unwrap(), 1);
}

#[test]
fn dropping_a_session_commits_an_open_transaction() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports.db");

    {
        let mut session = Session::open(&path).unwrap();
        create_reports(&session);
        session.bind("reports", "id", LengthMode::Cached).unwrap();
        session.begin().unwrap();
        session.append(row! { "name" => "staged" }).unwrap();
        // Dropped without an explicit commit.
    }

    let mut session = Session::open(&path).unwrap();
    session.bind("reports", "id", LengthMode::Live).unwrap();
    assert_eq!(session.len().unwrap(), 1);
}

#[test]
fn rollback_discards_staged_rows_and_reprimes_the_counter() {
    let mut session = bound_in_memory();
    session.append(row! { "name" => "kept" }).unwrap();

    session.begin().unwrap();
    session.append(row! { "name" => "staged" }).unwrap();
    assert_eq!(session.len().unwrap(), 2);

    session.rollback().unwrap();
    assert_eq!(session.len().unwrap(), 1);
    assert_eq!(
        session.get(0).unwrap().get("name"),
        Some(&Value::from("kept"))
    );
}

#[test]
fn commit_flushes_staged_rows() {
    let mut session = bound_in_memory();
    session.begin().unwrap();
    session.append(row! { "name" => "a" }).unwrap();
    session.append(row! { "name" => "b" }).unwrap();
    session.commit().unwrap();

    assert_eq!(session.len().unwrap(), 2);
}

#[test]
fn binding_schema_is_fixed_until_rebound() {
    let mut session = bound_in_memory();
    session
        .add_column("reports", "score", DataType::Real, false, None)
        .unwrap();

    // The live binding still serves the descriptors loaded at bind time.
    assert_eq!(session.table().unwrap().columns.len(), 2);

    session.bind("reports", "id", LengthMode::Cached).unwrap();
    assert_eq!(session.table().unwrap().columns.len(), 3);
}
