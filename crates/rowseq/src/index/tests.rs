use crate::{
    error::Error,
    length::LengthMode,
    row,
    row::RowInput,
    schema::{ColumnSpec, DataType},
    session::Session,
    value::Value,
};
use proptest::prelude::*;

fn fresh() -> Session {
    let mut session = Session::open_in_memory().unwrap();
    session
        .create_table(
            "reports",
            &[
                ColumnSpec::new("id", DataType::Integer)
                    .not_null()
                    .unique()
                    .primary_key(),
                ColumnSpec::new("name", DataType::Text),
                ColumnSpec::new("score", DataType::Real),
            ],
        )
        .unwrap();
    session.bind("reports", "id", LengthMode::Cached).unwrap();

    session
}

fn with_names(names: &[&str]) -> Session {
    let mut session = fresh();
    for name in names {
        session.append(row! { "name" => *name }).unwrap();
    }

    session
}

fn keys(session: &Session) -> Vec<i64> {
    session
        .projection(&["id"])
        .unwrap()
        .into_iter()
        .map(|row| row.get("id").unwrap().as_integer().unwrap())
        .collect()
}

fn names(session: &Session) -> Vec<String> {
    session
        .projection(&["name"])
        .unwrap()
        .into_iter()
        .map(|row| row.get("name").unwrap().as_text().unwrap_or("").to_string())
        .collect()
}

fn assert_contiguous(session: &Session) {
    let n = session.len().unwrap();
    let expected: Vec<i64> = (1..=n as i64).collect();
    assert_eq!(keys(session), expected, "keys must be exactly 1..n");
}

#[test]
fn append_then_get_round_trips_with_the_key_populated() {
    let mut session = fresh();
    session
        .append(row! { "name" => "a", "score" => 0.5 })
        .unwrap();

    let row = session.get(0).unwrap();
    assert_eq!(row.get("id"), Some(&Value::Integer(1)));
    assert_eq!(row.get("name"), Some(&Value::from("a")));
    assert_eq!(row.get("score"), Some(&Value::Real(0.5)));
}

#[test]
fn appended_keys_ignore_a_supplied_key() {
    let mut session = fresh();
    let key = session.append(row! { "id" => 99i64, "name" => "a" }).unwrap();

    assert_eq!(key, 1);
    assert_eq!(keys(&session), vec![1]);
}

#[test]
fn negative_positions_count_from_the_end() {
    let session = with_names(&["a", "b", "c"]);

    assert_eq!(session.get(-1).unwrap(), session.get(2).unwrap());
    assert_eq!(session.get(-3).unwrap(), session.get(0).unwrap());
    assert!(matches!(
        session.get(-4),
        Err(Error::OutOfRange { position: -4, .. })
    ));
    assert!(matches!(session.get(3), Err(Error::OutOfRange { .. })));
}

#[test]
fn slices_out_of_bounds_are_empty_not_errors() {
    let session = with_names(&["a", "b", "c"]);

    assert!(session.get_slice(2..1).unwrap().is_empty());
    assert!(session.get_slice(5..).unwrap().is_empty());
    assert!(session.get_slice(3..3).unwrap().is_empty());

    let empty = fresh();
    assert!(empty.get_slice(..).unwrap().is_empty());
}

#[test]
fn slice_stride_applies_after_the_fetch() {
    let session = with_names(&["a", "b", "c", "d", "e"]);

    let rows = session.get_slice(crate::Slice::full().step(2)).unwrap();
    let picked: Vec<_> = rows
        .iter()
        .map(|row| row.get("name").unwrap().as_text().unwrap())
        .collect();
    assert_eq!(picked, vec!["a", "c", "e"]);

    let rows = session.get_slice(crate::Slice::from(1..4).step(2)).unwrap();
    let picked: Vec<_> = rows
        .iter()
        .map(|row| row.get("name").unwrap().as_text().unwrap())
        .collect();
    assert_eq!(picked, vec!["b", "d"]);
}

#[test]
fn projection_returns_chosen_columns_for_every_row() {
    let session = with_names(&["a", "b", "c"]);

    let rows = session.projection(&["name"]).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.get("id").is_none()));

    assert!(matches!(
        session.projection(&["bogus"]),
        Err(Error::SchemaInvalid { .. })
    ));
}

#[test]
fn set_updates_one_row_by_name_or_position() {
    let mut session = with_names(&["a", "b", "c"]);

    session.set(1, row! { "name" => "B" }).unwrap();
    assert_eq!(names(&session), vec!["a", "B", "c"]);

    // Positional input follows introspected column order; the key slot is
    // discarded.
    session
        .set(
            -1,
            RowInput::from(vec![
                Value::Integer(42),
                Value::from("C"),
                Value::Real(1.0),
            ]),
        )
        .unwrap();
    assert_eq!(names(&session), vec!["a", "B", "C"]);
    assert_eq!(keys(&session), vec![1, 2, 3]);

    assert!(matches!(
        session.set(7, row! { "name" => "x" }),
        Err(Error::OutOfRange { .. })
    ));
}

#[test]
fn delete_renumbers_the_tail() {
    let mut session = with_names(&["a", "b", "c", "d", "e"]);

    session.delete(1).unwrap();

    assert_eq!(session.len().unwrap(), 4);
    assert_eq!(keys(&session), vec![1, 2, 3, 4]);
    // The row formerly at position 2 is now position 1.
    assert_eq!(
        session.get(1).unwrap().get("name"),
        Some(&Value::from("c"))
    );
    assert_eq!(names(&session), vec!["a", "c", "d", "e"]);
}

#[test]
fn delete_slice_renumbers_once_from_the_lowest_key() {
    let mut session = with_names(&["a", "b", "c", "d", "e", "f"]);

    let deleted = session
        .delete_slice(crate::Slice::from(1..6).step(2))
        .unwrap();

    assert_eq!(deleted, 3);
    assert_eq!(names(&session), vec!["a", "c", "e"]);
    assert_contiguous(&session);

    assert_eq!(session.delete_slice(5..9).unwrap(), 0);
}

#[test]
fn pop_returns_the_removed_row() {
    let mut session = with_names(&["a", "b", "c"]);

    let last = session.pop().unwrap();
    assert_eq!(last.get("name"), Some(&Value::from("c")));

    let first = session.pop_at(0).unwrap();
    assert_eq!(first.get("name"), Some(&Value::from("a")));

    assert_eq!(session.len().unwrap(), 1);
    assert_contiguous(&session);

    session.pop().unwrap();
    assert!(matches!(session.pop(), Err(Error::OutOfRange { .. })));
}

#[test]
fn remove_deletes_the_first_match_in_key_order() {
    let mut session = with_names(&["a", "b", "b", "c"]);

    session.remove(row! { "name" => "b" }).unwrap();

    assert_eq!(names(&session), vec!["a", "b", "c"]);
    assert_contiguous(&session);

    assert!(matches!(
        session.remove(row! { "name" => "zzz" }),
        Err(Error::NoMatch)
    ));
}

#[test]
fn remove_null_predicate_matches_stored_nulls_only() {
    let mut session = fresh();
    session.append(row! { "name" => "None" }).unwrap();
    session.append(row! { "name" => Value::Null }).unwrap();
    session.append(row! { "name" => 0i64 }).unwrap();

    session.remove(row! { "name" => Value::Null }).unwrap();

    assert_eq!(session.len().unwrap(), 2);
    let remaining = session.projection(&["name"]).unwrap();
    assert_eq!(remaining[0].get("name"), Some(&Value::from("None")));
    assert_eq!(remaining[1].get("name"), Some(&Value::Integer(0)));
}

#[test]
fn position_searches_ascending_within_bounds() {
    let session = with_names(&["a", "b", "a", "b"]);

    assert_eq!(session.position(row! { "name" => "b" }, 0, None).unwrap(), 1);
    assert_eq!(session.position(row! { "name" => "b" }, 2, None).unwrap(), 3);
    assert_eq!(
        session
            .position(row! { "name" => "a" }, 1, Some(3))
            .unwrap(),
        2
    );
    assert!(matches!(
        session.position(row! { "name" => "b" }, 0, Some(1)),
        Err(Error::NoMatch)
    ));
}

#[test]
fn search_bounds_accept_extreme_negative_values() {
    let session = with_names(&["a", "b"]);

    assert_eq!(
        session
            .position(row! { "name" => "a" }, i64::MIN, None)
            .unwrap(),
        0
    );
    assert_eq!(session.get_slice(i64::MIN..).unwrap().len(), 2);
}

#[test]
fn metrics_count_caller_operations_not_internal_lookups() {
    let mut session = fresh();
    crate::obs::metrics_reset_all();

    session.append(row! { "name" => "a" }).unwrap();
    session.get(0).unwrap();

    let report = crate::obs::metrics_report();
    assert_eq!(report.ops.length_calls, 0);
    assert_eq!(report.ops.append_calls, 1);
    assert_eq!(report.ops.get_calls, 1);

    session.len().unwrap();
    assert_eq!(crate::obs::metrics_report().ops.length_calls, 1);
}

#[test]
fn extend_is_not_atomic_without_an_explicit_transaction() {
    let mut session = fresh();

    let rows = vec![
        RowInput::ByName(vec![("name".to_string(), Value::from("ok"))]),
        // Wrong positional width fails validation.
        RowInput::ByPosition(vec![Value::from("x")]),
    ];
    assert!(matches!(
        session.extend(rows.clone()),
        Err(Error::TypeMismatch { .. })
    ));
    assert_eq!(session.len().unwrap(), 1);

    // All-or-nothing needs the caller's transaction.
    session.begin().unwrap();
    assert!(session.extend(rows).is_err());
    session.rollback().unwrap();
    assert_eq!(session.len().unwrap(), 1);
}

#[test]
fn cached_and_live_lengths_agree_under_a_single_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.db");

    let mut writer = Session::open(&path).unwrap();
    writer
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
    writer.bind("reports", "id", LengthMode::Cached).unwrap();

    let mut observer = Session::open(&path).unwrap();
    observer.bind("reports", "id", LengthMode::Live).unwrap();

    // 10 interleaved mutations; both modes must agree after each.
    for step in 0..10 {
        if step % 3 == 2 {
            writer.delete(0).unwrap();
        } else {
            writer.append(row! { "name" => format!("row{step}") }).unwrap();
        }

        assert_eq!(
            writer.len().unwrap(),
            observer.len().unwrap(),
            "modes diverged at step {step}"
        );
    }
}

#[test]
fn scenario_append_remove_get() {
    let mut session = Session::open_in_memory().unwrap();
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
    session.bind("reports", "id", LengthMode::Cached).unwrap();

    for name in ["a", "b", "c"] {
        session.append(row! { "name" => name }).unwrap();
    }
    assert_eq!(session.len().unwrap(), 3);
    assert_eq!(keys(&session), vec![1, 2, 3]);

    session.remove(row! { "name" => "b" }).unwrap();

    assert_eq!(session.len().unwrap(), 2);
    let row = session.get(1).unwrap();
    assert_eq!(row.get("id"), Some(&Value::Integer(2)));
    assert_eq!(row.get("name"), Some(&Value::from("c")));
}

// ---------------------------------------------------------------------
// Invariant property: keys are exactly 1..n after every operation
// ---------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Op {
    Append(u8),
    Delete(i64),
    DeleteSlice(i64, i64, i64),
    Pop,
    Remove(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Append),
        (-8i64..8).prop_map(Op::Delete),
        (-8i64..8, -8i64..8, 1i64..4).prop_map(|(a, b, c)| Op::DeleteSlice(a, b, c)),
        Just(Op::Pop),
        any::<u8>().prop_map(Op::Remove),
    ]
}

fn tolerated(err: &Error) -> bool {
    matches!(err, Error::OutOfRange { .. } | Error::NoMatch)
}

proptest! {
    #[test]
    fn keys_stay_contiguous_under_arbitrary_mutation(
        ops in prop::collection::vec(arb_op(), 1..40)
    ) {
        let mut session = fresh();

        for op in ops {
            let result = match op {
                Op::Append(tag) => session
                    .append(row! { "name" => format!("r{tag}") })
                    .map(|_| ()),
                Op::Delete(position) => session.delete(position),
                Op::DeleteSlice(start, stop, step) => session
                    .delete_slice(crate::Slice::new(Some(start), Some(stop)).step(step))
                    .map(|_| ()),
                Op::Pop => session.pop().map(|_| ()),
                Op::Remove(tag) => session.remove(row! { "name" => format!("r{tag}") }),
            };

            if let Err(err) = result {
                prop_assert!(tolerated(&err), "unexpected failure: {err}");
            }

            let n = session.len().unwrap();
            let stored = keys(&session);
            prop_assert_eq!(stored, (1..=n as i64).collect::<Vec<_>>());
        }
    }
}
