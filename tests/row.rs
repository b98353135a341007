mod resource {
    pub mod rows;
}

#[cfg(test)]
mod tests {
    use crate::resource::rows::{CounterRow, LoginRow, NoteRow, PersonRow};
    use rowkit::{IdentityKind, RowContract, RowProxy, Value};
    use std::collections::BTreeMap;
    use time::macros::datetime;

    #[test]
    fn schema_from_derive() {
        let schema = PersonRow::schema();
        assert_eq!(schema.name, "PersonRow");
        assert_eq!(schema.table, "person");
        assert_eq!(schema.alias, "person");
        assert_eq!(schema.identity, IdentityKind::Integer);
        assert_eq!(
            schema.columns.iter().map(|c| c.column).collect::<Vec<_>>(),
            ["email", "id", "name"]
        );
        assert_eq!(schema.width(), 3);

        let schema = CounterRow::schema();
        assert_eq!(schema.table, "counters");
        assert_eq!(schema.alias, "counters");
        assert_eq!(schema.identity, IdentityKind::AutoInteger);

        let schema = LoginRow::schema();
        assert_eq!(schema.table, "sessions");
        assert_eq!(schema.alias, "s");
        assert_eq!(schema.identity, IdentityKind::Uuid);
        let user = schema.column("user_name").expect("renamed column");
        assert_eq!(user.property, "user");
        assert!(matches!(user.value, Value::Varchar(None)));
        assert!(matches!(
            schema.property("createdAt").map(|c| &c.value),
            Some(Value::Timestamp(None))
        ));
        assert!(matches!(
            schema.property("token").map(|c| &c.value),
            Some(Value::Blob(None))
        ));

        let schema = NoteRow::schema();
        assert_eq!(schema.identity, IdentityKind::None);
        assert!(schema.identity_def().is_none());
        assert_eq!(schema.width(), 3);
    }

    #[test]
    fn names_round_trip() {
        fn check<R: RowContract>() {
            let row = RowProxy::<R>::new();
            for def in R::schema().columns.iter() {
                let column = row.to_column_name(def.property);
                assert_eq!(row.to_property_name(&column), def.property);
                assert_eq!(row.to_column_name(&row.to_property_name(&column)), column);
            }
        }
        check::<PersonRow>();
        check::<NoteRow>();
        check::<CounterRow>();
        check::<LoginRow>();

        let row = RowProxy::<LoginRow>::new();
        assert_eq!(row.to_column_name("createdAt"), "`created_at`");
        assert_eq!(row.to_column_name("user"), "`user_name`");
        assert_eq!(row.to_property_name("`user_name`"), "user");
        assert_eq!(row.to_property_name("`last_seen_at`"), "lastSeenAt");
    }

    #[test]
    fn columns_sorted() {
        let row = RowProxy::<PersonRow>::new();
        assert_eq!(row.columns(true), ["`email`", "`id`", "`name`"]);
        assert_eq!(row.columns(false), ["`email`", "`name`"]);
        let row = RowProxy::<LoginRow>::new();
        let columns = row.columns(true);
        let mut sorted = columns.clone();
        sorted.sort();
        assert_eq!(columns, sorted);
        assert_eq!(columns.iter().filter(|c| *c == "`id`").count(), 1);
        let row = RowProxy::<NoteRow>::new();
        assert_eq!(row.columns(true), ["`body`", "`person_id`"]);
    }

    #[test]
    fn get_and_set() {
        let mut row = RowProxy::<PersonRow>::new();
        row.set("`id`", 5i32).unwrap();
        assert_eq!(row.id, Some(5));
        assert!(matches!(row.db_value("id").unwrap(), Value::Int64(Some(5))));
        assert_eq!(row.get::<i32>("id").unwrap(), 5);
        assert_eq!(row.get::<u8>("`id`").unwrap(), 5);
        row.set("id", 300i64).unwrap();
        assert!(row.get::<i8>("id").is_err());
        row.set("name", "Alice").unwrap();
        assert_eq!(row.get::<String>("name").unwrap(), "Alice");
        row.set("name", Value::Varchar(None)).unwrap();
        assert_eq!(row.name, None);
        assert_eq!(row.get::<Option<String>>("name").unwrap(), None);
        assert!(row.set("nickname", "Al").is_err());
        assert!(row.set("id", "not a number").is_err());
    }

    #[test]
    fn dirty_tracking() {
        let mut row = RowProxy::<PersonRow>::new();
        assert!(!row.is_dirty());
        row.load([
            ("id", Value::Int64(Some(1))),
            ("name", Value::Varchar(Some("Al".into()))),
        ])
        .unwrap();
        assert!(!row.is_dirty());
        assert_eq!(row.name.as_deref(), Some("Al"));

        row.email = Some("al@example.com".into());
        assert!(row.is_dirty());
        assert!(row.is_column_dirty("email").unwrap());
        assert!(!row.is_column_dirty("name").unwrap());
        assert_eq!(row.dirty_columns(true), ["`email`"]);

        row.reset();
        assert!(!row.is_dirty());
        assert_eq!(row.email, None);

        // Unset and null are the same thing.
        row.set("email", Value::Varchar(None)).unwrap();
        assert!(!row.is_dirty());

        row.id = Some(2);
        assert!(row.is_dirty());
        assert!(row.dirty_columns(false).is_empty());
        row.mark_clean();
        assert!(!row.is_dirty());
    }

    #[test]
    fn maps() {
        let mut row = RowProxy::<LoginRow>::new();
        row.user = Some("root".into());
        row.created_at = Some(datetime!(2025-01-02 03:04:05));
        assert_eq!(
            row.to_map().into_keys().collect::<Vec<_>>(),
            ["createdAt", "user"]
        );
        assert_eq!(
            row.db_map().into_keys().collect::<Vec<_>>(),
            ["`created_at`", "`user_name`"]
        );
        assert!(row.baseline().is_empty());
        let debug = format!("{:?}", row);
        assert!(debug.starts_with("LoginRow {\"createdAt\": Timestamp(Some("));
        assert!(debug.ends_with("\"user\": Varchar(Some(\"root\"))}"));
        let mut map = BTreeMap::new();
        map.insert("`user_name`", Value::Varchar(Some("admin".into())));
        row.load(map).unwrap();
        assert_eq!(row.user.as_deref(), Some("admin"));
        assert_eq!(row.created_at, None);
        assert!(!row.is_dirty());
    }

    #[test]
    fn identity() {
        let mut row = RowProxy::<PersonRow>::new();
        assert_eq!(row.identity_column().as_deref(), Some("`id`"));
        assert_eq!(row.identity_value(), None);
        row.id = Some(7);
        assert_eq!(row.identity_value(), Some(Value::Int64(Some(7))));

        let mut note = RowProxy::<NoteRow>::new();
        note.body = Some("hello".into());
        assert_eq!(note.identity_column(), None);
        assert_eq!(note.identity_value(), None);
    }

    #[test]
    fn table_name() {
        let mut row = RowProxy::<CounterRow>::new();
        assert_eq!(row.table_name(), "`counters`");
        row.set_identifier_quote("\"");
        assert_eq!(row.table_name(), "\"counters\"");
        assert_eq!(row.to_column_name("hits"), "\"hits\"");
        row.set_table_name(Some("archive.counters".into()));
        assert_eq!(row.table_name(), "archive.counters");
    }

    #[test]
    fn materialize() {
        let values = [
            Value::Varchar(Some("al@example.com".into())),
            Value::Varchar(Some("Al".into())),
            Value::Int32(Some(3)),
        ];
        let row = RowProxy::<PersonRow>::materialize(&values, "`").unwrap();
        assert_eq!(row.id, Some(3));
        assert_eq!(row.name.as_deref(), Some("Al"));
        assert!(!row.is_dirty());
        assert!(RowProxy::<PersonRow>::materialize(&values[..2], "`").is_err());

        let values = [
            Value::Varchar(Some("hi".into())),
            Value::Int64(Some(3)),
            Value::Null,
        ];
        let note = RowProxy::<NoteRow>::materialize(&values, "`").unwrap();
        assert_eq!(note.body.as_deref(), Some("hi"));
        assert_eq!(note.person_id, Some(3));
    }
}
