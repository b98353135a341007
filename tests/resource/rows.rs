#![allow(dead_code)]

use rowkit::Row;
use uuid::Uuid;

#[derive(Default, Clone, Row)]
pub struct PersonRow {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Table named after a reserved word.
#[derive(Default, Clone, Row)]
pub struct OrderRow {
    pub id: Option<i64>,
    pub total: Option<i32>,
}

/// Without identity.
#[derive(Default, Clone, Row)]
pub struct NoteRow {
    pub body: Option<String>,
    pub person_id: Option<i64>,
}

#[derive(Default, Clone, Row)]
#[rowkit(table = "counters")]
pub struct CounterRow {
    #[rowkit(auto_increment)]
    pub id: Option<i64>,
    pub label: Option<String>,
    pub hits: Option<i32>,
}

#[derive(Default, Clone, Row)]
#[rowkit(table = "sessions", alias = "s")]
pub struct LoginRow {
    pub id: Option<Uuid>,
    #[rowkit(column = "user_name")]
    pub user: Option<String>,
    pub created_at: Option<time::PrimitiveDateTime>,
    pub token: Option<Vec<u8>>,
}
