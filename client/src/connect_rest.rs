use async_trait::async_trait;
use reqwest::Method;

use shared::constants::{COLUMN_ID, COLUMN_INSERTED_AT, COLUMN_USER_ID, HEADER_PREFER, PREFER_REPRESENTATION, ROOT_REST, TABLE_NOTES};
use shared::types::{NewNote, Note, Session};
use shared::utils::{eq, order_desc};

use crate::connect_http::{send_empty, send_json, SupabaseHttp};
use crate::error::RemoteError;
use crate::gateway::NotesGateway;

pub struct SupabaseNotes {
    http: SupabaseHttp,
}

impl SupabaseNotes {
    pub fn new(http: SupabaseHttp) -> Self {
        Self { http }
    }
}

fn table_path() -> String {
    format!("{ROOT_REST}/{TABLE_NOTES}")
}

fn select_query(session: &Session) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        (COLUMN_USER_ID, eq(session.owner_id())),
        ("order", order_desc(COLUMN_INSERTED_AT)),
    ]
}

fn delete_query(id: i64) -> Vec<(&'static str, String)> {
    vec![(COLUMN_ID, eq(id))]
}

#[async_trait]
impl NotesGateway for SupabaseNotes {
    async fn select(&self, session: &Session) -> Result<Vec<Note>, RemoteError> {
        let request = self.http
            .request(Method::GET, &table_path(), Some(&session.access_token))
            .query(&select_query(session));
        send_json(request).await
    }

    async fn insert(&self, session: &Session, note: &NewNote) -> Result<Note, RemoteError> {
        let request = self.http
            .request(Method::POST, &table_path(), Some(&session.access_token))
            .header(HEADER_PREFER, PREFER_REPRESENTATION)
            .json(&[note]);
        let mut rows: Vec<Note> = send_json(request).await?;
        if rows.len() == 1 {
            Ok(rows.remove(0))
        } else {
            Err(RemoteError::Rejected(format!("insert returned {} rows", rows.len())))
        }
    }

    async fn delete(&self, session: &Session, id: i64) -> Result<(), RemoteError> {
        let request = self.http
            .request(Method::DELETE, &table_path(), Some(&session.access_token))
            .query(&delete_query(id));
        send_empty(request).await
    }
}
