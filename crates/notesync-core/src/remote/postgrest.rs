//! PostgREST client for the `notes` and `profiles` tables.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{NoteStore, ProfileStore};
use crate::config::ClientConfig;
use crate::models::{Note, NoteDraft, NoteId, Profile};
use crate::session::SessionContext;
use crate::util::compact_text;
use crate::{Error, Result};

/// PostgREST code for "the result contains 0 rows" on single-object requests.
pub const NO_ROWS_CODE: &str = "PGRST116";

const NOTES_TABLE: &str = "notes";
const PROFILES_TABLE: &str = "profiles";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

/// Row store client authenticated with the current session.
#[derive(Debug, Clone)]
pub struct SupabaseRestClient {
    rest_url: String,
    anon_key: String,
    client: Client,
    session: SessionContext,
}

impl SupabaseRestClient {
    pub fn new(config: &ClientConfig, session: SessionContext) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.supabase_anon_key.clone(),
            client: Client::builder().build()?,
            session,
        })
    }

    fn table(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn send_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>> {
        let response = self.authorized(request).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        missing: impl FnOnce() -> Error,
    ) -> Result<T> {
        self.send_rows::<T>(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(missing)
    }
}

#[derive(Debug, Serialize)]
struct NoteInsert<'a> {
    title: &'a str,
    content: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct NotePatch<'a> {
    title: &'a str,
    content: &'a str,
}

impl NoteStore for SupabaseRestClient {
    async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let request = self.client.get(self.table(NOTES_TABLE)).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        self.send_rows(request).await
    }

    async fn insert_note(&self, user_id: &str, draft: &NoteDraft) -> Result<Note> {
        let payload = [NoteInsert {
            title: &draft.title,
            content: &draft.content,
            user_id,
        }];
        let request = self
            .client
            .post(self.table(NOTES_TABLE))
            .query(&[("select", "*")])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&payload);
        self.first_row(request, || {
            Error::Remote {
                code: None,
                message: "Insert did not return the created note".to_string(),
            }
        })
        .await
    }

    async fn update_note(&self, user_id: &str, id: &NoteId, draft: &NoteDraft) -> Result<Note> {
        let request = self
            .client
            .patch(self.table(NOTES_TABLE))
            .query(&[
                ("select", "*".to_string()),
                ("id", eq(&id.as_str())),
                ("user_id", eq(user_id)),
            ])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&NotePatch {
                title: &draft.title,
                content: &draft.content,
            });
        self.first_row(request, || Error::NotFound(id.to_string()))
            .await
    }

    async fn delete_note(&self, user_id: &str, id: &NoteId) -> Result<()> {
        let request = self
            .client
            .delete(self.table(NOTES_TABLE))
            .query(&[
                ("select", "id".to_string()),
                ("id", eq(&id.as_str())),
                ("user_id", eq(user_id)),
            ])
            .header("Prefer", RETURN_REPRESENTATION);
        let deleted = self.send_rows::<DeletedRow>(request).await?;
        if deleted.is_empty() {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DeletedRow {
    #[allow(dead_code)]
    id: NoteId,
}

impl ProfileStore for SupabaseRestClient {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let request = self
            .client
            .get(self.table(PROFILES_TABLE))
            .query(&[("select", "*".to_string()), ("id", eq(user_id))])
            .header("Accept", SINGLE_OBJECT);
        let response = self.authorized(request).send().await?;
        match ensure_success(response).await {
            Ok(response) => Ok(Some(response.json::<Profile>().await?)),
            Err(Error::Remote {
                code: Some(code), ..
            }) if code == NO_ROWS_CODE => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let request = self
            .client
            .post(self.table(PROFILES_TABLE))
            .query(&[("select", "*")])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&[profile]);
        self.first_row(request, || Error::NotFound(profile.id.clone()))
            .await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile> {
        let request = self
            .client
            .post(self.table(PROFILES_TABLE))
            .query(&[("select", "*"), ("on_conflict", "id")])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&[profile]);
        self.first_row(request, || Error::NotFound(profile.id.clone()))
            .await
    }
}

/// `eq.` filter operand.
fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(parse_postgrest_error(status, &body))
}

fn parse_postgrest_error(status: StatusCode, body: &str) -> Error {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.filter(|message| !message.trim().is_empty()) {
            let detail = payload
                .details
                .or(payload.hint)
                .filter(|detail| !detail.trim().is_empty());
            let message = match detail {
                Some(detail) => format!("{} ({})", message.trim(), compact_text(&detail)),
                None => message.trim().to_string(),
            };
            return Error::Remote {
                code: payload.code,
                message,
            };
        }
    }

    let trimmed = compact_text(body);
    Error::Remote {
        code: None,
        message: if trimmed.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            format!("{trimmed} ({})", status.as_u16())
        },
    }
}
