//! HTTP client for the PromptDuel API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use promptduel_core::{Duel, DuelId, Turn, TurnId, VoteCounter, VoteTally};

use crate::error::CliError;

/// A duel with its derived tally, as returned by `GET /v1/duels`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DuelSummary {
    #[serde(flatten)]
    pub duel: Duel,
    pub tally: VoteTally,
}

/// A duel with its ordered turns and tally, as returned by the arena route
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaView {
    pub duel: Duel,
    pub turns: Vec<Turn>,
    pub tally: VoteTally,
}

#[derive(Debug, Serialize)]
pub struct CreateDuelRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contender_a_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contender_b_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTurnRequest {
    pub user_input: String,
    pub response_a: String,
    pub response_b: String,
}

pub struct ApiClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            access_token,
            client: reqwest::Client::new(),
        }
    }

    pub async fn arena(&self, duel_id: &DuelId) -> Result<ArenaView, CliError> {
        self.get(&format!("/arena/{duel_id}")).await
    }

    pub async fn vote(&self, turn_id: &TurnId, counter: VoteCounter) -> Result<(), CliError> {
        let payload = serde_json::json!({ "counter": counter.column() });
        let _: serde_json::Value = self
            .post(&format!("/arena/turns/{turn_id}/vote"), &payload)
            .await?;
        Ok(())
    }

    pub async fn list_duels(&self) -> Result<Vec<DuelSummary>, CliError> {
        self.get("/v1/duels").await
    }

    pub async fn create_duel(&self, request: &CreateDuelRequest) -> Result<Duel, CliError> {
        self.post("/v1/duels", request).await
    }

    pub async fn delete_duel(&self, duel_id: &DuelId) -> Result<(), CliError> {
        let _: serde_json::Value = self.delete(&format!("/v1/duels/{duel_id}")).await?;
        Ok(())
    }

    pub async fn list_turns(&self, duel_id: &DuelId) -> Result<Vec<Turn>, CliError> {
        self.get(&format!("/v1/duels/{duel_id}/turns")).await
    }

    pub async fn create_turn(
        &self,
        duel_id: &DuelId,
        request: &CreateTurnRequest,
    ) -> Result<Turn, CliError> {
        self.post(&format!("/v1/duels/{duel_id}/turns"), request)
            .await
    }

    pub async fn delete_turn(&self, turn_id: &TurnId) -> Result<(), CliError> {
        let _: serde_json::Value = self.delete(&format!("/v1/turns/{turn_id}")).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let request = self.client.get(format!("{}{path}", self.base_url));
        self.send(request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        self.send(request).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let request = self.client.delete(format!("{}{path}", self.base_url));
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CliError> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = ApiClient::new("http://localhost:8080/", None);
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn error_message_extraction_prefers_error_field() {
        assert_eq!(
            extract_error_message(r#"{"error": "Not found: duel x"}"#),
            "Not found: duel x"
        );
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[test]
    fn duel_summary_deserializes_flattened_payload() {
        let payload = serde_json::json!({
            "id": "01890000-0000-7000-8000-000000000001",
            "owner_id": "owner-1",
            "name": "Sonnet vs Haiku",
            "description": null,
            "contender_a_name": "Prompt A",
            "contender_b_name": "Prompt B",
            "status": "active",
            "created_at": 1_700_000_000_000_i64,
            "tally": {
                "total_votes": 4,
                "winner": "A",
                "percentage": 75,
                "delta": 50
            }
        });

        let summary: DuelSummary = serde_json::from_value(payload).unwrap();
        assert_eq!(summary.duel.name, "Sonnet vs Haiku");
        assert_eq!(summary.tally.percentage, 75);
    }
}
