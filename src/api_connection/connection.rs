use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

use super::endpoints::{
    ChatResponse, ConversationId, DailyNeedsReport, DietSuitability, Endpoint, HealthStatus,
    NewConversationResponse, NutritionProfile, Recipe, RecipeFilter, RecipeId, RecipeListItem,
    RecipeMatch, RecipeNutritionReport, RecipeSearchRequest, RecipeSearchResponse,
    SendMessageRequest, SubstitutionSuggestion,
};
use crate::config::ClientConfig;

#[derive(Debug)]
pub enum ApiConnectionError {
    InvalidBaseUrl(String),
    /// The request never produced a response: connection refused, DNS, timeout.
    NetworkError(reqwest::Error),
    ServerError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    /// The body arrived but does not have the expected shape.
    ParseError(serde_json::Error),
}

impl ApiConnectionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiConnectionError::NetworkError(err) if err.is_timeout())
    }
}

impl fmt::Display for ApiConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiConnectionError::InvalidBaseUrl(url) => write!(f, "Invalid API base URL: {}", url),
            ApiConnectionError::NetworkError(err) => write!(f, "Network error: {}", err),
            ApiConnectionError::ServerError { status, error_body } => {
                write!(f, "Server error {}: {}", status, error_body)
            }
            ApiConnectionError::ParseError(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl Error for ApiConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiConnectionError::NetworkError(err) => Some(err),
            ApiConnectionError::ParseError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiConnectionError {
    fn from(err: reqwest::Error) -> Self {
        ApiConnectionError::NetworkError(err)
    }
}

impl From<serde_json::Error> for ApiConnectionError {
    fn from(err: serde_json::Error) -> Self {
        ApiConnectionError::ParseError(err)
    }
}

/// The two calls a conversation needs. Kept separate from the full client so a
/// session can be driven by anything that can answer them.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn create_conversation(&self) -> Result<NewConversationResponse, ApiConnectionError>;

    async fn send_message(
        &self,
        message: &str,
        conversation_id: &ConversationId,
    ) -> Result<ChatResponse, ApiConnectionError>;
}

/// Stateless client for the recipe assistant REST API. No retries, no caching.
#[derive(Clone, Debug)]
pub struct RecipeApiClient {
    http: Client,
    base_url: Url,
}

impl RecipeApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiConnectionError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ApiConnectionError::InvalidBaseUrl(format!("{} ({})", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiConnectionError::InvalidBaseUrl(config.base_url.clone()));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, endpoint: &Endpoint<'_>) -> Result<Url, ApiConnectionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiConnectionError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(endpoint.segments());
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint<'_>,
        request: RequestBuilder,
    ) -> Result<T, ApiConnectionError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            serde_json::from_slice(&body).map_err(|e| {
                warn!(path = %endpoint.path(), error = %e, "Response body did not match expected shape");
                ApiConnectionError::ParseError(e)
            })
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            warn!(path = %endpoint.path(), %status, "API returned non-success status");
            Err(ApiConnectionError::ServerError { status, error_body })
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Result<T, ApiConnectionError> {
        let url = self.url_for(&endpoint)?;
        debug!(method = "GET", path = %endpoint.path(), "Sending request");
        self.execute(&endpoint, self.http.get(url)).await
    }

    async fn post<B, T>(&self, endpoint: Endpoint<'_>, body: Option<&B>) -> Result<T, ApiConnectionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url_for(&endpoint)?;
        debug!(method = "POST", path = %endpoint.path(), "Sending request");
        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(&endpoint, request).await
    }

    /// `POST /api/chat/new`
    pub async fn create_conversation(&self) -> Result<NewConversationResponse, ApiConnectionError> {
        self.post::<(), _>(Endpoint::NewConversation, None).await
    }

    /// `POST /api/chat/message`
    pub async fn send_message(
        &self,
        message: &str,
        conversation_id: &ConversationId,
    ) -> Result<ChatResponse, ApiConnectionError> {
        let body = SendMessageRequest {
            message,
            conversation_id,
        };
        self.post(Endpoint::SendMessage, Some(&body)).await
    }

    /// History payload is passed through uninterpreted.
    pub async fn conversation_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<serde_json::Value, ApiConnectionError> {
        self.get(Endpoint::History(conversation_id)).await
    }

    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeListItem>, ApiConnectionError> {
        let endpoint = Endpoint::RecipeList;
        let url = self.url_for(&endpoint)?;
        debug!(method = "GET", path = %endpoint.path(), ?filter, "Sending request");
        self.execute(&endpoint, self.http.get(url).query(filter)).await
    }

    pub async fn get_recipe(&self, id: RecipeId) -> Result<Recipe, ApiConnectionError> {
        self.get(Endpoint::Recipe(id)).await
    }

    pub async fn search_recipes(
        &self,
        request: &RecipeSearchRequest,
    ) -> Result<Vec<RecipeMatch>, ApiConnectionError> {
        let response: RecipeSearchResponse =
            self.post(Endpoint::RecipeSearch, Some(request)).await?;
        Ok(response.results)
    }

    pub async fn substitutions(
        &self,
        id: RecipeId,
        ingredient: &str,
    ) -> Result<SubstitutionSuggestion, ApiConnectionError> {
        self.get(Endpoint::Substitutions(id, ingredient)).await
    }

    pub async fn recipes_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, ApiConnectionError> {
        self.get(Endpoint::RecipesByTag(tag)).await
    }

    pub async fn recipe_nutrition(
        &self,
        id: RecipeId,
    ) -> Result<RecipeNutritionReport, ApiConnectionError> {
        self.get(Endpoint::RecipeNutrition(id)).await
    }

    pub async fn diet_suitability(
        &self,
        id: RecipeId,
        diet_type: &str,
    ) -> Result<DietSuitability, ApiConnectionError> {
        self.get(Endpoint::DietSuitability(id, diet_type)).await
    }

    pub async fn daily_needs(
        &self,
        profile: &NutritionProfile,
    ) -> Result<DailyNeedsReport, ApiConnectionError> {
        let endpoint = Endpoint::DailyNeeds;
        let url = self.url_for(&endpoint)?;
        debug!(method = "GET", path = %endpoint.path(), "Sending request");
        self.execute(&endpoint, self.http.get(url).query(profile)).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiConnectionError> {
        self.get(Endpoint::Health).await
    }
}

#[async_trait]
impl ChatTransport for RecipeApiClient {
    async fn create_conversation(&self) -> Result<NewConversationResponse, ApiConnectionError> {
        RecipeApiClient::create_conversation(self).await
    }

    async fn send_message(
        &self,
        message: &str,
        conversation_id: &ConversationId,
    ) -> Result<ChatResponse, ApiConnectionError> {
        RecipeApiClient::send_message(self, message, conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client_for(base_url: &str) -> RecipeApiClient {
        RecipeApiClient::new(&ClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_url_for_joins_onto_base_path() {
        let client = client_for("http://localhost:8000");
        let url = client.url_for(&Endpoint::SendMessage).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/chat/message");

        let prefixed = client_for("http://example.com/assistant/");
        let url = prefixed.url_for(&Endpoint::Recipe(12)).unwrap();
        assert_eq!(url.as_str(), "http://example.com/assistant/api/recipes/12");
    }

    #[test]
    fn test_url_for_percent_encodes_user_segments() {
        let client = client_for("http://localhost:8000");
        let url = client
            .url_for(&Endpoint::Substitutions(3, "soy sauce/dark"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/recipes/3/substitutions/soy%20sauce%2Fdark"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = RecipeApiClient::new(&ClientConfig {
            base_url: "not a url".to_string(),
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(ApiConnectionError::InvalidBaseUrl(_))));

        let result = RecipeApiClient::new(&ClientConfig {
            base_url: "mailto:chef@example.com".to_string(),
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(ApiConnectionError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_server_error_display() {
        let err = ApiConnectionError::ServerError {
            status: reqwest::StatusCode::NOT_FOUND,
            error_body: "{\"detail\":\"菜谱不存在\"}".to_string(),
        };
        assert!(err.to_string().starts_with("Server error 404 Not Found"));
        assert!(!err.is_timeout());
    }
}
