use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type RecipeId = u64;

/// Opaque token the server uses to correlate turns of one dialogue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Every route the recipe assistant API exposes. Paths are kept as segment lists so
/// user-provided parts (ingredient names, tags, diet types) get percent-encoded when
/// they are joined onto the base URL.
#[derive(Clone, Copy, Debug)]
pub enum Endpoint<'a> {
    NewConversation,
    SendMessage,
    History(&'a ConversationId),
    RecipeList,
    Recipe(RecipeId),
    RecipeSearch,
    Substitutions(RecipeId, &'a str),
    RecipesByTag(&'a str),
    RecipeNutrition(RecipeId),
    DietSuitability(RecipeId, &'a str),
    DailyNeeds,
    Health,
}

impl Endpoint<'_> {
    pub fn segments(&self) -> Vec<String> {
        match self {
            Endpoint::NewConversation => vec!["api".into(), "chat".into(), "new".into()],
            Endpoint::SendMessage => vec!["api".into(), "chat".into(), "message".into()],
            Endpoint::History(id) => {
                vec!["api".into(), "chat".into(), "history".into(), id.to_string()]
            }
            Endpoint::RecipeList => vec!["api".into(), "recipes".into(), "list".into()],
            Endpoint::Recipe(id) => vec!["api".into(), "recipes".into(), id.to_string()],
            Endpoint::RecipeSearch => vec!["api".into(), "recipes".into(), "search".into()],
            Endpoint::Substitutions(id, ingredient) => vec![
                "api".into(),
                "recipes".into(),
                id.to_string(),
                "substitutions".into(),
                ingredient.to_string(),
            ],
            Endpoint::RecipesByTag(tag) => {
                vec!["api".into(), "recipes".into(), "tags".into(), tag.to_string()]
            }
            Endpoint::RecipeNutrition(id) => {
                vec!["api".into(), "nutrition".into(), "recipe".into(), id.to_string()]
            }
            Endpoint::DietSuitability(id, diet) => vec![
                "api".into(),
                "nutrition".into(),
                "recipe".into(),
                id.to_string(),
                "diet".into(),
                diet.to_string(),
            ],
            Endpoint::DailyNeeds => vec!["api".into(), "nutrition".into(), "daily-needs".into()],
            Endpoint::Health => vec!["health".into()],
        }
    }

    /// Unencoded path, used for logs.
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewConversationResponse {
    pub conversation_id: ConversationId,
    pub message: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
    pub conversation_id: &'a ConversationId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
    pub category: String,
}

// The chat endpoint trims recipes down and drops `ingredients` / `substitutions`,
// hence the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: String,
    pub time: String,
    pub servings: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub substitutions: HashMap<String, Vec<String>>,
    pub nutrition: Nutrition,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeMatch {
    pub recipe: Recipe,
    /// Server-computed fit in `[0.0, 1.0]`.
    pub match_score: f64,
    #[serde(default)]
    pub matched_ingredients: Vec<String>,
    #[serde(default)]
    pub missing_ingredients: Vec<String>,
}

/// Per-serving nutrition block attached to a chat turn.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NutritionSummary {
    pub per_serving: Nutrition,
    #[serde(default)]
    pub daily_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub health_tips: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatResponse {
    pub message: String,
    pub conversation_id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_recipes: Option<Vec<RecipeMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_ingredients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_restrictions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_info: Option<NutritionSummary>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeListItem {
    pub id: RecipeId,
    pub name: String,
    pub difficulty: String,
    pub time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub match_score: Option<f64>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RecipeSearchRequest {
    pub ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecipeSearchResponse {
    pub results: Vec<RecipeMatch>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubstitutionSuggestion {
    pub ingredient: String,
    #[serde(default)]
    pub database_substitutions: Vec<String>,
    #[serde(default)]
    pub ai_suggestion: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeNutritionReport {
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub nutrition_per_serving: Nutrition,
    #[serde(default)]
    pub daily_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub health_tips: Vec<String>,
}

impl RecipeNutritionReport {
    /// Same shape the chat endpoint attaches to a turn, so both render through one view.
    pub fn summary(&self) -> NutritionSummary {
        NutritionSummary {
            per_serving: self.nutrition_per_serving,
            daily_percentage: self.daily_percentage.clone(),
            health_tips: self.health_tips.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DietSuitability {
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub diet_type: String,
    pub suitable: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NutritionProfile {
    pub weight: f64,
    pub height: f64,
    pub age: u32,
    pub gender: String,
    pub activity_level: String,
}

impl Default for NutritionProfile {
    fn default() -> Self {
        Self {
            weight: 60.0,
            height: 170.0,
            age: 30,
            gender: "female".to_string(),
            activity_level: "moderate".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyNeedsReport {
    pub profile: NutritionProfile,
    pub daily_needs: Nutrition,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}
