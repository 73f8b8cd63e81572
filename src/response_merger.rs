use tracing::debug;

use crate::api_connection::endpoints::{ChatResponse, NutritionSummary, RecipeMatch};

/// The recommendation slot: whatever the most recent turn returned, nothing older.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationState {
    pub recipes: Option<Vec<RecipeMatch>>,
    pub nutrition: Option<NutritionSummary>,
}

impl RecommendationState {
    /// Matches the recipe panel's visibility rule: an empty list shows nothing.
    pub fn has_recipes(&self) -> bool {
        self.recipes.as_ref().is_some_and(|recipes| !recipes.is_empty())
    }

    pub fn recipes(&self) -> &[RecipeMatch] {
        self.recipes.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_recipes() && self.nutrition.is_none()
    }
}

/// Folds a chat reply into the recommendation slot.
///
/// Each field is replaced wholesale by the response's value, and a field the response
/// leaves out is cleared. Nothing from `prior` survives.
pub fn merge_response(prior: RecommendationState, response: &ChatResponse) -> RecommendationState {
    if prior.recipes.is_some() && response.suggested_recipes.is_none() {
        debug!("Turn carried no recipes, clearing recipe panel");
    }
    if prior.nutrition.is_some() && response.nutrition_info.is_none() {
        debug!("Turn carried no nutrition block, clearing nutrition panel");
    }

    RecommendationState {
        recipes: response.suggested_recipes.clone(),
        nutrition: response.nutrition_info.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::endpoints::{ConversationId, Nutrition, Recipe};
    use std::collections::HashMap;

    fn recipe_match(id: u64, score: f64) -> RecipeMatch {
        RecipeMatch {
            recipe: Recipe {
                id,
                name: format!("recipe-{}", id),
                name_en: String::new(),
                category: "家常菜".to_string(),
                difficulty: "简单".to_string(),
                time: "10分钟".to_string(),
                servings: 1,
                ingredients: Vec::new(),
                substitutions: HashMap::new(),
                nutrition: Nutrition::default(),
                tags: Vec::new(),
                steps: Vec::new(),
                tips: Vec::new(),
            },
            match_score: score,
            matched_ingredients: Vec::new(),
            missing_ingredients: Vec::new(),
        }
    }

    fn nutrition_block(calories: f64) -> NutritionSummary {
        NutritionSummary {
            per_serving: Nutrition {
                calories,
                ..Default::default()
            },
            daily_percentage: HashMap::new(),
            health_tips: Vec::new(),
        }
    }

    fn response(
        recipes: Option<Vec<RecipeMatch>>,
        nutrition: Option<NutritionSummary>,
    ) -> ChatResponse {
        ChatResponse {
            message: "ok".to_string(),
            conversation_id: ConversationId::new("c1"),
            suggested_recipes: recipes,
            detected_ingredients: None,
            detected_restrictions: None,
            nutrition_info: nutrition,
        }
    }

    #[test]
    fn test_recipes_replace_rather_than_accumulate() {
        let first = merge_response(
            RecommendationState::default(),
            &response(Some(vec![recipe_match(1, 0.9), recipe_match(2, 0.5)]), None),
        );
        let second = merge_response(first, &response(Some(vec![recipe_match(3, 0.7)]), None));

        let ids: Vec<u64> = second.recipes().iter().map(|m| m.recipe.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_absent_recipes_clear_the_panel() {
        let with_recipes = merge_response(
            RecommendationState::default(),
            &response(Some(vec![recipe_match(1, 0.9)]), Some(nutrition_block(300.0))),
        );
        assert!(with_recipes.has_recipes());

        let cleared = merge_response(with_recipes, &response(None, None));
        assert!(cleared.recipes.is_none());
        assert!(cleared.nutrition.is_none());
        assert!(cleared.is_empty());
    }

    #[test]
    fn test_nutrition_replaced_independently_of_recipes() {
        let first = merge_response(
            RecommendationState::default(),
            &response(Some(vec![recipe_match(1, 0.9)]), None),
        );
        let second = merge_response(first, &response(None, Some(nutrition_block(420.0))));

        assert!(second.recipes.is_none());
        assert_eq!(second.nutrition.unwrap().per_serving.calories, 420.0);
    }

    #[test]
    fn test_empty_recipe_list_is_present_but_hidden() {
        let state = merge_response(
            RecommendationState::default(),
            &response(Some(Vec::new()), None),
        );
        assert_eq!(state.recipes, Some(Vec::new()));
        assert!(!state.has_recipes());
        assert!(state.is_empty());
    }

    #[test]
    fn test_server_order_is_preserved() {
        let state = merge_response(
            RecommendationState::default(),
            &response(
                Some(vec![recipe_match(5, 0.4), recipe_match(2, 0.95), recipe_match(9, 0.6)]),
                None,
            ),
        );
        let ids: Vec<u64> = state.recipes().iter().map(|m| m.recipe.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }
}
