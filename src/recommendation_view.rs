use std::collections::HashMap;
use std::fmt;

use crate::api_connection::endpoints::{RecipeId, RecipeMatch};

pub const MISSING_PREVIEW_LIMIT: usize = 3;
pub const TAG_LIMIT: usize = 3;
pub const STEP_PREVIEW_LIMIT: usize = 3;
pub const INGREDIENT_SEPARATOR: &str = "、";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyClass {
    Simple,
    Medium,
    Hard,
    /// Anything the server sends that we don't recognize.
    Neutral,
}

impl DifficultyClass {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "简单" | "simple" | "easy" => DifficultyClass::Simple,
            "中等" | "medium" => DifficultyClass::Medium,
            "困难" | "hard" => DifficultyClass::Hard,
            _ => DifficultyClass::Neutral,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            DifficultyClass::Simple => "🟢",
            DifficultyClass::Medium => "🟡",
            DifficultyClass::Hard => "🔴",
            DifficultyClass::Neutral => "⚪",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disclosure {
    #[default]
    Collapsed,
    Expanded,
}

impl Disclosure {
    pub fn toggled(self) -> Self {
        match self {
            Disclosure::Collapsed => Disclosure::Expanded,
            Disclosure::Expanded => Disclosure::Collapsed,
        }
    }

    pub fn is_expanded(self) -> bool {
        self == Disclosure::Expanded
    }
}

/// Per-card expand/collapse flags, keyed by recipe id. Each entry is independent
/// and any number can be expanded at once.
#[derive(Debug, Clone, Default)]
pub struct DisclosureArena {
    states: HashMap<RecipeId, Disclosure>,
}

impl DisclosureArena {
    pub fn get(&self, id: RecipeId) -> Disclosure {
        self.states.get(&id).copied().unwrap_or_default()
    }

    pub fn toggle(&mut self, id: RecipeId) -> Disclosure {
        let state = self.states.entry(id).or_default();
        *state = state.toggled();
        *state
    }

    pub fn expanded_count(&self) -> usize {
        self.states.values().filter(|d| d.is_expanded()).count()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

/// `round(score * 100)` as a percentage badge. Out-of-range scores are clamped.
pub fn format_match_score(score: f64) -> String {
    let percent = if score.is_nan() {
        0.0
    } else {
        (score.clamp(0.0, 1.0) * 100.0).round()
    };
    format!("{}%", percent as u32)
}

pub fn matched_summary(matched: &[String]) -> Option<String> {
    if matched.is_empty() {
        return None;
    }
    Some(matched.join(INGREDIENT_SEPARATOR))
}

/// First three missing ingredients; longer lists get a suffix with the total count.
pub fn missing_summary(missing: &[String]) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    let shown = &missing[..missing.len().min(MISSING_PREVIEW_LIMIT)];
    let mut summary = shown.join(INGREDIENT_SEPARATOR);
    if missing.len() > MISSING_PREVIEW_LIMIT {
        summary.push_str(&format!(" 等{}种", missing.len()));
    }
    Some(summary)
}

pub fn visible_tags(tags: &[String]) -> &[String] {
    &tags[..tags.len().min(TAG_LIMIT)]
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepPreview<'a> {
    pub steps: &'a [String],
    pub remaining: usize,
}

pub fn step_preview(steps: &[String]) -> StepPreview<'_> {
    let shown = steps.len().min(STEP_PREVIEW_LIMIT);
    StepPreview {
        steps: &steps[..shown],
        remaining: steps.len() - shown,
    }
}

/// One recommendation card, ready to draw.
#[derive(Debug, Clone, Copy)]
pub struct RecipeCardView<'a> {
    entry: &'a RecipeMatch,
    disclosure: Disclosure,
}

impl<'a> RecipeCardView<'a> {
    pub fn new(entry: &'a RecipeMatch, disclosure: Disclosure) -> Self {
        Self { entry, disclosure }
    }

    pub fn recipe_id(&self) -> RecipeId {
        self.entry.recipe.id
    }

    pub fn name(&self) -> &'a str {
        &self.entry.recipe.name
    }

    pub fn disclosure(&self) -> Disclosure {
        self.disclosure
    }

    pub fn badge(&self) -> String {
        format_match_score(self.entry.match_score)
    }

    pub fn difficulty_class(&self) -> DifficultyClass {
        DifficultyClass::from_label(&self.entry.recipe.difficulty)
    }

    pub fn tags(&self) -> &'a [String] {
        visible_tags(&self.entry.recipe.tags)
    }

    pub fn matched_line(&self) -> Option<String> {
        matched_summary(&self.entry.matched_ingredients).map(|s| format!("已有: {}", s))
    }

    pub fn missing_line(&self) -> Option<String> {
        missing_summary(&self.entry.missing_ingredients).map(|s| format!("还需: {}", s))
    }

    /// Only available while expanded.
    pub fn steps(&self) -> Option<StepPreview<'a>> {
        self.disclosure
            .is_expanded()
            .then(|| step_preview(&self.entry.recipe.steps))
    }

    /// First tip, only while expanded.
    pub fn tip(&self) -> Option<&'a str> {
        if !self.disclosure.is_expanded() {
            return None;
        }
        self.entry.recipe.tips.first().map(String::as_str)
    }

    pub fn nutrition_line(&self) -> Option<String> {
        if !self.disclosure.is_expanded() {
            return None;
        }
        let nutrition = &self.entry.recipe.nutrition;
        Some(format!(
            "{}卡 · 蛋白质 {}g · 脂肪 {}g",
            nutrition.calories, nutrition.protein, nutrition.fat
        ))
    }
}

impl fmt::Display for RecipeCardView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recipe = &self.entry.recipe;
        writeln!(f, "{}  [{} 匹配度]", recipe.name, self.badge())?;
        writeln!(
            f,
            "  {} · {} {}",
            recipe.time,
            self.difficulty_class().marker(),
            recipe.difficulty
        )?;

        let tags = self.tags();
        if !tags.is_empty() {
            let joined: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
            writeln!(f, "  {}", joined.join(" "))?;
        }
        if let Some(line) = self.matched_line() {
            writeln!(f, "  ✓ {}", line)?;
        }
        if let Some(line) = self.missing_line() {
            writeln!(f, "  ✗ {}", line)?;
        }

        if let Some(line) = self.nutrition_line() {
            writeln!(f, "  {}", line)?;
        }
        if let Some(preview) = self.steps() {
            writeln!(f, "  制作步骤:")?;
            for (i, step) in preview.steps.iter().enumerate() {
                writeln!(f, "    {}. {}", i + 1, step)?;
            }
            if preview.remaining > 0 {
                writeln!(f, "    ...还有{}步", preview.remaining)?;
            }
        }
        if let Some(tip) = self.tip() {
            writeln!(f, "  💡 {}", tip)?;
        }

        let toggle = if self.disclosure.is_expanded() {
            "收起详情"
        } else {
            "查看详情"
        };
        write!(f, "  [{}]", toggle)
    }
}

/// Ranked match list in server order, with its own disclosure state.
#[derive(Debug, Clone, Default)]
pub struct RecommendationView {
    disclosure: DisclosureArena,
}

impl RecommendationView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget expand state, e.g. when the recommendation slot is replaced.
    pub fn reset(&mut self) {
        self.disclosure.clear();
    }

    pub fn toggle(&mut self, id: RecipeId) -> Disclosure {
        self.disclosure.toggle(id)
    }

    pub fn disclosure(&self, id: RecipeId) -> Disclosure {
        self.disclosure.get(id)
    }

    pub fn cards<'a>(&self, matches: &'a [RecipeMatch]) -> Vec<RecipeCardView<'a>> {
        matches
            .iter()
            .map(|entry| RecipeCardView::new(entry, self.disclosure.get(entry.recipe.id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::endpoints::{Nutrition, Recipe};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_match(id: RecipeId) -> RecipeMatch {
        RecipeMatch {
            recipe: Recipe {
                id,
                name: "番茄炒蛋".to_string(),
                name_en: "Tomato Scrambled Eggs".to_string(),
                category: "家常菜".to_string(),
                difficulty: "简单".to_string(),
                time: "15分钟".to_string(),
                servings: 2,
                ingredients: Vec::new(),
                substitutions: HashMap::new(),
                nutrition: Nutrition {
                    calories: 150.0,
                    protein: 10.0,
                    fat: 8.5,
                    carbs: 6.0,
                    fiber: 1.0,
                },
                tags: strings(&["家常", "快手", "下饭", "经典"]),
                steps: strings(&["打蛋", "切番茄", "炒蛋", "炒番茄", "混合"]),
                tips: strings(&["鸡蛋要炒嫩", "番茄去皮口感更好"]),
            },
            match_score: 0.873,
            matched_ingredients: strings(&["番茄", "鸡蛋"]),
            missing_ingredients: strings(&["a", "b", "c", "d", "e"]),
        }
    }

    #[test]
    fn test_match_score_percentages() {
        assert_eq!(format_match_score(0.873), "87%");
        assert_eq!(format_match_score(1.0), "100%");
        assert_eq!(format_match_score(0.0), "0%");
        assert_eq!(format_match_score(0.92), "92%");
        assert_eq!(format_match_score(0.875), "88%");
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        assert_eq!(format_match_score(1.4), "100%");
        assert_eq!(format_match_score(-0.2), "0%");
        assert_eq!(format_match_score(f64::NAN), "0%");
    }

    #[test]
    fn test_missing_summary_shows_three_plus_total() {
        assert_eq!(
            missing_summary(&strings(&["a", "b", "c", "d", "e"])).as_deref(),
            Some("a、b、c 等5种")
        );
        assert_eq!(
            missing_summary(&strings(&["a", "b", "c"])).as_deref(),
            Some("a、b、c")
        );
        assert_eq!(missing_summary(&[]), None);
    }

    #[test]
    fn test_matched_summary_is_never_truncated() {
        let matched = strings(&["a", "b", "c", "d", "e"]);
        assert_eq!(matched_summary(&matched).as_deref(), Some("a、b、c、d、e"));
        assert_eq!(matched_summary(&[]), None);
    }

    #[test]
    fn test_tags_and_steps_are_limited() {
        let entry = sample_match(1);
        assert_eq!(visible_tags(&entry.recipe.tags), &["家常", "快手", "下饭"]);

        let preview = step_preview(&entry.recipe.steps);
        assert_eq!(preview.steps.len(), 3);
        assert_eq!(preview.remaining, 2);

        let short = strings(&["only"]);
        assert_eq!(step_preview(&short).remaining, 0);
    }

    #[test]
    fn test_difficulty_classes() {
        assert_eq!(DifficultyClass::from_label("简单"), DifficultyClass::Simple);
        assert_eq!(DifficultyClass::from_label("中等"), DifficultyClass::Medium);
        assert_eq!(DifficultyClass::from_label("困难"), DifficultyClass::Hard);
        assert_eq!(DifficultyClass::from_label("Hard"), DifficultyClass::Hard);
        assert_eq!(DifficultyClass::from_label("大师级"), DifficultyClass::Neutral);
        assert_eq!(DifficultyClass::from_label(""), DifficultyClass::Neutral);
    }

    #[test]
    fn test_collapsed_card_hides_details() {
        let entry = sample_match(1);
        let card = RecipeCardView::new(&entry, Disclosure::Collapsed);
        assert_eq!(card.badge(), "87%");
        assert_eq!(card.matched_line().as_deref(), Some("已有: 番茄、鸡蛋"));
        assert_eq!(card.missing_line().as_deref(), Some("还需: a、b、c 等5种"));
        assert!(card.steps().is_none());
        assert!(card.tip().is_none());
        assert!(card.nutrition_line().is_none());

        let rendered = card.to_string();
        assert!(rendered.contains("[87% 匹配度]"));
        assert!(rendered.contains("15分钟 · 🟢 简单"));
        assert!(rendered.contains("#家常 #快手 #下饭"));
        assert!(!rendered.contains("#经典"));
        assert!(rendered.contains("查看详情"));
    }

    #[test]
    fn test_expanded_card_shows_steps_and_first_tip() {
        let entry = sample_match(1);
        let card = RecipeCardView::new(&entry, Disclosure::Expanded);
        assert_eq!(card.tip(), Some("鸡蛋要炒嫩"));
        assert_eq!(
            card.nutrition_line().as_deref(),
            Some("150卡 · 蛋白质 10g · 脂肪 8.5g")
        );

        let rendered = card.to_string();
        assert!(rendered.contains("3. 炒蛋"));
        assert!(!rendered.contains("炒番茄"));
        assert!(rendered.contains("...还有2步"));
        assert!(rendered.contains("💡 鸡蛋要炒嫩"));
        assert!(!rendered.contains("番茄去皮口感更好"));
        assert!(rendered.contains("收起详情"));
    }

    #[test]
    fn test_toggling_one_card_leaves_others_alone() {
        let matches = vec![sample_match(1), sample_match(2), sample_match(3)];
        let mut view = RecommendationView::new();

        assert_eq!(view.toggle(2), Disclosure::Expanded);
        assert_eq!(view.toggle(3), Disclosure::Expanded);
        assert_eq!(view.disclosure.expanded_count(), 2);

        let states: Vec<Disclosure> = view.cards(&matches).iter().map(|c| c.disclosure()).collect();
        assert_eq!(
            states,
            vec![Disclosure::Collapsed, Disclosure::Expanded, Disclosure::Expanded]
        );

        assert_eq!(view.toggle(2), Disclosure::Collapsed);
        assert_eq!(view.disclosure(3), Disclosure::Expanded);

        view.reset();
        assert_eq!(view.disclosure(3), Disclosure::Collapsed);
    }

    #[test]
    fn test_cards_keep_server_order() {
        let matches = vec![sample_match(9), sample_match(4), sample_match(7)];
        let view = RecommendationView::new();
        let ids: Vec<RecipeId> = view.cards(&matches).iter().map(|c| c.recipe_id()).collect();
        assert_eq!(ids, vec![9, 4, 7]);
    }
}
