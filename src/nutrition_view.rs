use std::fmt;

use crate::api_connection::endpoints::{Nutrition, NutritionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    Calories,
    Protein,
    Fat,
    Carbs,
    Fiber,
}

impl Nutrient {
    /// Fixed display order.
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbs,
        Nutrient::Fiber,
    ];

    /// Key used in the `daily_percentage` map.
    pub fn key(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Carbs => "carbs",
            Nutrient::Fiber => "fiber",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Nutrient::Calories => "热量",
            Nutrient::Protein => "蛋白质",
            Nutrient::Fat => "脂肪",
            Nutrient::Carbs => "碳水",
            Nutrient::Fiber => "纤维",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Nutrient::Calories => "千卡",
            _ => "克",
        }
    }

    /// Only the headline rows carry a daily-value figure.
    pub fn shows_daily_percentage(&self) -> bool {
        matches!(self, Nutrient::Calories | Nutrient::Protein | Nutrient::Fat)
    }

    fn amount(&self, nutrition: &Nutrition) -> f64 {
        match self {
            Nutrient::Calories => nutrition.calories,
            Nutrient::Protein => nutrition.protein,
            Nutrient::Fat => nutrition.fat,
            Nutrient::Carbs => nutrition.carbs,
            Nutrient::Fiber => nutrition.fiber,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientRow {
    pub nutrient: Nutrient,
    pub value: f64,
    pub daily_percentage: Option<f64>,
}

impl NutrientRow {
    pub fn value_label(&self) -> String {
        format!("{}{}", self.value, self.nutrient.unit())
    }

    pub fn daily_percentage_label(&self) -> Option<String> {
        self.daily_percentage.map(|p| format!("占日需{}%", p))
    }
}

/// Per-serving nutrition panel.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionView {
    rows: [NutrientRow; 5],
    health_tips: Vec<String>,
}

impl NutritionView {
    pub fn from_summary(summary: &NutritionSummary) -> Self {
        let rows = Nutrient::ALL.map(|nutrient| {
            // A zero percentage is hidden like a missing one.
            // TODO: decide with the API owners whether 0% should render as "占日需0%".
            let daily_percentage = nutrient
                .shows_daily_percentage()
                .then(|| summary.daily_percentage.get(nutrient.key()).copied())
                .flatten()
                .filter(|p| *p != 0.0 && !p.is_nan());
            NutrientRow {
                nutrient,
                value: nutrient.amount(&summary.per_serving),
                daily_percentage,
            }
        });

        Self {
            rows,
            health_tips: summary.health_tips.clone(),
        }
    }

    pub fn rows(&self) -> &[NutrientRow] {
        &self.rows
    }

    /// Calories, protein, fat.
    pub fn primary_rows(&self) -> &[NutrientRow] {
        &self.rows[..3]
    }

    /// Carbs, fiber.
    pub fn secondary_rows(&self) -> &[NutrientRow] {
        &self.rows[3..]
    }

    /// `None` when there are no tips, so no empty section gets drawn.
    pub fn health_tips(&self) -> Option<&[String]> {
        (!self.health_tips.is_empty()).then_some(self.health_tips.as_slice())
    }
}

impl fmt::Display for NutritionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "营养信息（每份）")?;
        for row in self.primary_rows() {
            write!(f, "  {} {}", row.nutrient.label(), row.value_label())?;
            if let Some(label) = row.daily_percentage_label() {
                write!(f, "  ({})", label)?;
            }
            writeln!(f)?;
        }
        for row in self.secondary_rows() {
            writeln!(f, "  {} {}", row.nutrient.label(), row.value_label())?;
        }
        if let Some(tips) = self.health_tips() {
            writeln!(f, "💡 健康提示")?;
            for tip in tips {
                writeln!(f, "  - {}", tip)?;
            }
        }
        Ok(())
    }
}
