use anyhow::{Context, Result};
use recipe_chat::api_connection::connection::RecipeApiClient;
use recipe_chat::api_connection::endpoints::{
    ConversationId, NutritionProfile, Recipe, RecipeFilter, RecipeMatch, RecipeSearchRequest,
    Role,
};
use recipe_chat::cli::{parse_args, parse_chat_input, ChatInput, Command};
use recipe_chat::config::ClientConfig;
use recipe_chat::logging::init_logging;
use recipe_chat::nutrition_view::NutritionView;
use recipe_chat::recommendation_view::RecommendationView;
use recipe_chat::session::{quick_question, ConversationSession, QUICK_QUESTIONS};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli_args = parse_args();
    init_logging(cli_args.verbose);

    let config = ClientConfig::from_env().with_overrides(cli_args.base_url, cli_args.timeout_secs);
    let client = RecipeApiClient::new(&config)
        .with_context(|| format!("Failed to set up API client for '{}'", config.base_url))?;
    info!(base_url = %client.base_url(), timeout = ?config.timeout, "Using recipe API");

    match cli_args.command {
        Command::Chat { transcript } => run_chat(&client, transcript.as_deref()).await?,
        Command::Recipes { tag, difficulty } => {
            let recipes = client
                .list_recipes(&RecipeFilter { tag, difficulty })
                .await
                .context("Failed to list recipes")?;
            for item in recipes {
                println!(
                    "{:>4}  {}  ({} · {})  {}",
                    item.id,
                    item.name,
                    item.time,
                    item.difficulty,
                    item.tags.join(" ")
                );
            }
        }
        Command::Recipe { id } => {
            let recipe = client
                .get_recipe(id)
                .await
                .with_context(|| format!("Failed to fetch recipe {}", id))?;
            print_recipe(&recipe);
        }
        Command::Search {
            ingredients,
            restrictions,
        } => {
            let request = RecipeSearchRequest {
                ingredients,
                restrictions: (!restrictions.is_empty()).then_some(restrictions),
            };
            let results = client
                .search_recipes(&request)
                .await
                .context("Recipe search failed")?;
            print_matches(&RecommendationView::new(), &results);
        }
        Command::Substitutions { id, ingredient } => {
            let suggestion = client
                .substitutions(id, &ingredient)
                .await
                .with_context(|| format!("Failed to fetch substitutions for '{}'", ingredient))?;
            if suggestion.database_substitutions.is_empty() {
                println!("{}: 数据库中暂无替代方案", suggestion.ingredient);
            } else {
                println!(
                    "{} 可替换为: {}",
                    suggestion.ingredient,
                    suggestion.database_substitutions.join("、")
                );
            }
            if let Some(ai) = suggestion.ai_suggestion {
                println!("{}", ai);
            }
        }
        Command::Nutrition { id } => {
            let report = client
                .recipe_nutrition(id)
                .await
                .with_context(|| format!("Failed to fetch nutrition for recipe {}", id))?;
            println!("{}", report.recipe_name);
            print!("{}", NutritionView::from_summary(&report.summary()));
        }
        Command::Diet { id, diet_type } => {
            let verdict = client
                .diet_suitability(id, &diet_type)
                .await
                .with_context(|| format!("Failed to check recipe {} against '{}'", id, diet_type))?;
            let mark = if verdict.suitable { "✓" } else { "✗" };
            println!(
                "{} {} [{}]: {}",
                mark, verdict.recipe_name, verdict.diet_type, verdict.message
            );
        }
        Command::Tag { tag } => {
            let recipes = client
                .recipes_by_tag(&tag)
                .await
                .with_context(|| format!("Failed to fetch recipes tagged '{}'", tag))?;
            for recipe in recipes {
                println!("{:>4}  {}  ({} · {})", recipe.id, recipe.name, recipe.time, recipe.difficulty);
            }
        }
        Command::DailyNeeds {
            weight,
            height,
            age,
            gender,
            activity_level,
        } => {
            let profile = NutritionProfile {
                weight,
                height,
                age,
                gender,
                activity_level,
            };
            let report = client
                .daily_needs(&profile)
                .await
                .context("Failed to compute daily needs")?;
            let needs = report.daily_needs;
            println!(
                "每日需求: 热量 {}千卡 · 蛋白质 {}克 · 脂肪 {}克 · 碳水 {}克 · 纤维 {}克",
                needs.calories, needs.protein, needs.fat, needs.carbs, needs.fiber
            );
        }
        Command::History { conversation_id } => {
            let history = client
                .conversation_history(&ConversationId::new(conversation_id))
                .await
                .context("Failed to fetch conversation history")?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::Health => {
            let status = client.health().await.context("Health check failed")?;
            println!(
                "{} {}",
                status.status,
                status.version.as_deref().unwrap_or_default()
            );
        }
    }

    Ok(())
}

async fn run_chat(client: &RecipeApiClient, transcript: Option<&Path>) -> Result<()> {
    let mut session = ConversationSession::new();
    let (conversation_id, greeting) = session
        .initialize(client)
        .await
        .context("Could not start a conversation")?;
    info!(%conversation_id, "Chat session ready");

    println!("🤖 {}", greeting);
    if session.awaiting_first_question() {
        println!("\n试试这样问:");
        for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
            println!("  {}. {}", i + 1, question);
        }
    }
    println!("\n(:ask N 发送第 N 个快捷问题, :expand N 展开/收起第 N 个菜谱, :quit 退出)\n");

    let mut view = RecommendationView::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_chat_input(&line) {
            ChatInput::Quit => break,
            ChatInput::Help => println!(
                ":ask N 发送快捷问题, :expand N 展开/收起第 N 个菜谱, :quit 退出, 以 : 开头的消息写作 ::"
            ),
            ChatInput::Unknown(command) => println!("未知命令: {}", command),
            ChatInput::Toggle(n) => {
                let recipes = session.recommendation().recipes();
                match recipes.get(n - 1) {
                    Some(entry) => {
                        view.toggle(entry.recipe.id);
                        print_matches(&view, recipes);
                    }
                    None => println!("没有第 {} 个菜谱", n),
                }
            }
            ChatInput::Ask(n) => match quick_question(n) {
                Some(question) => {
                    println!("> {}", question);
                    send_and_show(client, &mut session, &mut view, question).await;
                }
                None => println!("没有第 {} 个快捷问题", n),
            },
            ChatInput::Message(text) => {
                send_and_show(client, &mut session, &mut view, &text).await;
            }
        }
    }

    if let (Some(path), Some(conversation)) = (transcript, session.conversation()) {
        let json = conversation.to_json()?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write transcript to '{}'", path.display()))?;
        println!("对话已保存到 {}", path.display());
    }

    Ok(())
}

async fn send_and_show(
    client: &RecipeApiClient,
    session: &mut ConversationSession,
    view: &mut RecommendationView,
    text: &str,
) {
    let before = session.messages().len();
    session.submit(client, text).await;
    if session.messages().len() == before {
        return;
    }

    view.reset();
    for message in &session.messages()[before..] {
        if message.role == Role::Assistant {
            println!("\n🤖 {}\n", message.content);
        }
    }
    let recommendation = session.recommendation();
    if recommendation.has_recipes() {
        println!("推荐菜谱");
        print_matches(view, recommendation.recipes());
    }
    if let Some(nutrition) = &recommendation.nutrition {
        println!("{}", NutritionView::from_summary(nutrition));
    }
}

fn print_matches(view: &RecommendationView, matches: &[RecipeMatch]) {
    for (i, card) in view.cards(matches).iter().enumerate() {
        println!("{}. {}\n", i + 1, card);
    }
}

fn print_recipe(recipe: &Recipe) {
    println!("{} ({})", recipe.name, recipe.name_en);
    println!("{} · {} · {} · {}人份", recipe.category, recipe.time, recipe.difficulty, recipe.servings);
    if !recipe.tags.is_empty() {
        println!("标签: {}", recipe.tags.join(" "));
    }
    println!("\n食材:");
    for ingredient in &recipe.ingredients {
        print!("  - {} {}", ingredient.name, ingredient.amount);
        if let Some(subs) = recipe.substitutions.get(&ingredient.name) {
            print!("  (可替换: {})", subs.join("、"));
        }
        println!();
    }
    println!("\n步骤:");
    for (i, step) in recipe.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    for tip in &recipe.tips {
        println!("💡 {}", tip);
    }
}
