//! Message handling: `/start` greeting or a question for the pipeline

use vidquery_nlsql::QueryPipeline;

/// Reply to `/start`
pub const GREETING: &str = "Привет! Я бот для аналитики по видео.\n\n\
Примеры:\n\
• Сколько всего видео есть в системе?\n\
• На сколько просмотров в сумме выросли все видео 28 ноября 2025?\n";

/// What an incoming text asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming<'a> {
    Start,
    Question(&'a str),
}

/// Classify a text message. `/start`, `/start@bot_name` and `/start <payload>`
/// are all the start command.
pub fn classify(text: &str) -> Incoming<'_> {
    let trimmed = text.trim();
    let command = trimmed.split_whitespace().next().unwrap_or("");
    let command = command.split('@').next().unwrap_or("");

    if command == "/start" {
        Incoming::Start
    } else {
        Incoming::Question(trimmed)
    }
}

/// Reply text for one incoming message
pub async fn reply(pipeline: &QueryPipeline, text: &str) -> String {
    match classify(text) {
        Incoming::Start => GREETING.to_string(),
        Incoming::Question(question) => pipeline.answer(question).await,
    }
}
