//! Prompt construction
//!
//! The system instruction is fixed for the life of the process: the schema
//! of both tables, the rule for numeric-looking ids, the output format, and
//! three worked examples. Only the user message varies per question.

use vidquery_llm::Message;

/// Schema description and answering rules sent as the system message
pub const SCHEMA_DESCRIPTION: &str = r#"
У тебя есть база данных PostgreSQL с двумя таблицами.

ВАЖНО:
- id, creator_id и video_id — UUID (строки вида xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx).
- Если в вопросе указан id как число (например "42"), трактуй это как строку: creator_id = '42'.
- Отвечай ТОЛЬКО одним SQL-запросом. Никаких пояснений, списков, markdown, ``` или `...`.

Таблица videos (итоговая статистика по ролику):
  id — UUID, идентификатор видео (первичный ключ)
  creator_id — UUID, идентификатор создателя
  video_created_at — TIMESTAMPTZ, время публикации видео
  views_count — INTEGER, итоговое число просмотров
  likes_count — INTEGER, итоговое число лайков
  comments_count — INTEGER, итоговое число комментариев
  reports_count — INTEGER, итоговое число жалоб
  created_at — TIMESTAMPTZ, время создания записи
  updated_at — TIMESTAMPTZ, время обновления записи

Таблица video_snapshots (почасовые замеры по ролику):
  id — UUID, идентификатор снапшота (первичный ключ)
  video_id — UUID, ссылка на videos.id
  views_count — INTEGER, текущее число просмотров на момент замера
  likes_count — INTEGER, текущее число лайков
  comments_count — INTEGER, текущее число комментариев
  reports_count — INTEGER, текущее число жалоб
  delta_views_count — INTEGER, прирост просмотров с предыдущего снапшота
  delta_likes_count — INTEGER, прирост лайков
  delta_comments_count — INTEGER, прирост комментариев
  delta_reports_count — INTEGER, прирост жалоб
  created_at — TIMESTAMPTZ, время замера (раз в час)
  updated_at — TIMESTAMPTZ, время обновления записи

Запрос должен возвращать ОДНО числовое значение и только читать данные.

Примеры (без кавычек ` и без markdown):

1) Сколько всего видео есть в системе?
SELECT COUNT(*) FROM videos;

2) Сколько видео у креатора с id 42 вышло с 1 ноября 2025 по 5 ноября 2025 включительно?
SELECT COUNT(*) FROM videos
WHERE creator_id = '42'
  AND video_created_at >= '2025-11-01'
  AND video_created_at <= '2025-11-05 23:59:59';

3) На сколько просмотров в сумме выросли все видео 28 ноября 2025?
SELECT COALESCE(SUM(delta_views_count),0)
FROM video_snapshots
WHERE DATE(created_at) = '2025-11-28';
"#;

/// Build the ordered `[system, user]` message pair for one question.
pub fn build_messages(question: &str) -> Vec<Message> {
    vec![
        Message::system(SCHEMA_DESCRIPTION),
        Message::user(question.trim()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidquery_llm::MessageRole;

    #[test]
    fn test_message_pair_order() {
        let messages = build_messages("  Сколько всего видео есть в системе?\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[1].content, "Сколько всего видео есть в системе?");
    }

    #[test]
    fn test_system_instruction_is_constant() {
        let a = build_messages("первый вопрос");
        let b = build_messages("второй вопрос");
        assert_eq!(a[0], b[0]);
    }

    #[test]
    fn test_schema_declares_both_tables() {
        for column in [
            "videos",
            "video_snapshots",
            "creator_id",
            "video_created_at",
            "delta_views_count",
            "delta_reports_count",
        ] {
            assert!(SCHEMA_DESCRIPTION.contains(column), "missing {}", column);
        }
    }

    #[test]
    fn test_schema_carries_rules_and_examples() {
        assert!(SCHEMA_DESCRIPTION.contains("creator_id = '42'"));
        assert!(SCHEMA_DESCRIPTION.contains("ТОЛЬКО одним SQL-запросом"));
        assert!(SCHEMA_DESCRIPTION.contains("SELECT COUNT(*) FROM videos;"));
        assert!(SCHEMA_DESCRIPTION.contains("COALESCE(SUM(delta_views_count),0)"));
    }
}
