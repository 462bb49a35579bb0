//! Разбор иерархических имён топиков.
//!
//! Топик — непустая строка, уровни которой разделены точкой (`a.b.c`).
//! Сопоставление только по точному совпадению строк, без шаблонов.

use crate::error::TopicError;

/// Разделитель уровней иерархии.
pub const SEPARATOR: char = '.';

/// Проверяет, что топик непустой и не содержит пустых сегментов
/// (ведущая, завершающая или двойная точка).
pub fn validate(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }
    match topic.split(SEPARATOR).position(str::is_empty) {
        Some(position) => Err(TopicError::EmptySegment {
            topic: topic.to_string(),
            position,
        }),
        None => Ok(()),
    }
}

/// Возвращает цепочку предков топика от корня к листу, включая сам топик.
///
/// Для `a.b.c` результат `[a, a.b, a.b.c]`. Элементы заимствуют
/// исходную строку.
pub fn ancestors(topic: &str) -> Result<Vec<&str>, TopicError> {
    validate(topic)?;
    Ok(chain(topic).collect())
}

/// Цепочка предков без валидации. Вызывающий гарантирует корректность
/// топика.
pub(crate) fn chain(topic: &str) -> impl Iterator<Item = &str> {
    topic
        .match_indices(SEPARATOR)
        .map(move |(idx, _)| &topic[..idx])
        .chain(std::iter::once(topic))
}

/// `true`, если `candidate` совпадает с `prefix` или лежит под ним
/// по границе сегментов (`topic.sub` под `topic`, но не `topics`).
pub fn is_self_or_descendant(
    candidate: &str,
    prefix: &str,
) -> bool {
    match candidate.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Первый сегмент топика.
pub fn root(topic: &str) -> &str {
    topic.split(SEPARATOR).next().unwrap_or(topic)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_ancestors_root_to_leaf() {
        assert_eq!(ancestors("a.b.c").unwrap(), vec!["a", "a.b", "a.b.c"]);
        assert_eq!(ancestors("single").unwrap(), vec!["single"]);
    }

    /// Тест проверяет, что элементы цепочки ссылаются на исходную строку,
    /// а не на копии.
    #[test]
    fn test_ancestors_borrow_input() {
        let topic = String::from("x.y");
        let chain = ancestors(&topic).unwrap();
        assert_eq!(chain[1].as_ptr(), topic.as_ptr());
    }

    #[rstest]
    #[case("", TopicError::Empty)]
    #[case(".a", TopicError::EmptySegment { topic: ".a".into(), position: 0 })]
    #[case("a.", TopicError::EmptySegment { topic: "a.".into(), position: 1 })]
    #[case("a..b", TopicError::EmptySegment { topic: "a..b".into(), position: 1 })]
    #[case(".", TopicError::EmptySegment { topic: ".".into(), position: 0 })]
    fn test_validate_rejects_malformed(
        #[case] topic: &str,
        #[case] expected: TopicError,
    ) {
        assert_eq!(validate(topic), Err(expected.clone()));
        assert_eq!(ancestors(topic), Err(expected));
    }

    #[rstest]
    #[case("topic", "topic", true)]
    #[case("topic.sub", "topic", true)]
    #[case("topic.sub.x", "topic.sub", true)]
    #[case("topics", "topic", false)]
    #[case("topic", "topic.sub", false)]
    #[case("@unsuball", "@unsub", false)]
    #[case("@unsub.topic", "@unsub", true)]
    fn test_is_self_or_descendant(
        #[case] candidate: &str,
        #[case] prefix: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_self_or_descendant(candidate, prefix), expected);
    }

    #[test]
    fn test_root_segment() {
        assert_eq!(root("@sub.topic.subtopic"), "@sub");
        assert_eq!(root("plain"), "plain");
    }
}
