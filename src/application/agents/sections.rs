//! 提示词公共段落
//!
//! 每个函数在内容缺失时返回 None，由调用方跳过

use crate::application::ports::{CharacterRecord, NovelRecord};

/// 拼接段落，跳过空段落
pub(super) fn compose(parts: Vec<Option<String>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 取末尾 n 个字符
pub(super) fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if total <= n {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

pub(super) fn world_section(novel: &NovelRecord) -> Option<String> {
    let settings = novel.world_settings.as_ref().filter(|s| !s.is_empty())?;

    let mut lines = vec!["世界观设定：".to_string()];
    if let Some(time) = settings.time_background.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("- 时间背景：{}", time));
    }
    if !settings.world_rules.is_empty() {
        lines.push(format!("- 世界规则：{}", settings.world_rules.join("；")));
    }
    if let Some(power) = settings.power_system.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("- 力量体系：{}", power));
    }
    if !settings.forbidden_rules.is_empty() {
        lines.push(format!(
            "- 禁忌规则：{}",
            settings.forbidden_rules.join("；")
        ));
    }
    Some(lines.join("\n"))
}

pub(super) fn character_section(characters: &[CharacterRecord]) -> Option<String> {
    if characters.is_empty() {
        return None;
    }
    let lines: Vec<String> = characters
        .iter()
        .map(|c| {
            format!(
                "- {}（{}）：{}",
                c.name,
                c.role.as_deref().unwrap_or("未定"),
                c.personality.join("、")
            )
        })
        .collect();
    Some(format!("人物信息：\n{}", lines.join("\n")))
}

pub(super) fn knowledge_section(label: &str, knowledge: &[String]) -> Option<String> {
    if knowledge.is_empty() {
        return None;
    }
    Some(format!("{}：\n{}", label, knowledge.join("\n\n")))
}

pub(super) fn optional_line(label: &str, value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| format!("{}：{}", label, v))
}

pub(super) fn list_line(label: &str, items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(format!("{}：{}", label, items.join("、")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_chars_is_char_aware() {
        assert_eq!(tail_chars("一二三四五", 2), "四五");
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(tail_chars("", 3), "");
    }

    #[test]
    fn test_compose_skips_missing() {
        let text = compose(vec![Some("a".into()), None, Some("  ".into()), Some("b".into())]);
        assert_eq!(text, "a\n\nb");
    }

    #[test]
    fn test_world_section_omitted_when_empty() {
        let novel = NovelRecord::draft("u", "t");
        assert!(world_section(&novel).is_none());
        assert!(character_section(&[]).is_none());
        assert!(knowledge_section("额外知识库", &[]).is_none());
    }
}
