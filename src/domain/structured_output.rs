//! 结构化输出提取
//!
//! 模型被要求只返回 JSON，但并不总是遵守。
//! 提取流程：
//! 1. 去掉 markdown 代码围栏（``` / ```json）
//! 2. 从每个 `{` / `[` 候选起点用 serde_json 流式解析第一个完整值
//! 3. 第一个能反序列化为目标类型的值胜出，最多尝试 `MAX_CANDIDATES` 个起点

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// 候选起点上限，避免大段带括号的正文反复解析
const MAX_CANDIDATES: usize = 32;

/// 结构化输出错误
#[derive(Debug, Error, PartialEq)]
pub enum StructuredOutputError {
    #[error("Model did not return valid structured output: no JSON value found")]
    NoJsonValue,

    #[error("Model did not return valid structured output: {0}")]
    Invalid(String),
}

/// 从模型原始文本中提取并解析 JSON
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, StructuredOutputError> {
    let text = strip_code_fences(raw);
    let mut last_error: Option<String> = None;

    let starts = text
        .char_indices()
        .filter(|(_, ch)| *ch == '{' || *ch == '[')
        .map(|(start, _)| start)
        .take(MAX_CANDIDATES);
    for start in starts {

        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => match serde_json::from_value::<T>(value) {
                Ok(parsed) => return Ok(parsed),
                Err(e) => last_error = Some(e.to_string()),
            },
            Some(Err(e)) => {
                if last_error.is_none() {
                    last_error = Some(e.to_string());
                }
            }
            None => {}
        }
    }

    match last_error {
        Some(e) => Err(StructuredOutputError::Invalid(e)),
        None => Err(StructuredOutputError::NoJsonValue),
    }
}

fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        if rest
            .get(..4)
            .map_or(false, |tag| tag.eq_ignore_ascii_case("json"))
        {
            rest = &rest[4..];
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::novel::{ChapterPlan, ConsistencyReport};

    #[test]
    fn test_plain_json() {
        let report: ConsistencyReport =
            extract_json(r#"{"passed": true, "issues": [], "suggestions": []}"#).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let raw = "好的，以下是审核结果：\n```json\n{\"passed\": false, \"issues\": [\"时间线矛盾\"]}\n```\n希望对你有帮助。";
        let report: ConsistencyReport = extract_json(raw).unwrap();
        assert!(!report.passed);
        assert_eq!(report.issues, vec!["时间线矛盾".to_string()]);
    }

    #[test]
    fn test_trailing_braces_in_prose_are_ignored() {
        let raw = r#"{"passed": true} 注意：{这不是 JSON}"#;
        let report: ConsistencyReport = extract_json(raw).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn test_skips_non_matching_leading_value() {
        let raw = r#"[1, 2] 然后 {"volumes": [{"title": "卷一", "chapters": []}]}"#;
        let plan: ChapterPlan = extract_json(raw).unwrap();
        assert_eq!(plan.volumes.len(), 1);
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"{"passed": false, "issues": ["角色说了 \"}\" 这种话"]}"#;
        let report: ConsistencyReport = extract_json(raw).unwrap();
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_no_json() {
        let result: Result<ConsistencyReport, _> = extract_json("完全没有结构化内容");
        assert_eq!(result, Err(StructuredOutputError::NoJsonValue));
    }

    #[test]
    fn test_truncated_json_is_invalid() {
        let result: Result<ConsistencyReport, _> = extract_json(r#"{"passed": tr"#);
        assert!(matches!(result, Err(StructuredOutputError::Invalid(_))));
    }

    #[test]
    fn test_wrong_shape_is_invalid() {
        let result: Result<ChapterPlan, _> = extract_json(r#"{"chapters": []}"#);
        assert!(matches!(result, Err(StructuredOutputError::Invalid(_))));
    }

    #[test]
    fn test_candidate_starts_are_capped() {
        let mut raw = "[注] ".repeat(MAX_CANDIDATES);
        raw.push_str(r#"{"passed": true}"#);
        let result: Result<ConsistencyReport, _> = extract_json(&raw);
        assert!(matches!(result, Err(StructuredOutputError::Invalid(_))));

        // 上限之内的值仍能找到
        let mut raw = "[注] ".repeat(MAX_CANDIDATES - 1);
        raw.push_str(r#"{"passed": true}"#);
        let report: ConsistencyReport = extract_json(&raw).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn test_bracket_heavy_prose_fails_fast() {
        let raw = "[第一章[回忆{".repeat(20_000);
        let result: Result<ConsistencyReport, _> = extract_json(&raw);
        assert!(matches!(result, Err(StructuredOutputError::Invalid(_))));
    }
}
