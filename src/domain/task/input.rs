//! 任务输入
//!
//! Task.input 为可选 JSON；缺省或 null 时使用各输入的默认值

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::novel::GenerationMode;

/// 解析任务输入，None / null 返回默认值
pub fn parse_input<T>(input: Option<&Value>) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    match input {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value),
    }
}

/// outline 任务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineInput {
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_outline: Option<String>,
}

/// title 任务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
}

/// chapter_planning 任务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_requirements: Option<String>,
}

/// content 任务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInput {
    /// 覆盖章节细纲 / 大纲
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_outline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
}

/// consistency_check 任务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// 去掉空白字符串
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_input_defaults() {
        let input: OutlineInput = parse_input(None).unwrap();
        assert_eq!(input.mode, GenerationMode::Initial);
        let input: ContentInput = parse_input(Some(&Value::Null)).unwrap();
        assert!(input.modified_outline.is_none());
    }

    #[test]
    fn test_camel_case_fields() {
        let value = json!({"mode": "expand", "existingOutline": "旧"});
        let input: OutlineInput = parse_input(Some(&value)).unwrap();
        assert_eq!(input.mode, GenerationMode::Expand);
        assert_eq!(input.existing_outline.as_deref(), Some("旧"));

        let value = json!({"modifiedOutline": "改", "additionalInstructions": "快"});
        let input: ContentInput = parse_input(Some(&value)).unwrap();
        assert_eq!(input.additional_instructions.as_deref(), Some("快"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let value = json!({"mode": "bogus"});
        assert!(parse_input::<OutlineInput>(Some(&value)).is_err());
    }
}
