//! 任务结果
//!
//! 持久化到 Task.result，并随 `task:completed` 推送

use serde::{Deserialize, Serialize};

use crate::application::ports::AppliedPlan;
use crate::domain::novel::{ChapterPlan, ConsistencyReport};

/// 按任务类型区分的产出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentOutput {
    Outline {
        content: String,
        version: u32,
    },
    Titles {
        content: String,
        titles: Vec<String>,
    },
    ChapterPlan {
        content: String,
        plan: ChapterPlan,
        #[serde(flatten)]
        applied: AppliedPlan,
    },
    ChapterOutline {
        content: String,
    },
    ChapterDetail {
        content: String,
    },
    Content {
        content: String,
        #[serde(rename = "wordCount")]
        word_count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        consistency: Option<ConsistencyReport>,
    },
    Consistency {
        content: String,
        report: ConsistencyReport,
    },
}

/// 完整任务结果（产出 + 模型信息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    #[serde(flatten)]
    pub output: AgentOutput,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// 解析候选书名：每行一个，去掉序号、书名号和空行
pub fn parse_titles(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(|c: char| {
                c.is_ascii_digit() || matches!(c, '.' | '、' | ')' | '）' | '-' | '*' | ' ')
            });
            line.trim()
                .trim_start_matches('《')
                .trim_end_matches('》')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_titles() {
        let titles = parse_titles("1. 《星海归途》\n2、逆光者\n\n- 夜航船\n");
        assert_eq!(titles, vec!["星海归途", "逆光者", "夜航船"]);
    }

    #[test]
    fn test_task_result_wire_shape() {
        let result = TaskResult {
            output: AgentOutput::Content {
                content: "正文".into(),
                word_count: 2,
                consistency: None,
            },
            model: "gpt-4o".into(),
            tokens_used: Some(12),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "content");
        assert_eq!(json["wordCount"], 2);
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["tokensUsed"], 12);
        assert!(json.get("consistency").is_none());
    }

    #[test]
    fn test_chapter_plan_result_counts() {
        let result = TaskResult {
            output: AgentOutput::ChapterPlan {
                content: "{}".into(),
                plan: ChapterPlan { volumes: vec![] },
                applied: AppliedPlan {
                    volumes: 2,
                    chapters: 5,
                },
            },
            model: "m".into(),
            tokens_used: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "chapter_plan");
        assert_eq!(json["volumes"], 2);
        assert_eq!(json["chapters"], 5);
    }
}
