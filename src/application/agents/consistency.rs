//! ConsistencyAgent - 设定一致性审核
//!
//! 输出 `{passed, issues, suggestions}` JSON

use super::sections::{compose, knowledge_section};
use super::{Agent, AgentContext, Prompts};

const REPORT_FORMAT: &str = r#"输出格式（JSON，严禁包含 markdown 代码块，严禁包含其他说明文字，直接返回有效的 JSON 字符串）：
{
  "passed": true/false,
  "issues": ["问题1", "问题2"],
  "suggestions": ["建议1"]
}"#;

#[derive(Debug, Clone)]
pub struct ConsistencyAgent {
    pub content: String,
}

impl ConsistencyAgent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl Agent for ConsistencyAgent {
    fn name(&self) -> &'static str {
        "ConsistencyAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let settings = ctx.novel.world_settings.clone().unwrap_or_default();
        let abilities: Vec<String> = ctx
            .characters
            .iter()
            .map(|c| {
                format!(
                    "{}：{}",
                    c.name,
                    serde_json::to_string(&c.abilities).unwrap_or_else(|_| "[]".to_string())
                )
            })
            .collect();

        let system = compose(vec![
            Some("你是小说一致性审核专家。检查内容是否违反设定。".to_string()),
            Some(format!("世界观规则：\n{}", settings.world_rules.join("\n"))),
            Some(format!("禁忌规则：\n{}", settings.forbidden_rules.join("\n"))),
            Some(format!("人物设定：\n{}", abilities.join("\n"))),
            knowledge_section("知识库参考", &ctx.knowledge),
            Some(
                "检查项：\n\
                 1. 是否违反世界观规则\n\
                 2. 人物能力是否超限\n\
                 3. 时间线是否错误\n\
                 4. 人物性格是否一致"
                    .to_string(),
            ),
        ]);
        let user = format!("请审核以下内容：\n\n{}\n\n{}", self.content, REPORT_FORMAT);
        Prompts { system, user }
    }
}
