//! ChapterPlanningAgent - 分卷分章

use super::{Agent, AgentContext, Prompts};
use crate::application::ports::{DEFAULT_MIN_CHAPTER_WORDS, DEFAULT_TARGET_WORDS};
use crate::domain::novel::estimated_chapter_count;

const PLAN_FORMAT: &str = r#"输出格式（JSON，严禁包含 markdown 代码块，严禁包含其他说明文字，直接返回有效的 JSON 字符串）：
{
  "volumes": [
    {
      "title": "卷名",
      "chapters": [
        {"title": "章节标题", "summary": "章节概要"}
      ]
    }
  ]
}"#;

#[derive(Debug, Clone)]
pub struct ChapterPlanningAgent {
    pub outline: String,
    pub additional_requirements: Option<String>,
}

impl ChapterPlanningAgent {
    pub fn new(outline: impl Into<String>, additional_requirements: Option<String>) -> Self {
        Self {
            outline: outline.into(),
            additional_requirements: additional_requirements.filter(|s| !s.trim().is_empty()),
        }
    }
}

impl Agent for ChapterPlanningAgent {
    fn name(&self) -> &'static str {
        "ChapterPlanningAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let novel = &ctx.novel;
        let target = if novel.target_words == 0 {
            DEFAULT_TARGET_WORDS
        } else {
            novel.target_words
        };
        let min = if novel.min_chapter_words == 0 {
            DEFAULT_MIN_CHAPTER_WORDS
        } else {
            novel.min_chapter_words
        };

        let system = format!(
            "你是小说章节结构规划师。根据大纲将小说分卷分章。\n\n\
             目标字数：{}字\n\
             每章最少字数：{}字\n\
             预计章节数：约{}章（请尽量接近这个数量）\n\n\
             要求：\n\
             1. 合理分卷（可选）\n\
             2. 每章有明确主题\n\
             3. 章节标题吸引人\n\
             4. 节奏把控合理\n\
             5. 严格控制章节数量，确保总字数达标",
            target,
            min,
            estimated_chapter_count(target, min),
        );

        let mut user = format!(
            "基于《{}》的以下大纲，生成章节结构：\n\n{}\n\n",
            novel.title, self.outline
        );
        if let Some(extra) = &self.additional_requirements {
            user.push_str(&format!("额外要求：\n{}\n\n", extra));
        }
        user.push_str(PLAN_FORMAT);

        Prompts { system, user }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NovelRecord;

    #[test]
    fn test_estimated_chapter_count_in_prompt() {
        let mut novel = NovelRecord::draft("u1", "t");
        novel.target_words = 100_000;
        novel.min_chapter_words = 3000;
        let prompts = ChapterPlanningAgent::new("大纲", None).build_prompts(&AgentContext::new(novel));
        assert!(prompts.system.contains("预计章节数：约34章"));
        assert!(prompts.user.contains("\"volumes\""));
        assert!(!prompts.user.contains("额外要求"));
    }

    #[test]
    fn test_additional_requirements() {
        let novel = NovelRecord::draft("u1", "t");
        let agent = ChapterPlanningAgent::new("大纲", Some("分三卷".into()));
        assert!(agent
            .build_prompts(&AgentContext::new(novel))
            .user
            .contains("额外要求：\n分三卷"));
    }
}
