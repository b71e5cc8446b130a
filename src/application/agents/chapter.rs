//! 章节大纲 / 章节细纲

use super::sections::{character_section, compose, knowledge_section, optional_line, tail_chars};
use super::{Agent, AgentContext, Prompts};

/// 章节大纲引用的前文长度（字符）
const OUTLINE_PREVIOUS_TAIL: usize = 500;

#[derive(Debug, Clone)]
pub struct ChapterOutlineAgent {
    pub order: u32,
    pub title: String,
    pub summary: Option<String>,
}

impl Agent for ChapterOutlineAgent {
    fn name(&self) -> &'static str {
        "ChapterOutlineAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let system = compose(vec![
            Some("你是章节大纲撰写专家。为单个章节生成详细的剧情大纲。".to_string()),
            optional_line("小说背景", ctx.novel.background.as_deref()),
            character_section(&ctx.characters),
            knowledge_section("额外知识库", &ctx.knowledge),
            Some(
                "要求：\n\
                 1. 情节紧凑，有冲突\n\
                 2. 符合人物性格\n\
                 3. 遵守世界观规则\n\
                 4. 为下一章留悬念"
                    .to_string(),
            ),
        ]);

        let mut user = format!(
            "生成《{}》第{}章《{}》的详细大纲。\n\n章节概要：{}\n",
            ctx.novel.title,
            self.order,
            self.title,
            self.summary.as_deref().unwrap_or("")
        );
        if let Some(previous) = &ctx.previous_content {
            user.push_str(&format!(
                "\n前文回顾：\n{}\n",
                tail_chars(previous, OUTLINE_PREVIOUS_TAIL)
            ));
        }
        user.push_str("\n请输出详细的章节大纲（300-500字）。");

        Prompts { system, user }
    }
}

#[derive(Debug, Clone)]
pub struct ChapterDetailAgent {
    pub outline: String,
}

impl Agent for ChapterDetailAgent {
    fn name(&self) -> &'static str {
        "ChapterDetailAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let system = compose(vec![
            Some("你是章节细纲设计师。将章节大纲拆分为具体的场景和情节点。".to_string()),
            knowledge_section("额外知识库", &ctx.knowledge),
            Some(format!(
                "要求：\n\
                 1. 每个场景有明确的目标\n\
                 2. 标注关键对话和动作\n\
                 3. 情绪节奏起伏\n\
                 4. 字数分配合理（目标{}字）",
                ctx.novel.min_chapter_words
            )),
        ]);
        let user = format!(
            "基于《{}》的以下章节大纲，生成详细的场景细纲：\n\n{}\n\n\
             输出格式：\n场景1：[地点] [人物] [事件]\n场景2：...\n（至少3-5个场景）",
            ctx.novel.title, self.outline
        );
        Prompts { system, user }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NovelRecord;

    #[test]
    fn test_chapter_outline_uses_previous_tail() {
        let previous = "甲".repeat(600) + &"乙".repeat(500);
        let ctx = AgentContext::new(NovelRecord::draft("u1", "长夜"))
            .with_previous_content(Some(previous));
        let agent = ChapterOutlineAgent {
            order: 3,
            title: "破晓".into(),
            summary: Some("主角出城".into()),
        };
        let prompts = agent.build_prompts(&ctx);
        assert!(prompts.user.starts_with("生成《长夜》第3章《破晓》的详细大纲。"));
        assert!(prompts.user.contains(&format!("前文回顾：\n{}", "乙".repeat(500))));
        assert!(!prompts.user.contains('甲'));
    }

    #[test]
    fn test_chapter_outline_without_previous() {
        let ctx = AgentContext::new(NovelRecord::draft("u1", "长夜"));
        let agent = ChapterOutlineAgent {
            order: 1,
            title: "开端".into(),
            summary: None,
        };
        let prompts = agent.build_prompts(&ctx);
        assert!(!prompts.user.contains("前文回顾"));
        assert!(!prompts.system.contains("人物信息"));
    }
}
