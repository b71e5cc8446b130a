//! ContentAgent - 章节正文

use super::sections::{compose, knowledge_section, tail_chars};
use super::{Agent, AgentContext, Prompts};

/// 正文衔接引用的前文长度（字符）
const CONTENT_PREVIOUS_TAIL: usize = 800;

#[derive(Debug, Clone)]
pub struct ContentAgent {
    pub outline: String,
    pub instructions: Option<String>,
}

impl ContentAgent {
    pub fn new(outline: impl Into<String>, instructions: Option<String>) -> Self {
        Self {
            outline: outline.into(),
            instructions: instructions.filter(|s| !s.trim().is_empty()),
        }
    }

    fn character_lines(ctx: &AgentContext) -> Option<String> {
        if ctx.characters.is_empty() {
            return None;
        }
        let lines: Vec<String> = ctx
            .characters
            .iter()
            .map(|c| {
                format!(
                    "- {}：{}，当前状态：{}",
                    c.name,
                    c.personality.join("、"),
                    c.current_state.as_deref().unwrap_or("未知")
                )
            })
            .collect();
        Some(format!("人物信息：\n{}", lines.join("\n")))
    }
}

impl Agent for ContentAgent {
    fn name(&self) -> &'static str {
        "ContentAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let novel = &ctx.novel;
        let system = compose(vec![
            Some(format!(
                "你是网络小说作家。根据细纲生成精彩的章节正文。\n\n小说风格：{}",
                novel.style.join("、")
            )),
            Self::character_lines(ctx),
            knowledge_section("额外知识库", &ctx.knowledge),
            Some(format!(
                "写作要求：\n\
                 1. 文笔流畅，代入感强\n\
                 2. 对话生动，符合人物性格\n\
                 3. 场景描写细腻\n\
                 4. 节奏紧凑，不拖沓\n\
                 5. 字数：{}字以上\n\n\
                 禁止：\n\
                 - 违反世界观规则\n\
                 - 人物OOC（性格崩坏）\n\
                 - 逻辑矛盾",
                novel.min_chapter_words
            )),
        ]);

        let user = compose(vec![
            Some(format!(
                "根据《{}》的以下章节细纲，生成章节正文：\n\n{}",
                novel.title, self.outline
            )),
            self.instructions
                .as_ref()
                .map(|extra| format!("额外写作要求（必须严格遵守）：\n{}", extra)),
            ctx.previous_content
                .as_ref()
                .map(|prev| format!("前文衔接：\n{}", tail_chars(prev, CONTENT_PREVIOUS_TAIL))),
            Some("请开始创作，直接输出正文内容。".to_string()),
        ]);

        Prompts { system, user }
    }
}
