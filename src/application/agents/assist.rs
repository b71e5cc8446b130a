//! 写作助手 / 创作建议

use super::sections::{
    character_section, compose, optional_line, tail_chars, world_section,
};
use super::{Agent, AgentContext, Prompts};

/// 助手对话引用的正文长度（字符）
const ASSIST_PREVIOUS_TAIL: usize = 2000;

fn novel_profile(ctx: &AgentContext) -> String {
    let novel = &ctx.novel;
    [
        Some(format!("小说标题：{}", novel.title)),
        Some(format!("小说类型：{}", novel.genre.join("、"))),
        Some(format!("风格标签：{}", novel.style.join("、"))),
        optional_line("背景设定", novel.background.as_deref()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n")
}

/// 写作助手对话
#[derive(Debug, Clone)]
pub struct AssistAgent {
    pub message: String,
    pub previous_content: Option<String>,
}

impl Agent for AssistAgent {
    fn name(&self) -> &'static str {
        "AssistAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let system = compose(vec![
            Some(
                "你是一位专业的网文写作助手。你的任务是辅助作者进行创作，回答他们的问题，或者根据上下文提供写作建议。"
                    .to_string(),
            ),
            Some(novel_profile(ctx)),
            world_section(&ctx.novel),
            character_section(&ctx.characters),
            Some(
                "请根据以上设定和作者提供的小说正文片段（如果有），回答作者的问题。\n\
                 回答要求：\n\
                 1. 具有启发性，能激发作者灵感\n\
                 2. 贴合小说设定和风格\n\
                 3. 简洁明了，直接切入重点\n\
                 4. 如果作者要求生成片段，请确保风格统一"
                    .to_string(),
            ),
        ]);

        let previous = self
            .previous_content
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(|text| tail_chars(text, ASSIST_PREVIOUS_TAIL))
            .unwrap_or("（无）");
        let user = format!(
            "当前正文片段（上文）：\n{}\n\n作者的问题/指令：\n{}",
            previous, self.message
        );
        Prompts { system, user }
    }
}

/// 根据类型、风格、背景推荐书名
#[derive(Debug, Clone, Default)]
pub struct TitleSuggestionAgent;

impl Agent for TitleSuggestionAgent {
    fn name(&self) -> &'static str {
        "TitleSuggestionAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let novel = &ctx.novel;
        let system = "你是一位网络小说命名专家。根据作者给出的类型、风格和背景设定，构思吸引人的书名。\n\n\
                      要求：\n\
                      1. 体现小说核心卖点\n\
                      2. 符合网文命名习惯\n\
                      3. 朗朗上口，易于传播"
            .to_string();
        let user = compose(vec![
            Some(format!("小说类型：{}", novel.genre.join("、"))),
            Some(format!("风格：{}", novel.style.join("、"))),
            optional_line("背景设定", novel.background.as_deref()),
            Some("请直接输出5个书名，每行一个。".to_string()),
        ]);
        Prompts { system, user }
    }
}

/// 扩写背景设定
#[derive(Debug, Clone, Default)]
pub struct BackgroundExpansionAgent;

impl Agent for BackgroundExpansionAgent {
    fn name(&self) -> &'static str {
        "BackgroundExpansionAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let novel = &ctx.novel;
        let system = "你是一位资深网络小说世界观设计师。根据作者给出的简要背景，扩写出完整、自洽的故事背景设定。\n\n\
                      要求：\n\
                      1. 保留作者原有设定，不改变核心设想\n\
                      2. 补充时代背景、势力格局和核心矛盾\n\
                      3. 为后续大纲留出发展空间"
            .to_string();
        let user = compose(vec![
            Some(format!("小说类型：{}", novel.genre.join("、"))),
            Some(format!("风格：{}", novel.style.join("、"))),
            Some(format!(
                "原始背景：\n{}",
                novel.background.as_deref().unwrap_or("（无）")
            )),
            Some("请直接输出扩写后的背景设定（300-800字）。".to_string()),
        ]);
        Prompts { system, user }
    }
}
