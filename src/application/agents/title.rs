//! TitleAgent - 书名候选

use super::{Agent, AgentContext, Prompts};

/// 基于大纲生成 5 个候选书名，每行一个
#[derive(Debug, Clone)]
pub struct TitleAgent {
    pub outline: String,
}

impl TitleAgent {
    pub fn new(outline: impl Into<String>) -> Self {
        Self {
            outline: outline.into(),
        }
    }
}

impl Agent for TitleAgent {
    fn name(&self) -> &'static str {
        "TitleAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        let novel = &ctx.novel;
        let system = format!(
            "你是一位网络小说命名专家。根据小说大纲和设定，生成吸引人的书名。\n\n\
             小说类型：{}\n\
             风格：{}\n\n\
             要求：\n\
             1. 书名要吸引目标读者\n\
             2. 体现小说核心卖点\n\
             3. 符合网文命名习惯\n\
             4. 朗朗上口，易于传播",
            novel.genre.join("、"),
            novel.style.join("、"),
        );
        let user = format!(
            "基于《{}》的以下大纲，生成5个候选书名：\n\n{}\n\n请直接输出5个书名，每行一个。",
            novel.title, self.outline
        );
        Prompts { system, user }
    }
}
