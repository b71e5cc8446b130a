//! OutlineAgent - 全文大纲

use super::sections::{
    character_section, compose, knowledge_section, optional_line, world_section,
};
use super::{Agent, AgentContext, Prompts};
use crate::domain::novel::GenerationMode;

/// 大纲生成 / 改写
#[derive(Debug, Clone, Default)]
pub struct OutlineAgent {
    pub mode: GenerationMode,
    /// 改写类模式的原大纲
    pub existing_outline: Option<String>,
}

impl OutlineAgent {
    pub fn new(mode: GenerationMode, existing_outline: Option<String>) -> Self {
        Self {
            mode,
            existing_outline,
        }
    }

    fn system_prompt(ctx: &AgentContext) -> String {
        let novel = &ctx.novel;
        let header = compose(vec![
            Some("你是一位资深网络小说大纲策划师。你的任务是根据小说设定生成完整的故事大纲。".to_string()),
            Some(
                [
                    Some(format!("小说标题：{}", novel.title)),
                    Some(format!("小说类型：{}", novel.genre.join("、"))),
                    Some(format!("风格标签：{}", novel.style.join("、"))),
                    Some(format!("目标字数：{}字", novel.target_words)),
                    optional_line("背景设定", novel.background.as_deref()),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("\n"),
            ),
        ]);

        compose(vec![
            Some(header),
            world_section(novel),
            character_section(&ctx.characters),
            knowledge_section("额外知识库", &ctx.knowledge),
            Some(
                "请生成一个结构完整、逻辑清晰的故事大纲，包括：\n\
                 1. 故事主线\n\
                 2. 主要冲突\n\
                 3. 关键转折点\n\
                 4. 高潮设计\n\
                 5. 结局方向"
                    .to_string(),
            ),
            Some(format!("大纲应该支撑{}字的长篇连载。", novel.target_words)),
        ])
    }

    fn user_prompt(&self, ctx: &AgentContext) -> String {
        let existing = self.existing_outline.as_deref().unwrap_or_default();
        match self.mode {
            GenerationMode::Expand => {
                format!("基于以下现有大纲进行扩写，增加更多细节和情节点：\n\n{}", existing)
            }
            GenerationMode::AdjustPaceFast => format!(
                "调整以下大纲节奏，使其更加紧凑、爽快（删除拖沓情节，加快冲突爆发）：\n\n{}",
                existing
            ),
            GenerationMode::AdjustPaceSlow => format!(
                "调整以下大纲节奏，使其更加舒缓、细腻（增加铺垫和情感描写）：\n\n{}",
                existing
            ),
            GenerationMode::StrengthenConflict => format!(
                "强化以下大纲的主线冲突，增加戏剧张力和主角面临的困境：\n\n{}",
                existing
            ),
            GenerationMode::PreserveCharacters => format!(
                "保留人物设定，重新生成大纲（保持角色性格和关系不变）：\n\n{}",
                existing
            ),
            _ => format!("请为《{}》生成完整的小说大纲。", ctx.novel.title),
        }
    }
}

impl Agent for OutlineAgent {
    fn name(&self) -> &'static str {
        "OutlineAgent"
    }

    fn build_prompts(&self, ctx: &AgentContext) -> Prompts {
        Prompts {
            system: Self::system_prompt(ctx),
            user: self.user_prompt(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NovelRecord;
    use crate::domain::novel::WorldSettings;

    fn context() -> AgentContext {
        let mut novel = NovelRecord::draft("u1", "星海归途");
        novel.genre = vec!["科幻".into(), "冒险".into()];
        novel.target_words = 200_000;
        AgentContext::new(novel)
    }

    #[test]
    fn test_initial_prompt_omits_missing_sections() {
        let prompts = OutlineAgent::default().build_prompts(&context());
        assert!(prompts.system.contains("小说类型：科幻、冒险"));
        assert!(prompts.system.contains("大纲应该支撑200000字的长篇连载。"));
        assert!(!prompts.system.contains("世界观设定"));
        assert!(!prompts.system.contains("人物信息"));
        assert!(!prompts.system.contains("额外知识库"));
        assert_eq!(prompts.user, "请为《星海归途》生成完整的小说大纲。");
    }

    #[test]
    fn test_world_settings_and_knowledge_included() {
        let mut ctx = context().with_knowledge(vec!["地理:\n三大星域".into()]);
        ctx.novel.world_settings = Some(WorldSettings {
            power_system: Some("源能".into()),
            ..Default::default()
        });
        let prompts = OutlineAgent::default().build_prompts(&ctx);
        assert!(prompts.system.contains("- 力量体系：源能"));
        assert!(prompts.system.contains("额外知识库：\n地理:\n三大星域"));
    }

    #[test]
    fn test_rewrite_modes_embed_existing_outline() {
        let agent = OutlineAgent::new(GenerationMode::Expand, Some("旧大纲".into()));
        let prompts = agent.build_prompts(&context());
        assert!(prompts.user.starts_with("基于以下现有大纲进行扩写"));
        assert!(prompts.user.ends_with("旧大纲"));

        let agent = OutlineAgent::new(GenerationMode::AdjustPaceFast, Some("旧大纲".into()));
        assert!(agent.build_prompts(&context()).user.contains("紧凑、爽快"));
    }
}
