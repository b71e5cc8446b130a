//! Novel Queries - 小说、人物、章节、大纲、知识库

use uuid::Uuid;

/// 获取小说详情查询
#[derive(Debug, Clone)]
pub struct GetNovel {
    pub user_id: String,
    pub novel_id: Uuid,
}

/// 列出用户的所有小说
#[derive(Debug, Clone)]
pub struct ListNovels {
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct ListCharacters {
    pub user_id: String,
    pub novel_id: Uuid,
}

/// 按卷分组列出章节
#[derive(Debug, Clone)]
pub struct ListChapters {
    pub user_id: String,
    pub novel_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct GetChapter {
    pub user_id: String,
    pub chapter_id: Uuid,
}

/// 大纲版本（新版本在前）
#[derive(Debug, Clone)]
pub struct ListOutlineVersions {
    pub user_id: String,
    pub novel_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListKnowledgeBases {
    pub user_id: String,
    pub novel_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListKnowledgeDocuments {
    pub user_id: String,
    pub novel_id: Uuid,
    pub knowledge_base_id: Uuid,
}
