//! Novel Context - 结构化生成结果
//!
//! 章节编排与一致性校验的模型输出

use serde::{Deserialize, Serialize};

use super::errors::NovelError;

/// 章节编排结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterPlan {
    pub volumes: Vec<PlannedVolume>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedVolume {
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<PlannedChapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChapter {
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

impl ChapterPlan {
    /// 写库前整体校验，保证插入要么全部成功要么不发生
    pub fn validate(&self) -> Result<(), NovelError> {
        if self.volumes.is_empty() {
            return Err(NovelError::InvalidPlan("plan contains no volumes".to_string()));
        }
        for (v_index, volume) in self.volumes.iter().enumerate() {
            if volume.title.trim().is_empty() {
                return Err(NovelError::InvalidPlan(format!(
                    "volume {} has an empty title",
                    v_index + 1
                )));
            }
            for (c_index, chapter) in volume.chapters.iter().enumerate() {
                if chapter.title.trim().is_empty() {
                    return Err(NovelError::InvalidPlan(format!(
                        "chapter {} of volume {} has an empty title",
                        c_index + 1,
                        v_index + 1
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn chapter_count(&self) -> usize {
        self.volumes.iter().map(|v| v.chapters.len()).sum()
    }
}

/// 一致性校验报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// 预计章节数 = ceil(目标字数 / 每章最少字数)
pub fn estimated_chapter_count(target_words: u32, min_chapter_words: u32) -> u32 {
    if min_chapter_words == 0 {
        return 0;
    }
    target_words.div_ceil(min_chapter_words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_chapter_count_rounds_up() {
        assert_eq!(estimated_chapter_count(100_000, 3000), 34);
        assert_eq!(estimated_chapter_count(9000, 3000), 3);
        assert_eq!(estimated_chapter_count(9001, 3000), 4);
        assert_eq!(estimated_chapter_count(1000, 0), 0);
    }

    #[test]
    fn test_plan_validation() {
        let plan: ChapterPlan = serde_json::from_str(
            r#"{"volumes":[{"title":"第一卷","chapters":[{"title":"开端","summary":"s"}]}]}"#,
        )
        .unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.chapter_count(), 1);

        let empty = ChapterPlan { volumes: vec![] };
        assert!(empty.validate().is_err());

        let blank_title: ChapterPlan =
            serde_json::from_str(r#"{"volumes":[{"title":"卷","chapters":[{"title":" "}]}]}"#)
                .unwrap();
        assert!(blank_title.validate().is_err());
    }

    #[test]
    fn test_consistency_report_defaults() {
        let report: ConsistencyReport = serde_json::from_str(r#"{"passed":true}"#).unwrap();
        assert!(report.passed);
        assert!(report.issues.is_empty());
    }
}
