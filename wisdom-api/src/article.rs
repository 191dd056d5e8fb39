use uuid::Uuid;

use crate::{Error, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    pub fn stub() -> ArticleId {
        ArticleId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Article {
    pub id: ArticleId,
    pub author_id: UserId,
    pub author_name: String,
    pub date: Time,

    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl Article {
    /// Whether `query` occurs in the title or the content, ignoring case.
    /// A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        format!("{} {}", self.title, self.content)
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewArticle {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.title)?;
        crate::validate_content(&self.content)?;
        for t in &self.tags {
            crate::validate_string(t)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ArticleLike {
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub date: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ArticleWithStats {
    pub article: Article,
    pub like_count: usize,
    pub comment_count: usize,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleSort {
    #[default]
    Recent,
    Liked,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, content: &str) -> Article {
        Article {
            id: ArticleId::stub(),
            author_id: UserId::stub(),
            author_name: String::from("author"),
            date: chrono::Utc::now(),
            title: String::from(title),
            content: String::from(content),
            tags: Vec::new(),
        }
    }

    #[test]
    fn matching_is_case_insensitive_over_title_and_content() {
        let a = article("On Patience", "Water wears down STONE.");
        assert!(a.matches("patience"));
        assert!(a.matches("stone"));
        assert!(a.matches("  wears down "));
        assert!(a.matches(""));
        assert!(a.matches("   "));
        assert!(!a.matches("haste"));
        // title and content are joined by a single space
        assert!(a.matches("patience water"));
    }
}
