use crate::CommentId;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Newest first
    #[default]
    Recent,

    /// Most liked first, newest first among equally-liked
    Liked,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PageRequest {
    #[serde(default)]
    pub mode: FeedMode,
    pub limit: usize,

    /// Id of the last item of the previous page
    pub cursor: Option<CommentId>,
}

impl PageRequest {
    pub fn first(mode: FeedMode, limit: usize) -> PageRequest {
        PageRequest {
            mode,
            limit,
            cursor: None,
        }
    }

    /// Request for the page following `page`, if there is one
    pub fn after<T>(&self, page: &Page<T>) -> Option<PageRequest> {
        page.next_cursor.map(|cursor| PageRequest {
            mode: self.mode,
            limit: self.limit,
            cursor: Some(cursor),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// None once the end of the feed has been reached
    pub next_cursor: Option<CommentId>,
}
