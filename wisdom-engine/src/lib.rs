mod comment;
pub use comment::{build_forest, build_tree, descendants_of};

mod db;
pub use db::{ArticleDump, ThreadDump};

mod like;
pub use like::{LikeSet, LikeTally};

mod order;
pub use order::{paginate, OrderExt};

pub mod api {
    pub use wisdom_api::*;
}
