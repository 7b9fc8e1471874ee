pub mod asset_rewriter;
pub mod cover;
pub mod entry_meta;
pub mod frontmatter;

pub use asset_rewriter::{AssetRewriter, EntryContext};
pub use entry_meta::EntryMeta;
pub use frontmatter::{Document, Frontmatter};
