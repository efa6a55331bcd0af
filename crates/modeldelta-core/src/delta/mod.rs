pub mod codec;
pub mod model;
pub mod summary;

pub use codec::{decode, encode, Decoded, Document, DroppedEntry, FORMAT_VERSION};
pub use model::{Change, ChangeSet, ElementDefinition, ListItem, SetValue};
pub use summary::render_change_summary;
