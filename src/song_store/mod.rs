mod models;
mod sqlite_store;
mod trait_def;
mod vector;

pub use models::{Song, SongSummary};
pub use sqlite_store::{LexicalBonuses, SqliteSongStore};
pub use trait_def::SongStore;
pub use vector::{decode_vector, encode_vector};
