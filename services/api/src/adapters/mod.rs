pub mod db;
pub mod vector_search;

pub use db::DbAdapter;
pub use vector_search::WeaviateSearchAdapter;
