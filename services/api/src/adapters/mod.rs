pub mod annotator_llm;
pub mod db;

pub use annotator_llm::OpenAiAnnotatorAdapter;
pub use db::PgAdapter;
