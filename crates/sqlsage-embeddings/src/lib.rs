mod cached;
mod fake;

pub use cached::CacheBackedEmbeddings;
pub use fake::FakeEmbeddings;
