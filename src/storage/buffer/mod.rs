mod buffer_pool_manager;
mod lru_replacer;
mod parallel_buffer_pool_manager;

pub use buffer_pool_manager::BufferPoolManager;
pub use lru_replacer::LRUReplacer;
pub use parallel_buffer_pool_manager::ParallelBufferPoolManager;
