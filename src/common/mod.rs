pub mod config;
pub mod error;

pub use config::{
    global_config, set_global_config, BufferPoolConfig, FrameId, PageId, INVALID_PAGE_ID,
    PAGE_SIZE,
};
pub use error::{Error, Result};
