//! 实时会话核心领域模型
//!
//! 包含会话、消息等核心实体，以及可见性、定时揭示等业务规则。

pub mod entities;
pub mod errors;
pub mod events;
pub mod repositories;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use repositories::*;
pub use value_objects::*;
