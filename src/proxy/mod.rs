//! 代理模块封装
//! 对外提供代理描述、健康记录存储和代理池

mod health_check;
mod pool;
mod types;

pub use health_check::{HealthStore, InMemoryHealthStore, ProxyHealthChecker};
pub use pool::{ProxyPool, weighted_pick};
pub use types::{ProxyDescriptor, ProxyHealthRecord};
