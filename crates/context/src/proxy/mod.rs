//! Proxy strategy selection and the interceptor that applies it

pub mod auto_proxy;
pub mod selector;

pub use auto_proxy::{
    AutoProxyInterceptor, ProxyObject, TypeFilter, AUTO_PROXY_ATTRIBUTE, PRESERVE_TARGET_TYPE_ATTRIBUTE,
};
pub use selector::{
    is_marker_interface, DefaultProxyStrategySelector, ProxySpec, ProxyStrategy, ProxyStrategySelector,
    ProxyTarget, MARKER_INTERFACES,
};
