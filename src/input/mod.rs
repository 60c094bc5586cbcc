pub mod actions;
pub mod classify;
pub mod dispatch;
pub mod normalize;
pub mod profile;
pub mod resolver;
pub mod session;
pub mod source;
